use std::f32::consts::PI;

use chest_engine::{TweenHandle, TweenScheduler, lerp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::chest::{Chest, ChestId, ChestLayout};
use crate::present::{ChestPart, CuePlayer, Entity, Property, Renderer};
use crate::reward::Reward;
use crate::sfx::{self, Cue, CueOptions};

pub type Sched = TweenScheduler<Scene>;

pub const SCREEN_WIDTH: f32 = 1200.0;
pub const SCREEN_HEIGHT: f32 = 700.0;

pub const DARK_ALPHA: f32 = 0.35;
pub const DARK_FADE_SECS: f32 = 1.0;
pub const FOG_FADE_OUT_SECS: f32 = 0.8;
pub const FOG_FADE_IN_SECS: f32 = 1.0;

pub const SIGN_VISIBLE_Y: f32 = SCREEN_HEIGHT / 2.0 - 270.0;
pub const SIGN_HIDDEN_Y: f32 = -200.0;
pub const SIGN_DROP_SECS: f32 = 2.0;
pub const SIGN_RETRACT_SECS: f32 = 0.8;

pub const BUTTON_REST_Y: f32 = SCREEN_HEIGHT / 2.0 - 270.0;
pub const BUTTON_RAISED_Y: f32 = -120.0;
pub const BUTTON_RAISE_SECS: f32 = 2.0;
pub const BUTTON_RETURN_SECS: f32 = 3.5;
const BUTTON_DISABLED_ALPHA: f32 = 0.5;
pub const BUTTON_HOVER_SECS: f32 = 0.3;
const BUTTON_HOVER_SCALE: f32 = 1.05;
const BUTTON_LABEL_HOVER_SCALE: f32 = 1.1;

const SWING_SPEED: f32 = 0.4;
const SWING_AMPLITUDE: f32 = 2.0 * PI / 180.0;

const SHAKE_OFFSET: f32 = 5.0;
const SHAKE_ROTATION: f32 = 0.015;
const SHAKE_SCALE: f32 = 0.012;

pub const BONUS_POPUP_FADE_SECS: f32 = 0.35;
const BONUS_PULSE_SPEED: f32 = 3.0;
const BONUS_PULSE_SCALE: f32 = 1.2;

pub const TOTAL_POPUP_FADE_SECS: f32 = 1.0;
pub const TOTAL_POPUP_DROP_SECS: f32 = 3.0;
pub const TOTAL_POPUP_REST_Y: f32 = SCREEN_HEIGHT / 3.0;
const TOTAL_POPUP_HIDDEN_Y: f32 = -SCREEN_HEIGHT - 20.0;
const TOTAL_POPUP_SWING_SPEED: f32 = 1.5;
const TOTAL_POPUP_SWING_AMPLITUDE: f32 = 2.0 * PI / 180.0;
const TOTAL_POPUP_FLOAT_SPEED: f32 = 1.0;
const TOTAL_POPUP_FLOAT: f32 = 6.0;

pub const ROCK_COUNT: u8 = 7;
pub const ROCK_RAIN_SECS: f32 = 2.0;

const FOG_X: f32 = 500.0;
const FOG_Y: f32 = 400.0;
const FOG_DRIFT_X: f32 = 30.0;
const FOG_DRIFT_Y: f32 = 12.0;
/// How far the outer layers slide sideways as the fog fades out.
const FOG_SLIDE: f32 = 800.0;

#[derive(Debug, Clone, Copy)]
struct FogLayer {
    alpha: f32,
    scale: f32,
    speed: f32,
    phase_x: f32,
    phase_y: f32,
    slide: f32,
}

const FOG_LAYERS: [FogLayer; 3] = [
    FogLayer {
        alpha: 0.25,
        scale: 0.7,
        speed: 0.8,
        phase_x: 0.0,
        phase_y: 0.0,
        slide: FOG_SLIDE,
    },
    FogLayer {
        alpha: 0.4,
        scale: 0.5,
        speed: 1.2,
        phase_x: 2.0,
        phase_y: 1.0,
        slide: 0.0,
    },
    FogLayer {
        alpha: 0.55,
        scale: 0.6,
        speed: 0.4,
        phase_x: 4.0,
        phase_y: 3.0,
        slide: -FOG_SLIDE,
    },
];

impl FogLayer {
    /// Position at `t` seconds of drift, with `hidden` in `[0, 1]` sliding it off-screen.
    fn position(&self, t: f32, hidden: f32) -> (f32, f32) {
        let x = FOG_X + self.slide * hidden + (t * self.speed + self.phase_x).sin() * FOG_DRIFT_X;
        let y = FOG_Y + (t * self.speed + self.phase_y).cos() * FOG_DRIFT_Y;
        (x, y)
    }
}

/// Velocities are per second.
#[derive(Debug, Clone, Copy)]
struct Rock {
    x: f32,
    y: f32,
    scale: f32,
    vx: f32,
    vy: f32,
    spin: f32,
}

impl Rock {
    fn spawn(rng: &mut StdRng) -> Self {
        let centered = |rng: &mut StdRng| rng.r#gen::<f32>() - 0.5;
        Self {
            x: rng.gen_range(100.0..900.0),
            y: -100.0 - rng.r#gen::<f32>() * 300.0,
            scale: 0.3 + rng.r#gen::<f32>() * 0.4,
            vy: (6.0 + rng.r#gen::<f32>() * 6.0) * 60.0,
            vx: centered(rng) * 3.0 * 60.0,
            spin: centered(rng) * 0.1 * 60.0,
        }
    }
}

/// Things tweens report back to the round once the scheduler pass is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    ChestRevealed { chest: ChestId, reward: Reward },
    PlayButtonRaised,
    BonusHoldElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Button {
    enabled: bool,
    /// Idle and clickable, as opposed to mid-flight.
    armed: bool,
    y: f32,
    hovered: bool,
    /// How far the hover grow has gone, `0..=1`.
    hover_amount: f32,
    hover_tween: Option<TweenHandle>,
}

/// The animated world every tween mutates.
///
/// Chests are addressed by [`ChestId`]; nothing outside the scheduler holds a
/// reference into the scene across ticks.
pub struct Scene {
    chests: Vec<Chest>,
    renderer: Box<dyn Renderer>,
    cues: Box<dyn CuePlayer>,
    events: Vec<SceneEvent>,
    fx_rng: StdRng,
    shake_strength: f32,
    overlay_visible: bool,
    button: Button,
    sign_y: f32,
    fog_alpha: f32,
    dark_alpha: f32,
    bonus_popup_visible: bool,
    total_popup_visible: bool,
    total_popup_y: f32,
    rocks_falling: bool,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("chests", &self.chests)
            .field("events", &self.events)
            .field("button", &self.button)
            .field("bonus_popup_visible", &self.bonus_popup_visible)
            .field("total_popup_visible", &self.total_popup_visible)
            .finish_non_exhaustive()
    }
}

impl Scene {
    pub fn new(
        chest_count: usize,
        columns: usize,
        renderer: Box<dyn Renderer>,
        cues: Box<dyn CuePlayer>,
        shake_strength: f32,
        fx_seed: u64,
    ) -> Self {
        let chests = (0..chest_count)
            .map(|i| Chest::new(ChestId(i), ChestLayout::grid(i, columns)))
            .collect();
        let mut scene = Self {
            chests,
            renderer,
            cues,
            events: Vec::new(),
            fx_rng: StdRng::seed_from_u64(fx_seed),
            shake_strength: shake_strength.clamp(0.0, 1.0),
            overlay_visible: true,
            button: Button {
                enabled: false,
                armed: true,
                y: BUTTON_REST_Y,
                hovered: false,
                hover_amount: 0.0,
                hover_tween: None,
            },
            sign_y: SIGN_HIDDEN_Y,
            fog_alpha: 1.0,
            dark_alpha: DARK_ALPHA,
            bonus_popup_visible: false,
            total_popup_visible: false,
            total_popup_y: TOTAL_POPUP_HIDDEN_Y,
            rocks_falling: false,
        };

        for i in 0..chest_count {
            let layout = scene.chests[i].layout();
            let id = ChestId(i);
            scene.render(Entity::Chest(id, ChestPart::Body), Property::X(layout.x));
            scene.render(Entity::Chest(id, ChestPart::Body), Property::Y(layout.y));
            scene.set_chest_idle(id);
        }
        scene.render(Entity::Dark, Property::Alpha(DARK_ALPHA));
        scene.render(Entity::Fog, Property::Alpha(1.0));
        for (i, layer) in FOG_LAYERS.iter().enumerate() {
            let entity = Entity::FogLayer(i as u8);
            let (x, y) = layer.position(0.0, 0.0);
            scene.render(entity, Property::Alpha(layer.alpha));
            scene.render(entity, Property::Scale(layer.scale));
            scene.render(entity, Property::X(x));
            scene.render(entity, Property::Y(y));
        }
        scene.render(Entity::StartOverlay, Property::Visible(true));
        scene.render(Entity::PlayButton, Property::Y(BUTTON_REST_Y));
        scene.render(Entity::TotalSign, Property::Y(SIGN_HIDDEN_Y));
        scene.render(Entity::TotalSign, Property::Text(format_money(0)));
        scene.render(Entity::BonusPopup, Property::Visible(false));
        scene.render(Entity::TotalPopup, Property::Visible(false));
        scene
    }

    pub fn chest(&self, id: ChestId) -> Option<&Chest> {
        self.chests.get(id.0)
    }

    pub(crate) fn chest_mut(&mut self, id: ChestId) -> Option<&mut Chest> {
        self.chests.get_mut(id.0)
    }

    pub fn chests(&self) -> &[Chest] {
        &self.chests
    }

    pub fn chest_ids(&self) -> impl Iterator<Item = ChestId> + use<> {
        (0..self.chests.len()).map(ChestId)
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    pub fn is_play_button_ready(&self) -> bool {
        self.button.enabled && self.button.armed
    }

    pub fn is_bonus_popup_visible(&self) -> bool {
        self.bonus_popup_visible
    }

    pub fn is_total_popup_visible(&self) -> bool {
        self.total_popup_visible
    }

    pub fn is_rock_rain_active(&self) -> bool {
        self.rocks_falling
    }

    pub fn is_play_button_hovered(&self) -> bool {
        self.button.hovered
    }

    pub(crate) fn render(&mut self, entity: Entity, property: Property) {
        self.renderer.render_property(entity, property);
    }

    pub(crate) fn play(&mut self, cue: Cue, options: CueOptions) {
        self.cues.play_cue(cue, options);
    }

    pub(crate) fn stop(&mut self, cue: Cue) {
        self.cues.stop_cue(cue);
    }

    pub(crate) fn emit(&mut self, event: SceneEvent) {
        self.events.push(event);
    }

    pub(crate) fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Continuous idle swing on the hanging signs. Lives as long as the game.
    pub(crate) fn start_swing(&mut self, sched: &mut Sched) -> [TweenHandle; 2] {
        [Entity::PlayButton, Entity::TotalSign].map(|entity| {
            sched.start_continuous(move |scene: &mut Scene, _, t| {
                let rotation = (t * SWING_SPEED).sin() * SWING_AMPLITUDE;
                scene.render(entity, Property::Rotation(rotation));
            })
        })
    }

    /// Continuous drift of the fog layers. The outer layers slide apart as
    /// the fog fades, so it follows `fog_alpha` rather than owning a fade.
    pub(crate) fn start_fog_drift(&mut self, sched: &mut Sched) -> TweenHandle {
        sched.start_continuous(|scene: &mut Scene, _, t| {
            let hidden = 1.0 - scene.fog_alpha;
            for (i, layer) in FOG_LAYERS.iter().enumerate() {
                let entity = Entity::FogLayer(i as u8);
                let (x, y) = layer.position(t, hidden);
                scene.render(entity, Property::X(x));
                scene.render(entity, Property::Y(y));
            }
        })
    }

    pub(crate) fn dismiss_start_overlay(&mut self) -> bool {
        if !self.overlay_visible {
            return false;
        }
        self.overlay_visible = false;
        self.render(Entity::StartOverlay, Property::Visible(false));
        self.set_play_button_enabled(true);
        true
    }

    pub(crate) fn set_play_button_enabled(&mut self, enabled: bool) {
        self.button.enabled = enabled;
        let alpha = if enabled { 1.0 } else { BUTTON_DISABLED_ALPHA };
        self.render(Entity::PlayButton, Property::Alpha(alpha));
    }

    /// Sends the play button up and reports `PlayButtonRaised` once it is gone.
    pub(crate) fn raise_play_button(&mut self, sched: &mut Sched) -> Option<TweenHandle> {
        if !self.is_play_button_ready() {
            return None;
        }
        self.button.armed = false;
        self.play(Cue::Click, CueOptions::once(sfx::CLICK_VOLUME));
        self.play(Cue::Wood, CueOptions::once(sfx::WOOD_VOLUME));

        let from = self.button.y;
        Some(sched.start_with(
            BUTTON_RAISE_SECS,
            move |scene: &mut Scene, _, p| scene.move_button(lerp(from, BUTTON_RAISED_Y, p)),
            |scene: &mut Scene, _| scene.emit(SceneEvent::PlayButtonRaised),
        ))
    }

    /// Brings the play button back down; it re-arms when it lands.
    pub(crate) fn return_play_button(&mut self, sched: &mut Sched) -> TweenHandle {
        self.set_play_button_enabled(!self.overlay_visible);
        self.button.armed = false;
        let from = self.button.y;
        sched.start_with(
            BUTTON_RETURN_SECS,
            move |scene: &mut Scene, _, p| scene.move_button(lerp(from, BUTTON_REST_Y, p)),
            |scene: &mut Scene, _| {
                scene.play(Cue::Wood, CueOptions::once(sfx::WOOD_VOLUME));
                scene.button.armed = true;
            },
        )
    }

    pub(crate) fn hover_play_button(&mut self, sched: &mut Sched) -> bool {
        if !self.button.enabled || self.button.hovered {
            return false;
        }
        self.button.hovered = true;
        self.play(Cue::Hover, CueOptions::once(sfx::HOVER_VOLUME));
        self.grow_play_button(sched, 1.0);
        true
    }

    pub(crate) fn unhover_play_button(&mut self, sched: &mut Sched) -> bool {
        if !self.button.hovered {
            return false;
        }
        self.button.hovered = false;
        self.grow_play_button(sched, 0.0);
        true
    }

    fn grow_play_button(&mut self, sched: &mut Sched, to: f32) {
        if let Some(previous) = self.button.hover_tween.take() {
            sched.cancel(previous);
        }
        let from = self.button.hover_amount;
        let handle = sched.start(BUTTON_HOVER_SECS, move |scene: &mut Scene, _, p| {
            let amount = lerp(from, to, p);
            scene.button.hover_amount = amount;
            scene.render(
                Entity::PlayButton,
                Property::Scale(lerp(1.0, BUTTON_HOVER_SCALE, amount)),
            );
            scene.render(
                Entity::PlayButtonLabel,
                Property::Scale(lerp(1.0, BUTTON_LABEL_HOVER_SCALE, amount)),
            );
        });
        self.button.hover_tween = Some(handle);
    }

    fn move_button(&mut self, y: f32) {
        self.button.y = y;
        self.render(Entity::PlayButton, Property::Y(y));
    }

    pub(crate) fn fade_fog(&mut self, sched: &mut Sched, to: f32) -> TweenHandle {
        let from = self.fog_alpha;
        let secs = if to < from {
            FOG_FADE_OUT_SECS
        } else {
            FOG_FADE_IN_SECS
        };
        sched.start(secs, move |scene: &mut Scene, _, p| {
            scene.fog_alpha = lerp(from, to, p);
            scene.render(Entity::Fog, Property::Alpha(scene.fog_alpha));
        })
    }

    pub(crate) fn fade_dark(&mut self, sched: &mut Sched, to: f32) -> TweenHandle {
        let from = self.dark_alpha;
        sched.start(DARK_FADE_SECS, move |scene: &mut Scene, _, p| {
            scene.dark_alpha = lerp(from, to, p);
            scene.render(Entity::Dark, Property::Alpha(scene.dark_alpha));
        })
    }

    pub(crate) fn drop_total_sign(&mut self, sched: &mut Sched) -> TweenHandle {
        self.play(Cue::Wood, CueOptions::once(sfx::WOOD_VOLUME));
        self.slide_total_sign(sched, SIGN_VISIBLE_Y, SIGN_DROP_SECS)
    }

    pub(crate) fn retract_total_sign(&mut self, sched: &mut Sched) -> TweenHandle {
        self.slide_total_sign(sched, SIGN_HIDDEN_Y, SIGN_RETRACT_SECS)
    }

    fn slide_total_sign(&mut self, sched: &mut Sched, to: f32, secs: f32) -> TweenHandle {
        let from = self.sign_y;
        sched.start(secs, move |scene: &mut Scene, _, p| {
            scene.sign_y = lerp(from, to, p);
            scene.render(Entity::TotalSign, Property::Y(scene.sign_y));
        })
    }

    pub(crate) fn set_total_sign(&mut self, total: u64) {
        self.render(Entity::TotalSign, Property::Text(format_money(total)));
    }

    /// Random jitter of the whole stage, scaled by the player's shake setting.
    pub(crate) fn start_screen_shake(&mut self, sched: &mut Sched) -> TweenHandle {
        sched.start_continuous(|scene: &mut Scene, _, _| {
            let k = scene.shake_strength;
            let mut jitter = || scene.fx_rng.r#gen::<f32>() - 0.5;
            let x = jitter() * SHAKE_OFFSET * k;
            let y = jitter() * SHAKE_OFFSET * k;
            let rotation = jitter() * SHAKE_ROTATION * k;
            let scale = 1.0 + jitter() * SHAKE_SCALE * k;
            scene.render(Entity::Stage, Property::X(x));
            scene.render(Entity::Stage, Property::Y(y));
            scene.render(Entity::Stage, Property::Rotation(rotation));
            scene.render(Entity::Stage, Property::Scale(scale));
        })
    }

    /// Seven rocks tumble down the screen for [`ROCK_RAIN_SECS`], then vanish.
    pub(crate) fn start_rock_rain(&mut self, sched: &mut Sched) -> TweenHandle {
        let rocks: Vec<Rock> = (0..ROCK_COUNT)
            .map(|_| Rock::spawn(&mut self.fx_rng))
            .collect();
        for (i, rock) in rocks.iter().enumerate() {
            let entity = Entity::Rock(i as u8);
            self.render(entity, Property::Scale(rock.scale));
            self.render(entity, Property::X(rock.x));
            self.render(entity, Property::Y(rock.y));
            self.render(entity, Property::Visible(true));
        }
        self.rocks_falling = true;

        sched.start_with(
            ROCK_RAIN_SECS,
            move |scene: &mut Scene, _, p| {
                let t = p * ROCK_RAIN_SECS;
                for (i, rock) in rocks.iter().enumerate() {
                    let entity = Entity::Rock(i as u8);
                    scene.render(entity, Property::X(rock.x + rock.vx * t));
                    scene.render(entity, Property::Y(rock.y + rock.vy * t));
                    scene.render(entity, Property::Rotation(rock.spin * t));
                }
            },
            |scene: &mut Scene, _| scene.clear_rock_rain(),
        )
    }

    pub(crate) fn clear_rock_rain(&mut self) {
        if !self.rocks_falling {
            return;
        }
        self.rocks_falling = false;
        for i in 0..ROCK_COUNT {
            self.render(Entity::Rock(i), Property::Visible(false));
        }
    }

    pub(crate) fn settle_stage(&mut self) {
        self.render(Entity::Stage, Property::X(0.0));
        self.render(Entity::Stage, Property::Y(0.0));
        self.render(Entity::Stage, Property::Rotation(0.0));
        self.render(Entity::Stage, Property::Scale(1.0));
    }

    pub(crate) fn show_bonus_popup(&mut self, sched: &mut Sched, value: u32) -> [TweenHandle; 2] {
        self.bonus_popup_visible = true;
        self.render(Entity::BonusPopup, Property::Text(format_money(value as u64)));
        self.render(Entity::BonusPopup, Property::Alpha(0.0));
        self.render(Entity::BonusPopup, Property::Visible(true));
        self.play(Cue::Bonus, CueOptions::once(sfx::BONUS_VOLUME));
        self.play(Cue::Clapping, CueOptions::once(sfx::CLAPPING_VOLUME));

        let fade = sched.start(BONUS_POPUP_FADE_SECS, |scene: &mut Scene, _, p| {
            scene.render(Entity::BonusPopup, Property::Alpha(p));
        });
        let pulse = sched.start_continuous(|scene: &mut Scene, _, t| {
            let pulse = 0.5 + (t * BONUS_PULSE_SPEED).sin() * 0.5;
            scene.render(Entity::BonusPopup, Property::Scale(lerp(1.0, BONUS_PULSE_SCALE, pulse)));
        });
        [fade, pulse]
    }

    pub(crate) fn hide_bonus_popup(&mut self) {
        self.bonus_popup_visible = false;
        self.render(Entity::BonusPopup, Property::Visible(false));
    }

    /// Fades the popup in while its panel drops into place, then keeps it
    /// rocking and floating until it is hidden.
    pub(crate) fn show_total_popup(&mut self, sched: &mut Sched, total: u64) -> [TweenHandle; 3] {
        self.total_popup_visible = true;
        self.total_popup_y = TOTAL_POPUP_HIDDEN_Y;
        self.render(Entity::TotalPopup, Property::Text(format_money(total)));
        self.render(Entity::TotalPopup, Property::Alpha(0.0));
        self.render(Entity::TotalPopup, Property::Y(TOTAL_POPUP_HIDDEN_Y));
        self.render(Entity::TotalPopup, Property::Visible(true));
        self.play(Cue::Wood, CueOptions::once(sfx::WOOD_VOLUME));

        let fade = sched.start(TOTAL_POPUP_FADE_SECS, |scene: &mut Scene, _, p| {
            scene.render(Entity::TotalPopup, Property::Alpha(p));
        });
        let drop = sched.start(TOTAL_POPUP_DROP_SECS, |scene: &mut Scene, _, p| {
            scene.total_popup_y = lerp(TOTAL_POPUP_HIDDEN_Y, TOTAL_POPUP_REST_Y, p);
        });
        let swing = sched.start_continuous(|scene: &mut Scene, _, t| {
            let rotation = (t * TOTAL_POPUP_SWING_SPEED).sin() * TOTAL_POPUP_SWING_AMPLITUDE;
            let y = scene.total_popup_y + (t * TOTAL_POPUP_FLOAT_SPEED).sin() * TOTAL_POPUP_FLOAT;
            scene.render(Entity::TotalPopup, Property::Rotation(rotation));
            scene.render(Entity::TotalPopup, Property::Y(y));
        });
        [fade, drop, swing]
    }

    pub(crate) fn hide_total_popup(&mut self) {
        self.total_popup_visible = false;
        self.render(Entity::TotalPopup, Property::Visible(false));
    }
}

pub fn format_money(value: u64) -> String {
    format!("{value}$")
}
