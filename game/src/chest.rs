use chest_engine::{Rgb, TweenHandle, TweenSet, lerp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::present::{ChestPart, Entity, Property};
use crate::reward::{Reward, RewardKind, RewardRoller};
use crate::scene::{Scene, SceneEvent, Sched};
use crate::sfx::{self, Cue, CueOptions};

pub const IDLE_ALPHA: f32 = 0.6;
pub const IDLE_SCALE: f32 = 0.9;
pub const IDLE_TINT: Rgb = Rgb(0xAA_AA_AA);

pub const ACTIVATE_SECS: f32 = 1.5;
pub const JUMP_SECS: f32 = 0.5;
pub const JUMP_HEIGHT: f32 = -10.0;
pub const OPEN_SECS: f32 = 1.0;
/// Total time from an accepted pick to the reveal.
pub const REVEAL_SECS: f32 = JUMP_SECS + OPEN_SECS;
pub const OPEN_SCALE_BOOST: f32 = 0.15;
pub const LOSE_SHRINK: f32 = 0.03;

const HOVER_AMPLITUDE: f32 = 2.0;
const HOVER_FREQ: f32 = 2.0;

const LABEL_START_Y: f32 = -10.0;
const LOSE_LABEL_START_Y: f32 = -5.0;
const LABEL_RISE: f32 = 20.0;
const LABEL_RISE_SECS: f32 = 0.8;
const LABEL_WOBBLE_AMPLITUDE: f32 = 3.0;
const LOSE_WOBBLE_FREQ: f32 = 1.5;
const WIN_WOBBLE_FREQ: f32 = 2.0;
const BONUS_LABEL_SECS: f32 = 0.6;
const BONUS_LABEL_START_SCALE: f32 = 0.4;

const LOSE_TINT: Rgb = Rgb(0x7A_17_17);
const LOSE_TINT_SECS: f32 = 0.5;
const LOSE_SHRINK_SECS: f32 = 0.5;
const WIN_TINT: Rgb = Rgb(0xC8_A4_41);
const WIN_LIGHT: Rgb = Rgb(0xFF_D4_6B);
const BONUS_TINT: Rgb = Rgb(0x5E_CB_FF);
const BONUS_LIGHT: Rgb = Rgb(0x6D_DC_FF);
const RESULT_TINT_SECS: f32 = 0.4;
const LIGHT_PULSE_SPEED: f32 = 0.5;
const ROCKS_DELAY_SECS: f32 = 0.5;

/// Stable chest identity: its index in the round's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChestId(pub usize);

impl std::fmt::Display for ChestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChestState {
    Closed,
    Opening,
    Opened,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChestError {
    #[error("chest {0} cannot be reset while it is opening")]
    ResetWhileOpening(ChestId),
    #[error("no chest with id {0}")]
    Unknown(ChestId),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChestLayout {
    pub x: f32,
    pub y: f32,
    /// Sprite scale at rest; idle and open scales derive from it.
    pub scale: f32,
}

impl ChestLayout {
    /// Grid placement: the back row is drawn smaller and pulled in.
    pub fn grid(index: usize, columns: usize) -> Self {
        let columns = columns.max(1);
        let col = (index % columns) as f32;
        let row = index / columns;

        let (width, centering, scale) = if row == 0 {
            (135.0, -30.0, 0.12)
        } else {
            (150.0, -45.0, 0.15)
        };
        let height = 150.0;
        let outer = 200.0;
        let inner = 60.0;

        Self {
            x: 15.0 + centering + outer + width / 2.0 + col * (width + inner + 50.0),
            y: 210.0 + height / 2.0 + row as f32 * (height - 50.0),
            scale,
        }
    }
}

/// Last values pushed for the properties that later tweens start from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Look {
    alpha: f32,
    scale: f32,
}

#[derive(Debug)]
pub struct Chest {
    id: ChestId,
    layout: ChestLayout,
    state: ChestState,
    interactable: bool,
    reward: Option<Reward>,
    look: Look,
    tweens: TweenSet,
    hover: Option<TweenHandle>,
}

impl Chest {
    pub fn new(id: ChestId, layout: ChestLayout) -> Self {
        Self {
            id,
            layout,
            state: ChestState::Closed,
            interactable: false,
            reward: None,
            look: Look {
                alpha: 1.0,
                scale: layout.scale,
            },
            tweens: TweenSet::new(),
            hover: None,
        }
    }

    pub fn id(&self) -> ChestId {
        self.id
    }

    pub fn layout(&self) -> ChestLayout {
        self.layout
    }

    pub fn state(&self) -> ChestState {
        self.state
    }

    pub fn is_interactable(&self) -> bool {
        self.interactable
    }

    pub fn is_opened(&self) -> bool {
        self.state == ChestState::Opened
    }

    pub fn is_hovered(&self) -> bool {
        self.hover.is_some()
    }

    /// `None` until the chest leaves `Closed`; fixed from then until reset.
    pub fn reward(&self) -> Option<Reward> {
        self.reward
    }

    pub fn can_pick(&self) -> bool {
        self.state == ChestState::Closed && self.interactable
    }

    pub fn tracked_tweens(&self) -> usize {
        self.tweens.len() + usize::from(self.hover.is_some())
    }

    fn begin_opening(&mut self, reward: Reward) -> bool {
        if !self.can_pick() {
            return false;
        }
        self.state = ChestState::Opening;
        self.interactable = false;
        self.reward = Some(reward.normalized());
        true
    }

    fn finish_opening(&mut self) -> Option<Reward> {
        if self.state != ChestState::Opening {
            return None;
        }
        self.state = ChestState::Opened;
        self.reward
    }

    fn clear(&mut self) {
        self.state = ChestState::Closed;
        self.interactable = false;
        self.reward = None;
    }
}

impl Scene {
    fn chest_prop(&mut self, id: ChestId, part: ChestPart, property: Property) {
        self.render(Entity::Chest(id, part), property);
    }

    fn track(&mut self, id: ChestId, handle: TweenHandle) {
        if let Some(chest) = self.chest_mut(id) {
            chest.tweens.track(handle);
        }
    }

    fn layout_of(&self, id: ChestId) -> Option<ChestLayout> {
        self.chest(id).map(Chest::layout)
    }

    pub(crate) fn set_chest_idle(&mut self, id: ChestId) {
        let Some(layout) = self.layout_of(id) else {
            return;
        };
        let scale = layout.scale * IDLE_SCALE;
        if let Some(chest) = self.chest_mut(id) {
            chest.look = Look {
                alpha: IDLE_ALPHA,
                scale,
            };
            chest.interactable = false;
        }
        self.chest_prop(id, ChestPart::Body, Property::Alpha(IDLE_ALPHA));
        self.chest_prop(id, ChestPart::ClosedSprite, Property::Scale(scale));
        self.chest_prop(id, ChestPart::OpenSprite, Property::Scale(scale));
        self.chest_prop(id, ChestPart::ClosedSprite, Property::Tint(IDLE_TINT));
    }

    /// Brightens an idle chest up to full size and makes it pickable at the end.
    pub(crate) fn activate_chest(&mut self, sched: &mut Sched, id: ChestId) {
        let Some(chest) = self.chest(id) else {
            return;
        };
        let from = chest.look;
        let target_scale = chest.layout.scale;

        let handle = sched.start_with(
            ACTIVATE_SECS,
            move |scene: &mut Scene, _, p| {
                let scale = lerp(from.scale, target_scale, p);
                let alpha = lerp(from.alpha, 1.0, p);
                if let Some(chest) = scene.chest_mut(id) {
                    chest.look = Look { alpha, scale };
                }
                scene.chest_prop(id, ChestPart::ClosedSprite, Property::Scale(scale));
                scene.chest_prop(id, ChestPart::OpenSprite, Property::Scale(scale));
                scene.chest_prop(
                    id,
                    ChestPart::ClosedSprite,
                    Property::Tint(IDLE_TINT.lerp(Rgb::WHITE, p)),
                );
                scene.chest_prop(id, ChestPart::Body, Property::Alpha(alpha));
            },
            move |scene: &mut Scene, _| scene.enable_chest(id),
        );
        self.track(id, handle);
    }

    pub(crate) fn enable_chest(&mut self, id: ChestId) {
        if let Some(chest) = self.chest_mut(id) {
            chest.interactable = true;
        }
    }

    pub(crate) fn disable_chest(&mut self, sched: &mut Sched, id: ChestId) {
        if let Some(chest) = self.chest_mut(id) {
            chest.interactable = false;
        }
        self.unhover_chest(sched, id);
    }

    /// Starts the idle wobble on a pickable chest. Returns `false` when ignored.
    pub(crate) fn hover_chest(&mut self, sched: &mut Sched, id: ChestId) -> bool {
        let Some(chest) = self.chest(id) else {
            return false;
        };
        if !chest.can_pick() || chest.hover.is_some() {
            return false;
        }
        let base_y = chest.layout.y;

        let handle = sched.start_continuous(move |scene: &mut Scene, _, t| {
            let y = base_y + (t * HOVER_FREQ).sin() * HOVER_AMPLITUDE;
            scene.chest_prop(id, ChestPart::Body, Property::Y(y));
        });
        if let Some(chest) = self.chest_mut(id) {
            chest.hover = Some(handle);
        }
        self.play(Cue::Hover, CueOptions::once(sfx::HOVER_VOLUME));
        true
    }

    pub(crate) fn unhover_chest(&mut self, sched: &mut Sched, id: ChestId) {
        let Some(chest) = self.chest_mut(id) else {
            return;
        };
        let Some(handle) = chest.hover.take() else {
            return;
        };
        let base_y = chest.layout.y;
        sched.cancel(handle);
        self.chest_prop(id, ChestPart::ClosedSprite, Property::Tint(Rgb::WHITE));
        self.chest_prop(id, ChestPart::Body, Property::Y(base_y));
    }

    /// `Closed -> Opening`. The reward is rolled here, once, and never changes
    /// until the chest is reset.
    pub(crate) fn pick_chest(
        &mut self,
        sched: &mut Sched,
        id: ChestId,
        roller: &mut dyn RewardRoller,
    ) -> Option<Reward> {
        if !self.chest(id).is_some_and(Chest::can_pick) {
            tracing::trace!(chest = id.0, "pick ignored");
            return None;
        }

        self.play(Cue::Open, CueOptions::once(sfx::OPEN_VOLUME));
        self.unhover_chest(sched, id);

        let reward = roller.roll().normalized();
        let chest = self.chest_mut(id)?;
        if !chest.begin_opening(reward) {
            return None;
        }
        tracing::debug!(chest = id.0, ?reward, "chest opening");

        self.jump_chest(sched, id);
        Some(reward)
    }

    fn jump_chest(&mut self, sched: &mut Sched, id: ChestId) {
        let Some(layout) = self.layout_of(id) else {
            return;
        };
        let handle = sched.start_with(
            JUMP_SECS,
            move |scene: &mut Scene, _, p| {
                let y = if p < 1.0 {
                    layout.y + JUMP_HEIGHT * p
                } else {
                    layout.y
                };
                scene.chest_prop(id, ChestPart::Body, Property::Y(y));
            },
            move |scene: &mut Scene, sched| scene.cross_fade_chest(sched, id),
        );
        self.track(id, handle);
    }

    fn cross_fade_chest(&mut self, sched: &mut Sched, id: ChestId) {
        let Some(layout) = self.layout_of(id) else {
            return;
        };
        self.chest_prop(id, ChestPart::ClosedSprite, Property::Alpha(1.0));
        self.chest_prop(id, ChestPart::OpenSprite, Property::Alpha(0.0));
        self.chest_prop(id, ChestPart::OpenSprite, Property::Visible(true));

        let handle = sched.start_with(
            OPEN_SECS,
            move |scene: &mut Scene, _, p| {
                let scale = layout.scale * (1.0 + OPEN_SCALE_BOOST * p);
                scene.chest_prop(id, ChestPart::ClosedSprite, Property::Scale(scale));
                scene.chest_prop(id, ChestPart::OpenSprite, Property::Scale(scale));
                scene.chest_prop(id, ChestPart::ClosedSprite, Property::Alpha(1.0 - p));
                scene.chest_prop(id, ChestPart::OpenSprite, Property::Alpha(p));
            },
            move |scene: &mut Scene, sched| scene.finish_chest(sched, id),
        );
        self.track(id, handle);
    }

    /// `Opening -> Opened`: starts the result effects and reports the reveal.
    fn finish_chest(&mut self, sched: &mut Sched, id: ChestId) {
        let Some(reward) = self.chest_mut(id).and_then(Chest::finish_opening) else {
            return;
        };

        self.show_result_fx(sched, id, reward);
        self.chest_prop(id, ChestPart::ClosedSprite, Property::Visible(false));
        self.chest_prop(id, ChestPart::OpenSprite, Property::Visible(true));
        tracing::debug!(chest = id.0, ?reward, "chest revealed");
        self.emit(SceneEvent::ChestRevealed { chest: id, reward });
    }

    fn show_result_fx(&mut self, sched: &mut Sched, id: ChestId, reward: Reward) {
        match reward.kind() {
            RewardKind::Lose => self.show_lose_fx(sched, id),
            RewardKind::Win => {
                self.play(Cue::Win, CueOptions::once(sfx::WIN_VOLUME));
                self.show_win_fx(sched, id, reward.value());
            }
            RewardKind::Bonus => {
                self.play(Cue::Earthquake, CueOptions::once(sfx::EARTHQUAKE_VOLUME));
                let rocks = sched.delay(ROCKS_DELAY_SECS, |scene: &mut Scene, _| {
                    scene.play(Cue::Rocks, CueOptions::once(sfx::ROCKS_VOLUME));
                });
                self.track(id, rocks);
                self.stop(Cue::BgMusic);
                self.show_bonus_fx(sched, id);
            }
        }
    }

    fn show_label(&mut self, id: ChestId, text: String, y: f32) {
        self.chest_prop(id, ChestPart::Label, Property::Text(text));
        self.chest_prop(id, ChestPart::Label, Property::Y(y));
        self.chest_prop(id, ChestPart::Label, Property::Visible(true));
    }

    fn show_lose_fx(&mut self, sched: &mut Sched, id: ChestId) {
        let Some(layout) = self.layout_of(id) else {
            return;
        };
        let from_y = LOSE_LABEL_START_Y;
        let to_y = from_y - LABEL_RISE;
        self.show_label(id, "LOSE".to_string(), from_y);

        let handle = sched.start_with(
            LABEL_RISE_SECS,
            move |scene: &mut Scene, _, p| {
                scene.chest_prop(id, ChestPart::Label, Property::Y(lerp(from_y, to_y, p)));
            },
            move |scene: &mut Scene, sched| {
                scene.wobble_label(sched, id, to_y, LOSE_WOBBLE_FREQ);
                scene.tint_open_sprite(sched, id, LOSE_TINT, LOSE_TINT_SECS);

                let shrink = sched.start(LOSE_SHRINK_SECS, move |scene: &mut Scene, _, p| {
                    let scale = layout.scale * (1.0 - LOSE_SHRINK * p);
                    scene.chest_prop(id, ChestPart::OpenSprite, Property::Scale(scale));
                });
                scene.track(id, shrink);
            },
        );
        self.track(id, handle);
    }

    fn show_win_fx(&mut self, sched: &mut Sched, id: ChestId, value: u32) {
        let from_y = LABEL_START_Y;
        let to_y = from_y - LABEL_RISE;
        self.show_label(id, format!("{value}$"), from_y);
        self.tint_open_sprite(sched, id, WIN_TINT, RESULT_TINT_SECS);
        self.pulse_light(sched, id, WIN_LIGHT);

        let handle = sched.start_with(
            LABEL_RISE_SECS,
            move |scene: &mut Scene, _, p| {
                scene.chest_prop(id, ChestPart::Label, Property::Y(lerp(from_y, to_y, p)));
            },
            move |scene: &mut Scene, sched| scene.wobble_label(sched, id, to_y, WIN_WOBBLE_FREQ),
        );
        self.track(id, handle);
    }

    fn show_bonus_fx(&mut self, sched: &mut Sched, id: ChestId) {
        let from_y = LABEL_START_Y;
        let to_y = from_y - LABEL_RISE;
        self.show_label(id, "BONUS".to_string(), from_y);
        self.chest_prop(id, ChestPart::Label, Property::Alpha(0.0));
        self.chest_prop(id, ChestPart::Label, Property::Scale(BONUS_LABEL_START_SCALE));
        self.tint_open_sprite(sched, id, BONUS_TINT, RESULT_TINT_SECS);
        self.pulse_light(sched, id, BONUS_LIGHT);

        let handle = sched.start_with(
            BONUS_LABEL_SECS,
            move |scene: &mut Scene, _, p| {
                scene.chest_prop(id, ChestPart::Label, Property::Alpha(p));
                scene.chest_prop(
                    id,
                    ChestPart::Label,
                    Property::Scale(lerp(BONUS_LABEL_START_SCALE, 1.0, p)),
                );
                scene.chest_prop(id, ChestPart::Label, Property::Y(lerp(from_y, to_y, p)));
            },
            move |scene: &mut Scene, sched| scene.wobble_label(sched, id, to_y, WIN_WOBBLE_FREQ),
        );
        self.track(id, handle);
    }

    fn wobble_label(&mut self, sched: &mut Sched, id: ChestId, base_y: f32, freq: f32) {
        let handle = sched.start_continuous(move |scene: &mut Scene, _, t| {
            let y = base_y + (t * freq).sin() * LABEL_WOBBLE_AMPLITUDE;
            scene.chest_prop(id, ChestPart::Label, Property::Y(y));
        });
        self.track(id, handle);
    }

    fn tint_open_sprite(&mut self, sched: &mut Sched, id: ChestId, to: Rgb, secs: f32) {
        let handle = sched.start(secs, move |scene: &mut Scene, _, p| {
            let tint = Rgb::WHITE.lerp(to, p);
            scene.chest_prop(id, ChestPart::OpenSprite, Property::Tint(tint));
        });
        self.track(id, handle);
    }

    fn pulse_light(&mut self, sched: &mut Sched, id: ChestId, tint: Rgb) {
        self.chest_prop(id, ChestPart::Light, Property::Tint(tint));
        self.chest_prop(id, ChestPart::Light, Property::Alpha(0.0));
        self.chest_prop(id, ChestPart::Light, Property::Visible(true));

        let handle = sched.start_continuous(move |scene: &mut Scene, _, t| {
            let pulse = 0.5 + (t * LIGHT_PULSE_SPEED).sin() * 0.5;
            scene.chest_prop(id, ChestPart::Light, Property::Alpha(pulse * 0.6));
            scene.chest_prop(id, ChestPart::Light, Property::Scale(1.0 + pulse * 0.3));
        });
        self.track(id, handle);
    }

    /// Back to idle `Closed`. Rejected while the chest is mid-reveal.
    pub(crate) fn reset_chest(&mut self, sched: &mut Sched, id: ChestId) -> Result<(), ChestError> {
        let chest = self.chest(id).ok_or(ChestError::Unknown(id))?;
        if chest.state == ChestState::Opening {
            return Err(ChestError::ResetWhileOpening(id));
        }
        self.force_reset_chest(sched, id);
        Ok(())
    }

    /// Cancels every animation the chest owns, then resets it regardless of state.
    pub(crate) fn force_reset_chest(&mut self, sched: &mut Sched, id: ChestId) {
        self.unhover_chest(sched, id);
        let Some(chest) = self.chest_mut(id) else {
            return;
        };
        let cancelled = chest.tweens.cancel_all(sched);
        let was = chest.state;
        let layout = chest.layout;
        chest.clear();
        tracing::debug!(chest = id.0, ?was, cancelled, "chest reset");

        self.chest_prop(id, ChestPart::Body, Property::Y(layout.y));
        self.chest_prop(id, ChestPart::ClosedSprite, Property::Visible(true));
        self.chest_prop(id, ChestPart::ClosedSprite, Property::Alpha(1.0));
        self.chest_prop(id, ChestPart::OpenSprite, Property::Visible(false));
        self.chest_prop(id, ChestPart::OpenSprite, Property::Alpha(1.0));
        self.chest_prop(id, ChestPart::OpenSprite, Property::Tint(Rgb::WHITE));
        self.chest_prop(id, ChestPart::Label, Property::Visible(false));
        self.chest_prop(id, ChestPart::Label, Property::Text(String::new()));
        self.chest_prop(id, ChestPart::Light, Property::Visible(false));
        self.set_chest_idle(id);
    }
}
