//! The round orchestrator.
//!
//! [`ChestGame`] owns the frame clock, the tween scheduler, the animated scene
//! and the round tally. Input arrives through [`ChestGame::activate`] and
//! friends; everything that happens over time is a tween whose completion
//! reports back as a [`SceneEvent`], drained after each scheduler pass.

use std::time::{Duration, Instant};

use chest_engine::profiling::{FrameTimings, Profiler};
use chest_engine::{FrameClock, FrameTick, TweenHandle, TweenSet};
use serde::{Deserialize, Serialize};

use crate::audio::MixedCues;
use crate::chest::{Chest, ChestId, ChestState};
use crate::present::{CuePlayer, Headless, Renderer};
use crate::reward::{RandomRolls, Reward, RewardRoller};
use crate::round::{BonusResolution, RevealOutcome, Round, RoundPhase};
use crate::scene::{DARK_ALPHA, Scene, SceneEvent, Sched};
use crate::settings::PlayerSettings;
use crate::sfx::{self, Cue, CueOptions};

/// How long the screen shakes before the bonus popup appears.
pub const BONUS_HOLD_SECS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    StartOverlay,
    PlayButton,
    Chest(ChestId),
    BonusPopup,
    TotalPopup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    ChestPicked { chest: ChestId },
    ChestRevealed { chest: ChestId, reward: Reward },
    TotalChanged { total: u64 },
    BonusTriggered { value: u32 },
    BonusResolved,
    RoundComplete { total: u64 },
    RoundReset,
}

pub struct GameSetup {
    pub settings: PlayerSettings,
    pub renderer: Box<dyn Renderer>,
    pub cues: Box<dyn CuePlayer>,
    pub roller: Box<dyn RewardRoller>,
    /// Seed for screen-shake jitter.
    pub shake_seed: u64,
}

impl GameSetup {
    pub fn new(settings: PlayerSettings, roller: impl RewardRoller + 'static) -> Self {
        Self {
            settings,
            renderer: Box::new(Headless),
            cues: Box::new(Headless),
            roller: Box::new(roller),
            shake_seed: 0,
        }
    }

    /// Default settings, no presentation, entropy-seeded rolls.
    pub fn headless() -> Self {
        Self::new(PlayerSettings::default(), RandomRolls::from_entropy())
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_cues(mut self, cues: impl CuePlayer + 'static) -> Self {
        self.cues = Box::new(cues);
        self
    }

    pub fn with_shake_seed(mut self, seed: u64) -> Self {
        self.shake_seed = seed;
        self
    }
}

/// Orchestrator-level animations, released together on abort and reset.
#[derive(Debug, Default)]
struct Effects {
    button: Option<TweenHandle>,
    shake: Option<TweenHandle>,
    bonus: TweenSet,
    lobby: TweenSet,
}

impl Effects {
    fn cancel_bonus(&mut self, sched: &mut Sched) {
        if let Some(shake) = self.shake.take() {
            sched.cancel(shake);
        }
        self.bonus.cancel_all(sched);
    }

    fn cancel_all(&mut self, sched: &mut Sched) {
        self.cancel_bonus(sched);
        if let Some(button) = self.button.take() {
            sched.cancel(button);
        }
        self.lobby.cancel_all(sched);
    }
}

pub struct ChestGame {
    clock: FrameClock,
    sched: Sched,
    scene: Scene,
    round: Round,
    roller: Box<dyn RewardRoller>,
    effects: Effects,
    events: Vec<GameEvent>,
}

impl std::fmt::Debug for ChestGame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChestGame")
            .field("clock", &self.clock)
            .field("round", &self.round)
            .field("tweens", &self.sched.len())
            .field("scene", &self.scene)
            .finish_non_exhaustive()
    }
}

impl ChestGame {
    pub fn new(setup: GameSetup) -> Self {
        let settings = setup.settings.sanitized();
        let gameplay = settings.gameplay;
        let cues = MixedCues::new(setup.cues, settings.audio);

        let scene = Scene::new(
            gameplay.chest_count,
            gameplay.columns,
            setup.renderer,
            Box::new(cues),
            settings.video.shake_strength(),
            setup.shake_seed,
        );
        let mut game = Self {
            clock: FrameClock::new(gameplay.reference_fps),
            sched: Sched::new(),
            scene,
            round: Round::new(gameplay.chest_count),
            roller: setup.roller,
            effects: Effects::default(),
            events: Vec::new(),
        };
        game.scene.start_swing(&mut game.sched);
        game.scene.start_fog_drift(&mut game.sched);
        game.scene.play(Cue::Fog, CueOptions::looped(sfx::FOG_VOLUME));
        tracing::debug!(chests = gameplay.chest_count, "chest game ready");
        game
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    pub fn total(&self) -> u64 {
        self.round.total()
    }

    pub fn opened(&self) -> usize {
        self.round.opened()
    }

    pub fn chest_count(&self) -> usize {
        self.round.chest_count()
    }

    pub fn bonus_pending(&self) -> bool {
        self.round.bonus_pending()
    }

    pub fn chest(&self, id: ChestId) -> Option<&Chest> {
        self.scene.chest(id)
    }

    pub fn chests(&self) -> &[Chest] {
        self.scene.chests()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn active_tweens(&self) -> usize {
        self.sched.len()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// For subscribing host-side listeners to frame ticks.
    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Routes a user click. Returns whether anything happened.
    pub fn activate(&mut self, target: Target) -> bool {
        match target {
            Target::StartOverlay => self.scene.dismiss_start_overlay(),
            Target::PlayButton => self.press_play(),
            Target::Chest(id) => self.on_chest_picked(id),
            Target::BonusPopup => {
                if !self.scene.is_bonus_popup_visible() {
                    tracing::trace!("bonus popup click ignored");
                    return false;
                }
                self.on_bonus_interrupt_resolved()
            }
            Target::TotalPopup => {
                if !self.scene.is_total_popup_visible() {
                    tracing::trace!("total popup click ignored");
                    return false;
                }
                self.reset_round()
            }
        }
    }

    pub fn hover(&mut self, id: ChestId) -> bool {
        if !self.round.accepts_picks() {
            return false;
        }
        self.scene.hover_chest(&mut self.sched, id)
    }

    pub fn unhover(&mut self, id: ChestId) {
        self.scene.unhover_chest(&mut self.sched, id);
    }

    pub fn hover_play_button(&mut self) -> bool {
        self.scene.hover_play_button(&mut self.sched)
    }

    pub fn unhover_play_button(&mut self) -> bool {
        self.scene.unhover_play_button(&mut self.sched)
    }

    fn press_play(&mut self) -> bool {
        if self.round.phase() != RoundPhase::AwaitingStart || self.effects.button.is_some() {
            return false;
        }
        match self.scene.raise_play_button(&mut self.sched) {
            Some(handle) => {
                self.effects.button = Some(handle);
                true
            }
            None => false,
        }
    }

    /// `AwaitingStart -> Active`: wakes every chest and clears the stage.
    pub fn start_round(&mut self) -> bool {
        if !self.round.start() {
            tracing::trace!(phase = ?self.round.phase(), "start ignored");
            return false;
        }
        if let Some(raise) = self.effects.button.take() {
            self.sched.cancel(raise);
        }
        self.effects.lobby.cancel_all(&mut self.sched);

        let sched = &mut self.sched;
        let scene = &mut self.scene;
        for id in scene.chest_ids() {
            scene.activate_chest(sched, id);
        }
        scene.dismiss_start_overlay();
        scene.set_play_button_enabled(false);
        scene.set_total_sign(0);
        let fades = [
            scene.fade_fog(sched, 0.0),
            scene.fade_dark(sched, 0.0),
            scene.drop_total_sign(sched),
        ];
        for handle in fades {
            self.effects.lobby.track(handle);
        }
        scene.stop(Cue::Fog);
        scene.play(Cue::BgMusic, CueOptions::looped(sfx::MUSIC_VOLUME));

        tracing::debug!(chests = self.round.chest_count(), "round started");
        true
    }

    /// Accepts a pick only while the round is `Active` and the chest is pickable.
    /// Every other chest is locked until the reveal lands.
    pub fn on_chest_picked(&mut self, id: ChestId) -> bool {
        if !self.round.accepts_picks() {
            tracing::trace!(chest = id.0, phase = ?self.round.phase(), "pick ignored");
            return false;
        }
        let Some(_reward) = self
            .scene
            .pick_chest(&mut self.sched, id, self.roller.as_mut())
        else {
            return false;
        };
        self.round.begin_reveal(id);

        for other in self.scene.chest_ids().filter(|&other| other != id) {
            if !self.scene.chest(other).is_some_and(Chest::is_opened) {
                self.scene.disable_chest(&mut self.sched, other);
            }
        }
        self.events.push(GameEvent::ChestPicked { chest: id });
        true
    }

    /// Tallies a reveal. Ignored unless `chest` is the one currently revealing.
    pub fn on_chest_revealed(&mut self, chest: ChestId, reward: Reward) -> bool {
        let settled = self
            .scene
            .chest(chest)
            .is_some_and(|c| c.is_opened() && c.reward() == Some(reward));
        if !settled {
            tracing::trace!(chest = chest.0, "reveal for unopened chest ignored");
            return false;
        }
        let outcome = self.round.record_reveal(chest, reward);
        if outcome == RevealOutcome::Ignored {
            tracing::trace!(chest = chest.0, "stale reveal ignored");
            return false;
        }
        self.events.push(GameEvent::ChestRevealed { chest, reward });

        match outcome {
            RevealOutcome::Ignored => {}
            RevealOutcome::Continue { total } => {
                if reward.payout() > 0 {
                    self.publish_total(total);
                }
                self.enable_closed_chests();
            }
            RevealOutcome::BonusTriggered { value, total } => {
                tracing::debug!(chest = chest.0, value, total, "bonus interrupt");
                self.lock_all_chests();
                self.events.push(GameEvent::BonusTriggered { value });
                self.begin_bonus_hold();
            }
            RevealOutcome::Complete { total } => {
                if reward.payout() > 0 {
                    self.publish_total(total);
                }
                self.complete_round(total);
            }
        }
        true
    }

    fn begin_bonus_hold(&mut self) {
        self.cancel_bonus_effects();
        self.effects.shake = Some(self.scene.start_screen_shake(&mut self.sched));
        let rocks = self.scene.start_rock_rain(&mut self.sched);
        self.effects.bonus.track(rocks);
        let hold = self
            .sched
            .delay(BONUS_HOLD_SECS, |scene: &mut Scene, _| {
                scene.emit(SceneEvent::BonusHoldElapsed)
            });
        self.effects.bonus.track(hold);
    }

    fn show_bonus_summary(&mut self) {
        let Some(value) = self.round.pending_bonus() else {
            return;
        };
        if let Some(shake) = self.effects.shake.take() {
            self.sched.cancel(shake);
        }
        self.scene.settle_stage();
        for handle in self.scene.show_bonus_popup(&mut self.sched, value) {
            self.effects.bonus.track(handle);
        }
    }

    /// `BonusInterrupt -> Active`, or `-> Complete` when every chest is already open.
    pub fn on_bonus_interrupt_resolved(&mut self) -> bool {
        let Some(resolution) = self.round.resolve_bonus() else {
            tracing::trace!(phase = ?self.round.phase(), "bonus resolve ignored");
            return false;
        };
        self.cancel_bonus_effects();
        self.scene.settle_stage();
        self.scene.hide_bonus_popup();
        self.scene.play(Cue::Click, CueOptions::once(sfx::CLICK_VOLUME));
        self.scene.stop(Cue::Clapping);
        self.scene
            .play(Cue::BgMusic, CueOptions::looped(sfx::MUSIC_VOLUME));

        match resolution {
            BonusResolution::Resume { total } => {
                self.publish_total(total);
                self.events.push(GameEvent::BonusResolved);
                self.enable_closed_chests();
            }
            BonusResolution::Complete { total } => {
                self.publish_total(total);
                self.events.push(GameEvent::BonusResolved);
                self.complete_round(total);
            }
        }
        true
    }

    fn cancel_bonus_effects(&mut self) {
        self.effects.cancel_bonus(&mut self.sched);
        self.scene.clear_rock_rain();
    }

    fn complete_round(&mut self, total: u64) {
        let sign = self.scene.retract_total_sign(&mut self.sched);
        self.effects.lobby.track(sign);
        for handle in self.scene.show_total_popup(&mut self.sched, total) {
            self.effects.lobby.track(handle);
        }
        tracing::info!(total, opened = self.round.opened(), "round complete");
        self.events.push(GameEvent::RoundComplete { total });
    }

    /// `Complete -> AwaitingStart`.
    pub fn reset_round(&mut self) -> bool {
        if !self.round.reset() {
            tracing::trace!(phase = ?self.round.phase(), "reset ignored");
            return false;
        }
        for id in self.scene.chest_ids() {
            if let Err(err) = self.scene.reset_chest(&mut self.sched, id) {
                tracing::warn!(%err, "forcing chest reset");
                self.scene.force_reset_chest(&mut self.sched, id);
            }
        }
        self.return_to_lobby();
        true
    }

    /// Resets from any phase, cancelling every running chest and round animation.
    pub fn abort_round(&mut self) {
        let was = self.round.phase();
        for id in self.scene.chest_ids() {
            self.scene.force_reset_chest(&mut self.sched, id);
        }
        self.round.abort();
        self.scene.hide_bonus_popup();
        self.scene.settle_stage();
        self.return_to_lobby();
        tracing::debug!(?was, "round aborted");
    }

    fn return_to_lobby(&mut self) {
        self.effects.cancel_all(&mut self.sched);
        self.scene.clear_rock_rain();

        let sched = &mut self.sched;
        let scene = &mut self.scene;
        scene.hide_total_popup();
        scene.set_total_sign(0);
        let handles = [
            scene.retract_total_sign(sched),
            scene.fade_fog(sched, 1.0),
            scene.fade_dark(sched, DARK_ALPHA),
            scene.return_play_button(sched),
        ];
        for handle in handles {
            self.effects.lobby.track(handle);
        }
        scene.stop(Cue::BgMusic);
        scene.play(Cue::Fog, CueOptions::looped(sfx::FOG_IDLE_VOLUME));

        self.events.push(GameEvent::TotalChanged { total: 0 });
        self.events.push(GameEvent::RoundReset);
    }

    fn publish_total(&mut self, total: u64) {
        self.scene.set_total_sign(total);
        self.events.push(GameEvent::TotalChanged { total });
    }

    fn enable_closed_chests(&mut self) {
        for id in self.scene.chest_ids() {
            if self
                .scene
                .chest(id)
                .is_some_and(|c| c.state() == ChestState::Closed)
            {
                self.scene.enable_chest(id);
            }
        }
    }

    fn lock_all_chests(&mut self) {
        for id in self.scene.chest_ids() {
            self.scene.disable_chest(&mut self.sched, id);
        }
    }

    /// Pumps one host frame.
    pub fn frame(&mut self, delta: Duration) -> FrameTick {
        let tick = self.clock.tick(delta);
        self.run_frame(tick)
    }

    /// Pumps one host frame whose delta is given in reference-rate frames.
    pub fn frame_scaled(&mut self, delta_frames: f32) -> FrameTick {
        let tick = self.clock.tick_frames(delta_frames);
        self.run_frame(tick)
    }

    pub fn frame_profiled(&mut self, delta: Duration, profiler: &mut dyn Profiler) -> FrameTick {
        let start = Instant::now();
        let tick = self.clock.tick(delta);
        let clock = start.elapsed();

        let tweens_start = Instant::now();
        self.sched.advance(&mut self.scene, tick.delta);
        let tweens = tweens_start.elapsed();

        let dispatch_start = Instant::now();
        self.dispatch();
        let dispatch = dispatch_start.elapsed();

        profiler.on_frame(
            tick.frame,
            FrameTimings {
                clock,
                tweens,
                dispatch,
                total: start.elapsed(),
            },
        );
        tick
    }

    fn run_frame(&mut self, tick: FrameTick) -> FrameTick {
        self.sched.advance(&mut self.scene, tick.delta);
        self.dispatch();
        tick
    }

    fn dispatch(&mut self) {
        loop {
            let events = self.scene.take_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                match event {
                    SceneEvent::ChestRevealed { chest, reward } => {
                        self.on_chest_revealed(chest, reward);
                    }
                    SceneEvent::PlayButtonRaised => {
                        self.effects.button = None;
                        self.start_round();
                    }
                    SceneEvent::BonusHoldElapsed => {
                        if self.round.phase() == RoundPhase::BonusInterrupt {
                            self.show_bonus_summary();
                        }
                    }
                }
            }
        }
    }
}
