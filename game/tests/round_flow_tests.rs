use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chest_game::chest::{ACTIVATE_SECS, ChestId, ChestState, REVEAL_SECS};
use chest_game::orchestrator::{BONUS_HOLD_SECS, ChestGame, GameEvent, GameSetup, Target};
use chest_game::reward::{RandomRolls, Reward, RewardRoller, ScriptedRolls};
use chest_game::round::RoundPhase;
use chest_game::scene::BUTTON_RETURN_SECS;
use chest_game::settings::{GameplaySettings, MAX_CHESTS, PlayerSettings};

const FRAME: f32 = 1.0 / 60.0;
/// Slack for frames lost to f32 accumulation and next-tick chaining.
const SLACK_SECS: f32 = 0.25;

fn settings_with(chest_count: usize) -> PlayerSettings {
    PlayerSettings {
        gameplay: GameplaySettings {
            chest_count,
            ..GameplaySettings::default()
        },
        ..PlayerSettings::default()
    }
}

fn game_with(chest_count: usize, rolls: impl IntoIterator<Item = Reward>) -> ChestGame {
    ChestGame::new(GameSetup::new(
        settings_with(chest_count),
        ScriptedRolls::new(rolls),
    ))
}

fn run_secs(game: &mut ChestGame, secs: f32) {
    let frames = ((secs + SLACK_SECS) / FRAME).ceil() as usize;
    for _ in 0..frames {
        game.frame(Duration::from_secs_f32(FRAME));
    }
}

/// A game whose round is `Active` with every chest pickable.
fn started(chest_count: usize, rolls: impl IntoIterator<Item = Reward>) -> ChestGame {
    let mut game = game_with(chest_count, rolls);
    assert!(game.start_round());
    run_secs(&mut game, ACTIVATE_SECS);
    assert!(game.chests().iter().all(|c| c.can_pick()));
    game.drain_events();
    game
}

fn open(game: &mut ChestGame, id: usize) {
    assert!(game.activate(Target::Chest(ChestId(id))), "pick {id} refused");
    run_secs(game, REVEAL_SECS);
}

fn totals_changed(events: &[GameEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::TotalChanged { total } => Some(*total),
            _ => None,
        })
        .collect()
}

#[test]
fn scripted_round_accumulates_and_completes_after_bonus() {
    let mut game = started(
        6,
        [
            Reward::LOSE,
            Reward::win(70),
            Reward::LOSE,
            Reward::bonus(800),
            Reward::LOSE,
            Reward::win(60),
        ],
    );

    let mut totals = Vec::new();
    let mut events = Vec::new();
    for id in 0..6 {
        open(&mut game, id);
        totals.push(game.total());

        if game.phase() == RoundPhase::BonusInterrupt {
            assert_eq!(id, 3);
            run_secs(&mut game, BONUS_HOLD_SECS);
            assert!(game.scene().is_bonus_popup_visible());
            assert!(game.activate(Target::BonusPopup));
        }
        events.extend(game.drain_events());
    }

    assert_eq!(totals, vec![0, 70, 70, 870, 870, 930]);
    assert_eq!(totals_changed(&events), vec![70, 870, 930]);
    assert_eq!(game.phase(), RoundPhase::Complete);
    assert_eq!(game.opened(), 6);

    let completions: Vec<&GameEvent> = events
        .iter()
        .filter(|e| matches!(e, GameEvent::RoundComplete { .. }))
        .collect();
    assert_eq!(completions, vec![&GameEvent::RoundComplete { total: 930 }]);
    assert_eq!(events.last(), Some(&GameEvent::RoundComplete { total: 930 }));

    let bonus_at = events
        .iter()
        .position(|e| *e == GameEvent::BonusTriggered { value: 800 })
        .expect("bonus triggered");
    let resolved_at = events
        .iter()
        .position(|e| *e == GameEvent::BonusResolved)
        .expect("bonus resolved");
    assert!(bonus_at < resolved_at);
}

#[test]
fn completion_waits_for_bonus_on_last_chest() {
    let mut game = started(2, [Reward::win(50), Reward::bonus(700)]);
    open(&mut game, 0);
    open(&mut game, 1);

    assert_eq!(game.opened(), 2);
    assert_eq!(game.phase(), RoundPhase::BonusInterrupt);
    run_secs(&mut game, BONUS_HOLD_SECS * 3.0);
    let events = game.drain_events();
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, GameEvent::RoundComplete { .. })),
        "completed before bonus resolved: {events:?}"
    );

    assert!(game.on_bonus_interrupt_resolved());
    assert_eq!(game.phase(), RoundPhase::Complete);
    assert_eq!(
        game.drain_events(),
        vec![
            GameEvent::TotalChanged { total: 750 },
            GameEvent::BonusResolved,
            GameEvent::RoundComplete { total: 750 },
        ]
    );
}

#[test]
fn pick_while_another_chest_opens_is_rejected() {
    let mut game = started(6, [Reward::win(70), Reward::win(80)]);
    assert!(game.activate(Target::Chest(ChestId(0))));
    assert!(!game.activate(Target::Chest(ChestId(0))));
    assert!(!game.activate(Target::Chest(ChestId(1))));

    run_secs(&mut game, REVEAL_SECS / 3.0);
    assert_eq!(game.phase(), RoundPhase::Revealing(ChestId(0)));
    assert!(!game.activate(Target::Chest(ChestId(1))));
    assert!(!game.hover(ChestId(1)));
    let other = game.chest(ChestId(1)).expect("chest 1");
    assert_eq!(other.state(), ChestState::Closed);
    assert_eq!(other.reward(), None);

    run_secs(&mut game, REVEAL_SECS);
    let reveals = game
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, GameEvent::ChestRevealed { .. }))
        .count();
    assert_eq!(reveals, 1);
    assert_eq!(game.total(), 70);
    assert!(game.chest(ChestId(1)).expect("chest 1").can_pick());
}

#[test]
fn bonus_interrupt_blocks_picks_until_resolved() {
    let mut game = started(3, [Reward::bonus(500), Reward::win(70)]);
    open(&mut game, 0);
    assert_eq!(game.phase(), RoundPhase::BonusInterrupt);
    assert!(game.bonus_pending());

    for _ in 0..10 {
        run_secs(&mut game, 1.0);
        assert!(!game.activate(Target::Chest(ChestId(1))));
        assert!(!game.hover(ChestId(1)));
        assert!(game.chests().iter().all(|c| !c.is_interactable()));
    }
    assert_eq!(game.phase(), RoundPhase::BonusInterrupt);

    assert!(game.activate(Target::BonusPopup));
    assert!(!game.activate(Target::BonusPopup));
    assert_eq!(game.phase(), RoundPhase::Active);
    assert!(game.activate(Target::Chest(ChestId(1))));
}

#[test]
fn bonus_popup_ignores_clicks_before_it_appears() {
    let mut game = started(3, [Reward::bonus(650)]);
    open(&mut game, 0);
    assert!(!game.activate(Target::BonusPopup));
    assert_eq!(game.phase(), RoundPhase::BonusInterrupt);
}

#[test]
fn reward_is_fixed_from_pick_through_reveal() {
    let mut game = started(2, [Reward::win(55), Reward::LOSE]);
    assert!(game.activate(Target::Chest(ChestId(0))));
    assert_eq!(
        game.chest(ChestId(0)).and_then(|c| c.reward()),
        Some(Reward::win(55))
    );
    run_secs(&mut game, REVEAL_SECS);
    let chest = game.chest(ChestId(0)).expect("chest 0");
    assert!(chest.is_opened());
    assert_eq!(chest.reward(), Some(Reward::win(55)));
}

#[test]
fn reset_round_restores_a_fresh_lobby() {
    let mut game = started(2, [Reward::win(50), Reward::LOSE]);
    assert!(!game.reset_round());

    open(&mut game, 0);
    open(&mut game, 1);
    assert_eq!(game.phase(), RoundPhase::Complete);
    assert!(game.scene().is_total_popup_visible());
    game.drain_events();

    assert!(game.activate(Target::TotalPopup));
    assert_eq!(game.phase(), RoundPhase::AwaitingStart);
    assert_eq!(game.total(), 0);
    assert_eq!(game.opened(), 0);
    assert!(!game.scene().is_total_popup_visible());
    for chest in game.chests() {
        assert_eq!(chest.state(), ChestState::Closed);
        assert!(!chest.is_interactable());
        assert_eq!(chest.reward(), None);
    }
    assert_eq!(
        game.drain_events(),
        vec![GameEvent::TotalChanged { total: 0 }, GameEvent::RoundReset]
    );
    assert!(!game.reset_round());

    run_secs(&mut game, BUTTON_RETURN_SECS);
    assert!(game.scene().is_play_button_ready());
    assert!(game.activate(Target::PlayButton));
    run_secs(&mut game, 2.0);
    assert_eq!(game.phase(), RoundPhase::Active);
}

#[test]
fn abort_mid_reveal_cancels_every_chest_animation() {
    let mut game = started(3, [Reward::bonus(900)]);
    assert!(game.activate(Target::Chest(ChestId(0))));
    run_secs(&mut game, 0.6);
    assert_eq!(
        game.chest(ChestId(0)).map(|c| c.state()),
        Some(ChestState::Opening)
    );

    game.abort_round();
    assert_eq!(game.phase(), RoundPhase::AwaitingStart);
    assert_eq!(game.chest(ChestId(0)).and_then(|c| c.reward()), None);
    assert!(game.chests().iter().all(|c| c.tracked_tweens() == 0));

    run_secs(&mut game, BUTTON_RETURN_SECS);
    let events = game.drain_events();
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, GameEvent::ChestRevealed { .. })),
        "reveal leaked through abort: {events:?}"
    );
    assert_eq!(game.chest(ChestId(0)).map(|c| c.state()), Some(ChestState::Closed));
    // Only the idle swing on the two hanging signs and the fog drift keep running.
    assert_eq!(game.active_tweens(), 3);
}

#[test]
fn abort_during_bonus_interrupt_clears_the_popup() {
    let mut game = started(3, [Reward::bonus(900)]);
    open(&mut game, 0);
    run_secs(&mut game, BONUS_HOLD_SECS);
    assert!(game.scene().is_bonus_popup_visible());

    game.abort_round();
    assert!(!game.scene().is_bonus_popup_visible());
    assert!(!game.bonus_pending());
    assert!(!game.on_bonus_interrupt_resolved());
    assert!(!game.scene().is_rock_rain_active());
    run_secs(&mut game, BUTTON_RETURN_SECS);
    assert_eq!(game.active_tweens(), 3);
}

/// Hands out a `Lose` that still carries a value, as a sloppy roller might.
struct ValuedLoses;

impl RewardRoller for ValuedLoses {
    fn roll(&mut self) -> Reward {
        serde_json::from_str(r#"{"kind":"Lose","value":40}"#).expect("deserialize reward")
    }
}

#[test]
fn lose_from_a_custom_roller_adds_nothing() {
    let mut game = ChestGame::new(GameSetup::new(settings_with(3), ValuedLoses));
    assert!(game.start_round());
    run_secs(&mut game, ACTIVATE_SECS);
    game.drain_events();

    open(&mut game, 0);
    assert_eq!(game.total(), 0);
    assert_eq!(game.chest(ChestId(0)).and_then(|c| c.reward()), Some(Reward::LOSE));
    let events = game.drain_events();
    assert!(totals_changed(&events).is_empty(), "total moved: {events:?}");
    assert!(events.contains(&GameEvent::ChestRevealed {
        chest: ChestId(0),
        reward: Reward::LOSE,
    }));
}

#[test]
fn seeded_rounds_total_what_was_revealed() {
    let chests = 6;
    let mut game = ChestGame::new(GameSetup::new(
        settings_with(chests),
        RandomRolls::seeded(2024),
    ));

    for round in 0..8 {
        assert!(game.start_round(), "round {round} refused to start");
        run_secs(&mut game, ACTIVATE_SECS);
        let mut events = game.drain_events();

        for id in 0..chests {
            open(&mut game, id);
            let opened = game.chests().iter().filter(|c| c.is_opened()).count();
            assert_eq!(game.opened(), opened, "round {round}, chest {id}");

            if game.phase() == RoundPhase::BonusInterrupt {
                run_secs(&mut game, BONUS_HOLD_SECS);
                assert!(game.activate(Target::BonusPopup));
            }
            events.extend(game.drain_events());
        }

        let revealed: u64 = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::ChestRevealed { reward, .. } => Some(u64::from(reward.payout())),
                _ => None,
            })
            .sum();
        let completed: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::RoundComplete { total } => Some(*total),
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec![revealed], "round {round}");
        assert_eq!(game.total(), revealed);

        assert!(game.activate(Target::TotalPopup));
        run_secs(&mut game, BUTTON_RETURN_SECS);
        game.drain_events();
    }
}

#[test]
fn scaled_frames_drive_the_round_and_clock_listeners() {
    let mut game = game_with(2, [Reward::win(60), Reward::win(70)]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    game.clock_mut()
        .add_listener(move |tick| sink.borrow_mut().push(tick.frame));

    assert!(game.start_round());
    let reference_frames = ((ACTIVATE_SECS + SLACK_SECS) * 60.0).ceil() as usize;
    for _ in 0..reference_frames / 2 {
        game.frame_scaled(2.0);
    }
    assert!(game.chests().iter().all(|c| c.can_pick()));
    assert!((game.clock().elapsed() - (reference_frames / 2) as f64 / 30.0).abs() < 1e-3);

    let ticks = seen.borrow().len();
    assert_eq!(ticks, reference_frames / 2);
    assert_eq!(seen.borrow().first(), Some(&1));
}

#[test]
fn oversized_chest_count_is_capped() {
    let game = game_with(usize::MAX, Vec::new());
    assert_eq!(game.chest_count(), MAX_CHESTS);
    assert_eq!(game.chests().len(), MAX_CHESTS);
}

#[test]
fn profiled_frames_report_to_the_profiler() {
    use chest_engine::profiling::{FrameTimings, Profiler};

    #[derive(Default)]
    struct Frames(Vec<u64>);
    impl Profiler for Frames {
        fn on_frame(&mut self, frame: u64, _timings: FrameTimings) {
            self.0.push(frame);
        }
    }

    let mut game = game_with(6, Vec::new());
    let mut frames = Frames::default();
    for _ in 0..3 {
        game.frame_profiled(Duration::from_secs_f32(FRAME), &mut frames);
    }
    assert_eq!(frames.0, vec![1, 2, 3]);
}
