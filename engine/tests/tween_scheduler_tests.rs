use std::cell::Cell;
use std::rc::Rc;

use chest_engine::clock::FrameClock;
use chest_engine::tween::{TweenHandle, TweenScheduler};

#[derive(Default)]
struct World {
    calls: Vec<(&'static str, f32)>,
    pending: Option<TweenHandle>,
}

#[test]
fn zero_duration_completes_within_the_first_tick() {
    let mut sched = TweenScheduler::<World>::new();
    let mut world = World::default();
    sched.start_with(
        0.0,
        |w: &mut World, _, p| w.calls.push(("update", p)),
        |w: &mut World, _| w.calls.push(("done", 1.0)),
    );

    sched.advance(&mut world, 1.0 / 60.0);
    assert_eq!(world.calls, vec![("update", 1.0), ("done", 1.0)]);

    sched.advance(&mut world, 1.0 / 60.0);
    assert_eq!(world.calls.len(), 2);
    assert!(sched.is_empty());
}

#[test]
fn progress_is_monotonic_and_final_value_is_exact() {
    let mut sched = TweenScheduler::<World>::new();
    let mut world = World::default();
    sched.start(1.5, |w: &mut World, _, p| w.calls.push(("update", p)));

    let mut clock = FrameClock::new(60.0);
    for _ in 0..200 {
        let tick = clock.tick_frames(1.0);
        sched.advance(&mut world, tick.delta);
    }

    let progress: Vec<f32> = world.calls.iter().map(|(_, p)| *p).collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.iter().filter(|p| **p == 1.0).count(), 1);
    assert_eq!(*progress.last().unwrap(), 1.0);
    assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn registrations_made_during_a_pass_start_next_tick() {
    let mut sched = TweenScheduler::<World>::new();
    let mut world = World::default();
    sched.start_with(
        0.0,
        |_, _, _| {},
        |_, sched: &mut TweenScheduler<World>| {
            sched.start(1.0, |w: &mut World, _, p| w.calls.push(("chained", p)));
        },
    );

    sched.advance(&mut world, 0.25);
    assert!(world.calls.is_empty(), "chained tween must not run in the spawning pass");
    assert_eq!(sched.len(), 1);

    sched.advance(&mut world, 0.25);
    assert_eq!(world.calls, vec![("chained", 0.25)]);
}

#[test]
fn cancelling_from_inside_own_update_stops_it_before_next_tick() {
    let mut sched = TweenScheduler::<World>::new();
    let mut world = World::default();
    let handle = sched.start_continuous(|w: &mut World, sched: &mut TweenScheduler<World>, t| {
        w.calls.push(("tick", t));
        if let Some(me) = w.pending.take() {
            sched.cancel(me);
        }
    });
    world.pending = Some(handle);

    sched.advance(&mut world, 0.1);
    sched.advance(&mut world, 0.1);
    assert_eq!(world.calls.len(), 1);
    assert!(!sched.is_active(handle));
}

#[test]
fn cancelling_from_on_complete_is_harmless() {
    let mut sched = TweenScheduler::<World>::new();
    let mut world = World::default();
    let handle = sched.start_with(
        0.1,
        |_, _, _| {},
        |w: &mut World, sched: &mut TweenScheduler<World>| {
            if let Some(me) = w.pending.take() {
                sched.cancel(me);
            }
            w.calls.push(("done", 1.0));
        },
    );
    world.pending = Some(handle);

    sched.advance(&mut world, 1.0);
    sched.advance(&mut world, 1.0);
    assert_eq!(world.calls, vec![("done", 1.0)]);
    assert!(sched.is_empty());
}

#[test]
fn cancelling_on_the_final_update_skips_on_complete() {
    let mut sched = TweenScheduler::<World>::new();
    let mut world = World::default();
    let handle = sched.start_with(
        0.5,
        |w: &mut World, sched: &mut TweenScheduler<World>, p| {
            w.calls.push(("update", p));
            if p >= 1.0 {
                if let Some(me) = w.pending.take() {
                    sched.cancel(me);
                }
            }
        },
        |w: &mut World, _| w.calls.push(("done", 1.0)),
    );
    world.pending = Some(handle);

    sched.advance(&mut world, 0.25);
    sched.advance(&mut world, 0.25);
    sched.advance(&mut world, 0.25);
    assert_eq!(world.calls, vec![("update", 0.5), ("update", 1.0)]);
    assert!(sched.is_empty());
}

#[test]
fn entry_cancelled_earlier_in_the_pass_never_completes() {
    let mut sched = TweenScheduler::<World>::new();
    let mut world = World::default();
    sched.start_continuous(|w: &mut World, sched: &mut TweenScheduler<World>, _| {
        if let Some(other) = w.pending.take() {
            sched.cancel(other);
        }
    });
    let finishing = sched.start_with(
        0.1,
        |_, _, _| {},
        |w: &mut World, _| w.calls.push(("done", 1.0)),
    );
    world.pending = Some(finishing);

    sched.advance(&mut world, 1.0);
    assert!(world.calls.is_empty());
    assert_eq!(sched.len(), 1);
}

#[test]
fn cancel_is_idempotent_and_ignores_finished_handles() {
    let mut sched = TweenScheduler::<World>::new();
    let mut world = World::default();
    let quick = sched.start(0.0, |_, _, _| {});
    let slow = sched.start(10.0, |_, _, _| {});

    sched.advance(&mut world, 0.1);
    assert!(!sched.cancel(quick));
    assert!(sched.cancel(slow));
    assert!(!sched.cancel(slow));
    assert!(sched.is_empty());
}

#[test]
fn snapshot_pass_still_runs_entries_cancelled_mid_pass() {
    let mut sched = TweenScheduler::<World>::new();
    let mut world = World::default();
    let ran_second = Rc::new(Cell::new(0));

    sched.start_continuous(|w: &mut World, sched: &mut TweenScheduler<World>, _| {
        if let Some(other) = w.pending.take() {
            sched.cancel(other);
        }
    });
    let counter = Rc::clone(&ran_second);
    let second = sched.start_continuous(move |_, _, _| counter.set(counter.get() + 1));
    world.pending = Some(second);

    sched.advance(&mut world, 0.1);
    assert_eq!(ran_second.get(), 1);
    sched.advance(&mut world, 0.1);
    assert_eq!(ran_second.get(), 1);
    assert_eq!(sched.len(), 1);
}

#[test]
fn delay_fires_once_after_its_duration() {
    let mut sched = TweenScheduler::<World>::new();
    let mut world = World::default();
    sched.delay(0.5, |w: &mut World, _| w.calls.push(("delay", 1.0)));

    sched.advance(&mut world, 0.2);
    sched.advance(&mut world, 0.2);
    assert!(world.calls.is_empty());
    sched.advance(&mut world, 0.2);
    sched.advance(&mut world, 0.2);
    assert_eq!(world.calls, vec![("delay", 1.0)]);
}
