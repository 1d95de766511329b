use std::collections::HashSet;

/// Opaque registration handle returned by the scheduler.
///
/// Handles are never reused, so cancelling a stale handle can't hit a newer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenHandle(u64);

/// Per-tick callback. Timed entries receive their progress in `[0, 1]`,
/// continuous entries receive their own elapsed seconds.
pub type UpdateFn<W> = Box<dyn FnMut(&mut W, &mut TweenScheduler<W>, f32)>;
pub type CompleteFn<W> = Box<dyn FnOnce(&mut W, &mut TweenScheduler<W>)>;

enum Motion<W> {
    Timed {
        duration: f32,
        update: UpdateFn<W>,
        on_complete: Option<CompleteFn<W>>,
    },
    Continuous {
        update: UpdateFn<W>,
    },
}

struct Entry<W> {
    handle: TweenHandle,
    elapsed: f32,
    progress: f32,
    motion: Motion<W>,
}

impl<W> Entry<W> {
    /// Returns `true` once the entry has run its final update.
    fn step(&mut self, world: &mut W, sched: &mut TweenScheduler<W>, dt: f32) -> bool {
        self.elapsed += dt;
        match &mut self.motion {
            Motion::Continuous { update } => {
                update(world, sched, self.elapsed);
                false
            }
            Motion::Timed {
                duration,
                update,
                on_complete,
            } => {
                self.progress = progress_for(self.elapsed, *duration).max(self.progress);
                update(world, sched, self.progress);
                if self.progress < 1.0 {
                    return false;
                }
                // Cancelled during this pass, possibly by its own update.
                if !sched.is_active(self.handle) {
                    return true;
                }
                if let Some(done) = on_complete.take() {
                    done(world, sched);
                }
                true
            }
        }
    }
}

/// `clamp(elapsed / duration, 0, 1)`; non-positive durations finish immediately.
pub fn progress_for(elapsed: f32, duration: f32) -> f32 {
    if !(duration > 0.0) {
        return 1.0;
    }
    (elapsed / duration).clamp(0.0, 1.0)
}

pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Owns every active tween and continuous effect for a world `W`.
///
/// Callbacks get mutable access to the world and to the scheduler itself. Each
/// `advance` walks a snapshot of the entries that were active when the tick
/// began: entries started from inside a callback first run on the next tick,
/// and entries cancelled from inside a callback are dropped at the end of the
/// current pass.
pub struct TweenScheduler<W> {
    entries: Vec<Entry<W>>,
    live: HashSet<TweenHandle>,
    cancelled_in_pass: Vec<TweenHandle>,
    in_pass: bool,
    next_handle: u64,
}

impl<W> std::fmt::Debug for TweenScheduler<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweenScheduler")
            .field("live", &self.live.len())
            .field("in_pass", &self.in_pass)
            .field("next_handle", &self.next_handle)
            .finish()
    }
}

impl<W> Default for TweenScheduler<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> TweenScheduler<W> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            live: HashSet::new(),
            cancelled_in_pass: Vec::new(),
            in_pass: false,
            next_handle: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn is_active(&self, handle: TweenHandle) -> bool {
        self.live.contains(&handle)
    }

    pub fn start(
        &mut self,
        duration: f32,
        update: impl FnMut(&mut W, &mut TweenScheduler<W>, f32) + 'static,
    ) -> TweenHandle {
        self.register(Motion::Timed {
            duration,
            update: Box::new(update),
            on_complete: None,
        })
    }

    /// Like [`start`](Self::start); `on_complete` runs right after the final
    /// `update(1.0)` in the same tick, unless the entry was cancelled first.
    pub fn start_with(
        &mut self,
        duration: f32,
        update: impl FnMut(&mut W, &mut TweenScheduler<W>, f32) + 'static,
        on_complete: impl FnOnce(&mut W, &mut TweenScheduler<W>) + 'static,
    ) -> TweenHandle {
        self.register(Motion::Timed {
            duration,
            update: Box::new(update),
            on_complete: Some(Box::new(on_complete)),
        })
    }

    /// A tween with no visual effect, used purely to sequence work on the frame clock.
    pub fn delay(
        &mut self,
        duration: f32,
        on_complete: impl FnOnce(&mut W, &mut TweenScheduler<W>) + 'static,
    ) -> TweenHandle {
        self.start_with(duration, |_, _, _| {}, on_complete)
    }

    pub fn start_continuous(
        &mut self,
        update: impl FnMut(&mut W, &mut TweenScheduler<W>, f32) + 'static,
    ) -> TweenHandle {
        self.register(Motion::Continuous {
            update: Box::new(update),
        })
    }

    /// Removes a registration. Stale, unknown and already-finished handles are ignored.
    pub fn cancel(&mut self, handle: TweenHandle) -> bool {
        if !self.live.remove(&handle) {
            tracing::trace!(?handle, "cancel ignored; handle not active");
            return false;
        }
        if let Some(pos) = self.entries.iter().position(|e| e.handle == handle) {
            self.entries.remove(pos);
        } else if self.in_pass {
            // Part of the snapshot currently being walked.
            self.cancelled_in_pass.push(handle);
        }
        true
    }

    pub fn cancel_all(&mut self) {
        if self.in_pass {
            let pending: Vec<TweenHandle> = self.live.iter().copied().collect();
            for handle in pending {
                self.cancel(handle);
            }
        } else {
            self.entries.clear();
            self.live.clear();
        }
    }

    /// Runs one tick of every entry that was active when the call began.
    pub fn advance(&mut self, world: &mut W, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut snapshot = std::mem::take(&mut self.entries);
        self.in_pass = true;

        let mut finished = Vec::new();
        for entry in snapshot.iter_mut() {
            if entry.step(world, self, dt) {
                finished.push(entry.handle);
            }
        }

        self.in_pass = false;
        let cancelled = std::mem::take(&mut self.cancelled_in_pass);
        for handle in &finished {
            self.live.remove(handle);
        }
        snapshot.retain(|e| !finished.contains(&e.handle) && !cancelled.contains(&e.handle));

        let spawned = std::mem::take(&mut self.entries);
        snapshot.extend(spawned);
        self.entries = snapshot;
    }

    fn register(&mut self, motion: Motion<W>) -> TweenHandle {
        let handle = TweenHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push(Entry {
            handle,
            elapsed: 0.0,
            progress: 0.0,
            motion,
        });
        self.live.insert(handle);
        handle
    }
}

/// Handles owned by one entity, released together when it resets.
#[derive(Debug, Clone, Default)]
pub struct TweenSet {
    handles: Vec<TweenHandle>,
}

impl TweenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, handle: TweenHandle) -> TweenHandle {
        self.handles.push(handle);
        handle
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancels everything tracked and returns how many were still running.
    pub fn cancel_all<W>(&mut self, sched: &mut TweenScheduler<W>) -> usize {
        self.handles
            .drain(..)
            .filter(|handle| sched.cancel(*handle))
            .count()
    }
}
