use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Host frame rate that `tick_frames` deltas are expressed against.
pub const DEFAULT_REFERENCE_FPS: f32 = 60.0;

/// One pump of the clock, as seen by listeners and the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameTick {
    pub frame: u64,
    /// Seconds since the previous tick.
    pub delta: f32,
    /// Seconds since the clock was created.
    pub elapsed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&FrameTick)>;

/// Process-wide frame clock.
///
/// The render loop pumps it once per presented frame. It never resets; elapsed
/// time and the frame counter only grow.
pub struct FrameClock {
    reference_fps: f32,
    frame: u64,
    elapsed: f64,
    next_listener: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl std::fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameClock")
            .field("reference_fps", &self.reference_fps)
            .field("frame", &self.frame)
            .field("elapsed", &self.elapsed)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_FPS)
    }
}

impl FrameClock {
    pub fn new(reference_fps: f32) -> Self {
        let reference_fps = if reference_fps.is_finite() && reference_fps > 0.0 {
            reference_fps
        } else {
            DEFAULT_REFERENCE_FPS
        };
        Self {
            reference_fps,
            frame: 0,
            elapsed: 0.0,
            next_listener: 0,
            listeners: Vec::new(),
        }
    }

    pub fn reference_fps(&self) -> f32 {
        self.reference_fps
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&FrameTick) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unsubscribes a listener. Unknown ids are ignored and report `false`.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        before != self.listeners.len()
    }

    pub fn tick(&mut self, delta: Duration) -> FrameTick {
        self.advance(delta.as_secs_f32())
    }

    /// Advances by a host delta measured in reference-rate frames
    /// (`1.0` == one frame at `reference_fps`).
    pub fn tick_frames(&mut self, delta_frames: f32) -> FrameTick {
        self.advance(delta_frames / self.reference_fps)
    }

    fn advance(&mut self, seconds: f32) -> FrameTick {
        let delta = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.frame = self.frame.saturating_add(1);
        self.elapsed += delta as f64;

        let tick = FrameTick {
            frame: self.frame,
            delta,
            elapsed: self.elapsed,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&tick);
        }
        tick
    }
}
