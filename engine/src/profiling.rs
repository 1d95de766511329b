use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTimings {
    /// Clock pump, including every clock listener.
    pub clock: Duration,
    /// One scheduler pass over all tweens and effects.
    pub tweens: Duration,
    /// Game-side handling of whatever the tweens produced.
    pub dispatch: Duration,
    pub total: Duration,
}

/// Optional hook interface for capturing per-frame timings.
///
/// Kept free of game types so headless drivers and tests can share it.
pub trait Profiler {
    fn on_frame(&mut self, _frame: u64, _timings: FrameTimings) {}
}
