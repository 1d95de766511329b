pub mod clock;
pub mod color;
pub mod profiling;
pub mod tween;

pub use clock::{FrameClock, FrameTick, ListenerId};
pub use color::Rgb;
pub use tween::{TweenHandle, TweenScheduler, TweenSet, lerp};
