pub mod audio;
pub mod chest;
pub mod orchestrator;
pub mod present;
pub mod reward;
pub mod round;
pub mod scene;
pub mod settings;
pub mod sfx;

pub use orchestrator::{ChestGame, GameEvent, GameSetup, Target};
