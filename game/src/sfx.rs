use serde::{Deserialize, Serialize};

/// Symbolic audio cues. The audio backend maps each name to an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cue {
    Fog,
    Hover,
    Wood,
    BgMusic,
    Open,
    Click,
    Win,
    Bonus,
    Rocks,
    Earthquake,
    Clapping,
}

impl Cue {
    pub const ALL: [Cue; 11] = [
        Cue::Fog,
        Cue::Hover,
        Cue::Wood,
        Cue::BgMusic,
        Cue::Open,
        Cue::Click,
        Cue::Win,
        Cue::Bonus,
        Cue::Rocks,
        Cue::Earthquake,
        Cue::Clapping,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Cue::Fog => "fog",
            Cue::Hover => "hover",
            Cue::Wood => "wood",
            Cue::BgMusic => "bg-music",
            Cue::Open => "open",
            Cue::Click => "click",
            Cue::Win => "win",
            Cue::Bonus => "bonus",
            Cue::Rocks => "rocks",
            Cue::Earthquake => "earthquake",
            Cue::Clapping => "clapping",
        }
    }

    /// Whether the cue is music/ambience rather than a one-shot.
    pub fn is_music(self) -> bool {
        matches!(self, Cue::Fog | Cue::BgMusic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CueOptions {
    pub looped: bool,
    /// 0.0..=1.0, before player settings are applied.
    pub volume: f32,
}

impl CueOptions {
    pub const fn once(volume: f32) -> Self {
        Self {
            looped: false,
            volume,
        }
    }

    pub const fn looped(volume: f32) -> Self {
        Self {
            looped: true,
            volume,
        }
    }
}

/// Shared volume constants (0.0..=1.0).
pub const HOVER_VOLUME: f32 = 0.05;
pub const CLICK_VOLUME: f32 = 0.1;
pub const OPEN_VOLUME: f32 = 0.1;
pub const WIN_VOLUME: f32 = 0.1;
pub const BONUS_VOLUME: f32 = 0.1;
pub const EARTHQUAKE_VOLUME: f32 = 0.1;
pub const ROCKS_VOLUME: f32 = 0.05;
pub const CLAPPING_VOLUME: f32 = 0.05;
pub const WOOD_VOLUME: f32 = 0.2;

/// Background music sits under every gameplay cue.
pub const MUSIC_VOLUME: f32 = 0.07;
pub const FOG_VOLUME: f32 = 0.1;
/// Ambience comes back louder between rounds.
pub const FOG_IDLE_VOLUME: f32 = 0.2;
