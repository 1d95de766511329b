use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sfx::Cue;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AudioSettings {
    pub master_volume: f32,
    pub music_volume: f32,
    pub sfx_volume: f32,
    pub mute_all: bool,
    pub music_enabled: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            music_volume: 1.0,
            sfx_volume: 1.0,
            mute_all: false,
            music_enabled: true,
        }
    }
}

impl AudioSettings {
    pub fn clamp(mut self) -> Self {
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.music_volume = self.music_volume.clamp(0.0, 1.0);
        self.sfx_volume = self.sfx_volume.clamp(0.0, 1.0);
        self
    }

    pub fn effective_music_gain(self) -> f32 {
        if self.mute_all || !self.music_enabled {
            0.0
        } else {
            self.master_volume * self.music_volume
        }
    }

    pub fn effective_sfx_gain(self) -> f32 {
        if self.mute_all {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Gain for a cue, picking the music or sfx bus by cue kind.
    pub fn gain_for(self, cue: Cue) -> f32 {
        if cue.is_music() {
            self.effective_music_gain()
        } else {
            self.effective_sfx_gain()
        }
    }
}

/// Largest grid a settings file may ask for.
pub const MAX_CHESTS: usize = 12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GameplaySettings {
    pub chest_count: usize,
    pub columns: usize,
    /// Frame rate that one host "frame" of delta is normalized against.
    pub reference_fps: f32,
}

impl Default for GameplaySettings {
    fn default() -> Self {
        Self {
            chest_count: 6,
            columns: 3,
            reference_fps: chest_engine::clock::DEFAULT_REFERENCE_FPS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoSettings {
    pub screen_shake_percent: u8,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            screen_shake_percent: 100,
        }
    }
}

impl VideoSettings {
    pub fn shake_strength(self) -> f32 {
        f32::from(self.screen_shake_percent.min(100)) / 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSettings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub gameplay: GameplaySettings,
    #[serde(default)]
    pub video: VideoSettings,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            audio: AudioSettings::default(),
            gameplay: GameplaySettings::default(),
            video: VideoSettings::default(),
        }
    }
}

impl PlayerSettings {
    pub fn sanitized(mut self) -> Self {
        let defaults = GameplaySettings::default();
        self.version = default_version();
        self.audio = self.audio.clamp();
        self.video.screen_shake_percent = self.video.screen_shake_percent.min(100);
        let gameplay = &mut self.gameplay;
        if gameplay.chest_count == 0 {
            gameplay.chest_count = defaults.chest_count;
        }
        gameplay.chest_count = gameplay.chest_count.min(MAX_CHESTS);
        if gameplay.columns == 0 {
            gameplay.columns = defaults.columns;
        }
        gameplay.columns = gameplay.columns.clamp(1, gameplay.chest_count);
        if !(self.gameplay.reference_fps.is_finite() && self.gameplay.reference_fps > 0.0) {
            self.gameplay.reference_fps = defaults.reference_fps;
        }
        self
    }
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("CHEST_GAME_SETTINGS_PATH") {
            return Self::new(explicit);
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("chest-game");
        path.push("settings.json");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing or unreadable file yields defaults.
    pub fn load(&self) -> PlayerSettings {
        let Ok(bytes) = fs::read(&self.path) else {
            return PlayerSettings::default();
        };
        match serde_json::from_slice::<PlayerSettings>(&bytes) {
            Ok(settings) => settings.sanitized(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "ignoring corrupt settings");
                PlayerSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &PlayerSettings) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let text = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, text).map_err(io_err)
    }
}
