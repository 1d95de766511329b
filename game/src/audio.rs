use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use thiserror::Error;

use crate::present::CuePlayer;
use crate::settings::AudioSettings;
use crate::sfx::{Cue, CueOptions};

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device: {0}")]
    Device(#[from] rodio::StreamError),
    #[error("cannot create sink: {0}")]
    Sink(#[from] rodio::PlayError),
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },
}

/// `<dir>/<cue-name>.mp3`
pub fn cue_path(dir: &Path, cue: Cue) -> PathBuf {
    dir.join(format!("{}.mp3", cue.name()))
}

/// Plays cues from mp3 files on the default output device.
///
/// Failures never reach the game; they are logged and the cue is skipped.
pub struct RodioCuePlayer {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    dir: PathBuf,
    sinks: HashMap<Cue, Vec<Sink>>,
}

impl RodioCuePlayer {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
            dir: dir.into(),
            sinks: HashMap::new(),
        })
    }

    fn try_play(&mut self, cue: Cue, options: CueOptions) -> Result<(), AudioError> {
        let path = cue_path(&self.dir, cue);
        let file = File::open(&path).map_err(|source| AudioError::Open {
            path: path.clone(),
            source,
        })?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|source| AudioError::Decode { path, source })?;

        let sink = Sink::try_new(&self.handle)?;
        sink.set_volume(options.volume);
        if options.looped {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }

        let sinks = self.sinks.entry(cue).or_default();
        sinks.retain(|s| !s.empty());
        sinks.push(sink);
        Ok(())
    }
}

impl CuePlayer for RodioCuePlayer {
    fn play_cue(&mut self, cue: Cue, options: CueOptions) {
        if let Err(err) = self.try_play(cue, options) {
            tracing::warn!(cue = cue.name(), %err, "cue skipped");
        }
    }

    fn stop_cue(&mut self, cue: Cue) {
        if let Some(sinks) = self.sinks.remove(&cue) {
            for sink in sinks {
                sink.stop();
            }
        }
    }
}

/// Applies the player's volume settings before handing cues on.
#[derive(Debug, Clone)]
pub struct MixedCues<P> {
    inner: P,
    audio: AudioSettings,
}

impl<P: CuePlayer> MixedCues<P> {
    pub fn new(inner: P, audio: AudioSettings) -> Self {
        Self {
            inner,
            audio: audio.clamp(),
        }
    }
}

impl<P: CuePlayer> CuePlayer for MixedCues<P> {
    fn play_cue(&mut self, cue: Cue, options: CueOptions) {
        let gain = self.audio.gain_for(cue);
        if gain <= 0.0 {
            tracing::trace!(cue = cue.name(), "cue muted");
            return;
        }
        self.inner.play_cue(
            cue,
            CueOptions {
                volume: options.volume * gain,
                ..options
            },
        );
    }

    fn stop_cue(&mut self, cue: Cue) {
        self.inner.stop_cue(cue);
    }
}
