use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chest_game::audio::RodioCuePlayer;
use chest_game::chest::Chest;
use chest_game::orchestrator::{ChestGame, GameEvent, GameSetup, Target};
use chest_game::present::TraceLog;
use chest_game::reward::RandomRolls;
use chest_game::round::RoundPhase;
use chest_game::settings::SettingsStore;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Simulated seconds a single step of the demo may take before it gives up.
const STEP_TIMEOUT_SECS: f32 = 30.0;

#[derive(Debug, Parser)]
#[command(name = "chest-demo")]
#[command(about = "Plays pick-a-chest rounds headlessly and logs what happens")]
struct Cli {
    /// Seed for reward rolls; entropy when omitted.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 1)]
    rounds: u32,
    /// Directory of `<cue>.mp3` files; plays sound through the default device.
    #[arg(long)]
    audio: Option<PathBuf>,
    /// Write every game event as a JSON line.
    #[arg(long)]
    trace: Option<PathBuf>,
    /// Settings file; defaults to the per-user config location.
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(long, default_value_t = 60.0)]
    fps: f32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        bail!("--fps must be a positive number, got {}", cli.fps);
    }

    let store = match &cli.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::from_env(),
    };
    let settings = store.load();
    tracing::debug!(path = %store.path().display(), ?settings, "settings loaded");

    let rolls = match cli.seed {
        Some(seed) => RandomRolls::seeded(seed),
        None => RandomRolls::from_entropy(),
    };
    let mut setup = GameSetup::new(settings, rolls)
        .with_renderer(TraceLog)
        .with_cues(TraceLog)
        .with_shake_seed(cli.seed.unwrap_or_default());
    if let Some(dir) = &cli.audio {
        match RodioCuePlayer::new(dir) {
            Ok(player) => setup = setup.with_cues(player),
            Err(err) => tracing::warn!(%err, "audio disabled"),
        }
    }

    let trace = match &cli.trace {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };

    let mut demo = Demo {
        game: ChestGame::new(setup),
        step: Duration::from_secs_f32(1.0 / cli.fps),
        trace,
    };
    demo.game.activate(Target::StartOverlay);

    for round in 1..=cli.rounds {
        let total = demo.play_round()?;
        println!("round {round}: total {total}$");
    }

    if let Some(out) = demo.trace.as_mut() {
        out.flush().context("flushing trace")?;
    }
    Ok(())
}

struct Demo {
    game: ChestGame,
    step: Duration,
    trace: Option<BufWriter<File>>,
}

impl Demo {
    fn play_round(&mut self) -> Result<u64> {
        self.run_until("play button", |g| g.scene().is_play_button_ready())?;
        self.game.hover_play_button();
        self.game.activate(Target::PlayButton);
        self.run_until("chests awake", |g| g.chests().iter().all(Chest::can_pick))?;

        loop {
            match self.game.phase() {
                RoundPhase::Active => {
                    let Some(id) = self.game.chests().iter().find(|c| c.can_pick()).map(Chest::id)
                    else {
                        self.frame()?;
                        continue;
                    };
                    self.game.hover(id);
                    self.game.activate(Target::Chest(id));
                }
                RoundPhase::Revealing(_) => {
                    self.run_until("reveal", |g| !matches!(g.phase(), RoundPhase::Revealing(_)))?;
                }
                RoundPhase::BonusInterrupt => {
                    self.run_until("bonus popup", |g| g.scene().is_bonus_popup_visible())?;
                    self.game.activate(Target::BonusPopup);
                }
                RoundPhase::Complete => {
                    let total = self.game.total();
                    self.game.activate(Target::TotalPopup);
                    self.drain()?;
                    return Ok(total);
                }
                RoundPhase::AwaitingStart => bail!("round fell back to the lobby"),
            }
            self.drain()?;
        }
    }

    fn run_until(&mut self, what: &str, done: impl Fn(&ChestGame) -> bool) -> Result<()> {
        let limit = (STEP_TIMEOUT_SECS / self.step.as_secs_f32()).ceil() as u64;
        for _ in 0..limit {
            if done(&self.game) {
                return Ok(());
            }
            self.frame()?;
        }
        bail!("timed out waiting for {what}")
    }

    fn frame(&mut self) -> Result<()> {
        self.game.frame(self.step);
        self.drain()
    }

    fn drain(&mut self) -> Result<()> {
        for event in self.game.drain_events() {
            log_event(&event);
            if let Some(out) = self.trace.as_mut() {
                serde_json::to_writer(&mut *out, &event).context("writing trace")?;
                writeln!(out).context("writing trace")?;
            }
        }
        Ok(())
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::ChestRevealed { chest, reward } => {
            tracing::info!(%chest, kind = ?reward.kind(), value = reward.value(), "revealed")
        }
        GameEvent::RoundComplete { total } => tracing::info!(total, "round complete"),
        other => tracing::debug!(event = ?other, "game event"),
    }
}
