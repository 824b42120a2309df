#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a round of Pounce in the terminal.

mod autoplay;
mod config;
mod save_file;
mod terminal;

use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use pounce_core::{Command, Event, Persistence, SoundRef, DEFAULT_PLAYER_NAME};
use pounce_session::{
    apply, query, resolve_player_name, Collaborators, Phase, Session, SessionConfig,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    autoplay::Autoplayer,
    config::FileConfig,
    save_file::TomlSaveFile,
    terminal::{Playfield, StdinPrompter, TerminalAudio, TerminalRenderer, TerminalScoreboard},
};

const BACKGROUND_MUSIC: &str = "audio/lofi.mp3";

/// Command-line arguments accepted by the Pounce binary.
#[derive(Debug, Parser)]
#[command(name = "pounce", about = "Click the cats, dodge the dogs.")]
struct CliArgs {
    /// Seed for entity placement and the autoplayer.
    #[arg(long)]
    seed: Option<u64>,
    /// Length of the round in seconds.
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
    round_secs: Option<i64>,
    /// File storing the best score, player name and credits.
    #[arg(long, default_value = "pounce-save.toml")]
    save_file: PathBuf,
    /// Optional TOML file with round and entity tuning.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Simulated frame length in milliseconds.
    #[arg(long)]
    frame_ms: Option<u64>,
    /// Chance per frame that the autoplayer clicks a hazard.
    #[arg(long)]
    clumsiness: Option<f64>,
    /// Player name; skips the name prompt.
    #[arg(long)]
    name: Option<String>,
    /// Sleep between frames so the round plays at wall-clock speed.
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = file_config.merged_with(&args)?;

    let mut save_file = TomlSaveFile::new(args.save_file.clone());
    let saved = save_file.load_session().unwrap_or_else(|error| {
        warn!(%error, "ignoring unreadable save file");
        Default::default()
    });
    let player_name = match &args.name {
        Some(name) => name_from_flag(name),
        None => resolve_player_name(&mut StdinPrompter::default(), saved.name.as_deref()),
    };
    println!("Welcome, {player_name}!");

    let playfield = Playfield::shared();
    let collaborators = Collaborators::new(
        Box::new(TerminalRenderer::new(playfield.clone())),
        Box::new(TerminalAudio),
        Box::new(TerminalScoreboard::default()),
        Box::new(save_file),
    )
    .on_round_complete(|summary| {
        println!("--- leaderboard ---");
        println!("{:>12} {:>6}", summary.player_name, summary.score);
    });

    let session_config = SessionConfig::new(player_name)
        .with_round_secs(settings.round_secs)
        .with_seed(settings.seed)
        .with_music(SoundRef::new(BACKGROUND_MUSIC));
    let mut session = Session::new(session_config, collaborators);
    pounce_system_roster::install(&mut session, &file_config.entities)
        .context("failed to install the entity lineup")?;

    let mut autoplayer = Autoplayer::new(settings.seed, settings.clumsiness);
    play_round(&mut session, &mut autoplayer, &playfield, &settings)
}

fn name_from_flag(name: &str) -> String {
    match name.trim() {
        "" => DEFAULT_PLAYER_NAME.to_owned(),
        trimmed => trimmed.to_owned(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn play_round(
    session: &mut Session,
    autoplayer: &mut Autoplayer,
    playfield: &terminal::SharedPlayfield,
    settings: &config::Settings,
) -> Result<()> {
    let frame = Duration::from_millis(settings.frame_ms);
    let mut events = Vec::new();
    apply(session, Command::StartRound, &mut events).context("failed to start the round")?;

    let started = Instant::now();
    let mut frames = 0_u64;
    while query::phase(session) == Phase::Running {
        let frame_started = Instant::now();
        apply(session, Command::Tick { dt: frame }, &mut events)?;

        let target = autoplayer.choose(&playfield.borrow());
        if let Some(visual) = target {
            apply(session, Command::Click { visual }, &mut events)
                .context("round aborted by a misconfigured entity")?;
        }

        for event in events.drain(..) {
            log_event(&event);
        }
        frames += 1;

        if settings.realtime {
            thread::sleep(frame.saturating_sub(frame_started.elapsed()));
        }
    }

    info!(
        frames,
        elapsed_ms = started.elapsed().as_millis() as u64,
        clock_ms = query::clock(session).as_millis() as u64,
        "round finished"
    );
    Ok(())
}

fn log_event(event: &Event) {
    match event {
        Event::EntitySpawned {
            class_tag,
            position,
            ..
        } => debug!(%class_tag, x = position.x, y = position.y, "spawned"),
        Event::EntityRemoved { class_tag, .. } => debug!(%class_tag, "removed"),
        Event::EntityResized {
            class_tag, size_px, ..
        } => debug!(%class_tag, size_px, "resized"),
        Event::EffectStarted { effect } => debug!(?effect, "effect started"),
        Event::EffectEnded { effect } => debug!(?effect, "effect ended"),
        Event::RoundAborted { class_tag } => warn!(%class_tag, "round aborted"),
        Event::RoundStarted { .. }
        | Event::ScoreChanged { .. }
        | Event::TimeChanged { .. }
        | Event::RoundEnded { .. } => {}
    }
}
