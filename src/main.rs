//! Headless player and thread bootstrapper.

use clap::{Parser, Subcommand};
use lanebeat::database::{ChartStore, SqliteChartStore};
use lanebeat::error::ChartError;
use lanebeat::input::{self, keymap::KeyMap};
use lanebeat::logic::audio::{AudioManager, AudioSpectrumCapture, PlaybackClock, WallClock};
use lanebeat::logic::audio_thread::start_audio_thread;
use lanebeat::logic::generator::{ChartGenerator, ChartJob, TrackRequest};
use lanebeat::logic::spectrum::{SpectrumAdapter, SpectrumCapture};
use lanebeat::logic::{self, LogicLoop};
use lanebeat::models::catalog::Catalog;
use lanebeat::models::settings::{DEFAULT_CONFIG_PATH, EngineConfig};
use lanebeat::state::{PlaySession, RunResult};
use lanebeat::system::bus::{PlaybackEvent, SystemBus};
use std::error::Error;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long to wait for the audio thread to open a track.
const AUDIO_LOAD_TIMEOUT: Duration = Duration::from_secs(5);
/// Interval of the HUD line.
const HUD_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "lanebeat", version, about = "Five-lane rhythm game for downloaded tracks")]
struct Cli {
    /// Config file, created with defaults when missing.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List catalog tracks with their best scores.
    List,
    /// Generate and cache the chart of a track.
    Generate {
        track_id: String,
        #[arg(long)]
        bpm: f64,
    },
    /// Play a track in the terminal. Type lane keys and press enter.
    Play {
        track_id: String,
        /// Needed when the chart is not cached yet.
        #[arg(long)]
        bpm: Option<f64>,
        /// Judge against a wall clock instead of the audio device.
        #[arg(long)]
        silent: bool,
    },
    /// Show global unlocks.
    Unlocks,
}

fn main() {
    if std::env::var_os("RUST_LOG").is_none() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("MAIN: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = EngineConfig::load(&cli.config);
    let store: Arc<dyn ChartStore> = Arc::new(SqliteChartStore::open(&config.database_path)?);

    match cli.command {
        Command::List => list(&config, store.as_ref()),
        Command::Generate { track_id, bpm } => {
            let chart = load_chart(&config, store, &track_id, Some(bpm))?;
            println!(
                "{} - {}: {} notes ({} bonus), {:.0} BPM",
                chart.artist_name,
                chart.track_name,
                chart.notes.len(),
                chart.bonus_note_count(),
                chart.bpm
            );
            Ok(())
        }
        Command::Play {
            track_id,
            bpm,
            silent,
        } => play(&config, store, &track_id, bpm, silent),
        Command::Unlocks => {
            let unlocks = store.load_unlocks();
            println!(
                "Legendary: {}",
                if unlocks.legendary_unlocked { "unlocked" } else { "locked" }
            );
            Ok(())
        }
    }
}

fn list(config: &EngineConfig, store: &dyn ChartStore) -> Result<(), Box<dyn Error>> {
    let catalog = Catalog::load(&config.catalog_path)?;
    let scores = store.high_scores();
    for track in &catalog.tracks {
        let best = scores
            .iter()
            .find(|(id, _)| *id == track.track_id)
            .map(|(_, score)| score.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<32} {:<24} {:>4}s  best {}",
            track.track_id,
            track.name,
            track.artist,
            track.duration_ms / 1000,
            best
        );
    }
    Ok(())
}

/// Cached chart, or a fresh one when `bpm` is known.
fn load_chart(
    config: &EngineConfig,
    store: Arc<dyn ChartStore>,
    track_id: &str,
    bpm: Option<f64>,
) -> Result<lanebeat::ChartData, Box<dyn Error>> {
    if let Some(chart) = store.get(track_id) {
        return Ok(chart);
    }
    let Some(bpm) = bpm else {
        return Err(format!("no cached chart for {track_id}, pass --bpm to generate one").into());
    };

    let catalog = Catalog::load(&config.catalog_path)?;
    let request = TrackRequest::from_entry(catalog.find(track_id)?, bpm);
    let job = ChartJob::spawn(ChartGenerator::from_config(config), request, store);
    log::info!("MAIN: Waiting for the chart of {}", job.track_id());
    Ok(job.wait()?)
}

fn play(
    config: &EngineConfig,
    store: Arc<dyn ChartStore>,
    track_id: &str,
    bpm: Option<f64>,
    silent: bool,
) -> Result<(), Box<dyn Error>> {
    let mut session = PlaySession::new();
    session.begin_analysis();
    let chart = match load_chart(config, store.clone(), track_id, bpm) {
        Ok(chart) => chart,
        Err(e) => {
            if let Some(chart_error) = e.downcast_ref::<ChartError>() {
                session.analysis_failed(chart_error);
            }
            return Err(e);
        }
    };
    session.load_chart(chart);

    let bus = SystemBus::new();
    let audio_handle = start_audio_thread(bus.clone());
    let audio = AudioManager::new(&bus);
    audio.set_volume(config.master_volume);

    let mut spectrum_rx = None;
    let clock: Box<dyn PlaybackClock> = if silent {
        Box::new(WallClock::new())
    } else {
        let catalog = Catalog::load(&config.catalog_path)?;
        audio.load_music(&catalog.find(track_id)?.local_audio_path);
        match bus.playback_rx.recv_timeout(AUDIO_LOAD_TIMEOUT) {
            Ok(PlaybackEvent::DurationKnown { duration_ms }) => {
                if duration_ms > 0 {
                    bus.playback_tx
                        .send(PlaybackEvent::DurationKnown { duration_ms })?;
                }
                spectrum_rx = Some(AudioSpectrumCapture::new(&bus).start_capture());
                Box::new(audio.clone())
            }
            Ok(_) | Err(_) => {
                log::warn!("MAIN: Audio unavailable, judging against the wall clock");
                Box::new(WallClock::new())
            }
        }
    };

    let _input = input::start_thread(bus.clone(), KeyMap::new(&config.keys), BufReader::new(io::stdin()));
    let _hud = start_hud(bus.clone());

    let mut logic = LogicLoop::new(
        bus.clone(),
        session,
        clock,
        SpectrumAdapter::new(config.spectrum),
        store,
        config.tick_rate_hz,
    );
    if let Some(rx) = spectrum_rx {
        logic = logic.with_spectrum(rx);
    }
    let result = logic::start_thread(logic).join();

    audio.shutdown();
    let _ = audio_handle.join();

    match result {
        Ok(Some(result)) => {
            print_result(&result);
            Ok(())
        }
        Ok(None) => Err("the session could not start".into()),
        Err(_) => Err("logic thread panicked".into()),
    }
}

/// Prints one HUD line per interval while snapshots arrive.
fn start_hud(bus: SystemBus) -> thread::JoinHandle<()> {
    let rx = bus.snapshot_rx.clone();
    drop(bus);
    thread::Builder::new()
        .name("HUD Thread".to_string())
        .spawn(move || {
            let mut last_print = None;
            while let Ok(snapshot) = rx.recv() {
                if last_print.is_none_or(|t: std::time::Instant| t.elapsed() >= HUD_INTERVAL) {
                    println!("{}", snapshot.hud_line());
                    last_print = Some(std::time::Instant::now());
                }
            }
        })
        .expect("Failed to spawn HUD thread")
}

fn print_result(result: &RunResult) {
    println!();
    println!("Grade {}  {:.2}%", result.grade, result.accuracy);
    println!(
        "Score {}  max combo {}  x{}",
        result.score, result.max_combo, result.peak_multiplier
    );
    println!(
        "Perfect {}  Good {}  Miss {}  / {} notes, {} bonuses",
        result.perfect_hits,
        result.good_hits,
        result.missed_notes,
        result.total_notes,
        result.bonuses_collected
    );
    if result.is_full_combo() {
        println!("Full combo!");
    }
    if result.new_high_score {
        println!("New high score!");
    }
    if result.legendary_unlocked_now {
        println!("Legendary unlocked!");
    }
}
