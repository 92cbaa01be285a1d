// ambientplay - terminal driver for the ambient playlist engine
// Plays a music folder the way a game soundtrack would: fades, silence
// between songs, and combat cues from a simulated in-world clock.

use ambientplay::{
    audio::{AudioDevice, MusicScanner, SimulatedDevice},
    config::Config,
    context::ClockEnvironment,
    notify::Announcer,
    selection::{MemoryPreferenceStore, PreferenceStore},
    ui::{poll_event, status_line, ControlEvent, TerminalGuard},
    Direction, EngineEvent, PlaybackStatus, Session,
};
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type DriverSession = Session<Box<dyn AudioDevice>, ClockEnvironment>;

const VOLUME_STEP: f32 = 0.05;
const SEEK_STEP: f32 = 0.05;

#[derive(Parser)]
#[command(name = "ambientplay")]
#[command(about = "Context-aware ambient music player with crossfades and silence gaps")]
struct Args {
    /// Enable developer logging (stderr + debug output)
    #[arg(long)]
    dev: bool,

    /// Music folder to scan (repeatable, replaces the configured folders)
    #[arg(long = "music-dir")]
    music_dirs: Vec<PathBuf>,

    /// Run without an audio output, on a simulated clock
    #[arg(long)]
    no_audio: bool,

    /// Frame tick in milliseconds
    #[arg(long)]
    frame_ms: Option<u64>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_logging(dev: bool) -> Result<WorkerGuard> {
    // Create logs directory in the working directory
    let log_dir = PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ambientplay.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Base filter: info level for general logs, debug for ambientplay
    let base_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ambientplay=debug"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false);

    // Dev mode mirrors everything to stderr as well
    let stderr_layer = dev.then(|| fmt::layer().with_writer(std::io::stderr).with_target(true));

    tracing_subscriber::registry()
        .with(base_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(guard)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.dev)?;

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if !args.music_dirs.is_empty() {
        config.music_directories = args.music_dirs.clone();
    }
    if let Some(frame_ms) = args.frame_ms {
        config.ui.frame_ms = frame_ms.max(1);
    }

    info!("ambientplay starting up");

    // Everything runs on one thread: the engine is never shared
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let config = runtime.block_on(run(config, args.no_audio))?;

    let saved = match &args.config {
        Some(path) => config.save_to(path),
        None => config.save(),
    };
    if let Err(e) = saved {
        warn!("Could not save settings: {}", e);
    }

    info!("ambientplay shut down");
    Ok(())
}

async fn run(config: Config, no_audio: bool) -> Result<Config> {
    let device = open_device(no_audio);
    let environment = ClockEnvironment::new(
        9.0,
        config.context.minutes_per_day,
        config.context.day_start_hour,
        config.context.day_end_hour,
    );
    let scanner = MusicScanner::new(config.music_directories.clone())
        .with_host_directories(config.host_music_directories.clone());
    let store = open_store(&config.database_path);

    let mut session: DriverSession =
        Session::new(config.clone(), device, environment, Box::new(scanner), store)?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    session.engine_mut().set_event_sender(event_tx);

    let mut announcer = Announcer::new(
        config.playback.show_now_playing,
        config.ui.show_notifications,
        config.ui.notification_duration_ms,
    );

    let mut frame_ticker = interval(Duration::from_millis(config.ui.frame_ms.max(1)));
    frame_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut context_ticker = interval(config.context.poll_interval().max(Duration::from_millis(10)));
    context_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut terminal = TerminalGuard::new()?;
    let mut last_frame = Instant::now();
    let mut last_context = Instant::now();
    let mut running = true;

    while running {
        tokio::select! {
            _ = frame_ticker.tick() => {
                let now = Instant::now();
                let dt = now - last_frame;
                last_frame = now;

                session.engine_mut().device_mut().tick(dt);
                session.frame_tick(dt);

                while let Some(event) = poll_event(Duration::ZERO)? {
                    if !handle_control(&mut session, event) {
                        running = false;
                        break;
                    }
                }

                let line = status_line(&session.status(), session.config().playback.player_volume);
                terminal.draw_line(&line)?;
            }
            _ = context_ticker.tick() => {
                let now = Instant::now();
                let dt = now - last_context;
                last_context = now;

                session.context_mut().advance(dt);
                session.context_tick(dt);
            }
            Some(event) = event_rx.recv() => {
                match event {
                    EngineEvent::TrackStarted(track) => {
                        announcer.set_enabled(session.config().playback.show_now_playing);
                        announcer.now_playing(&track);
                    }
                    other => debug!("Engine event: {:?}", other),
                }
            }
        }
    }

    session.stop();
    Ok(session.config().clone())
}

#[cfg(feature = "audio")]
fn open_device(no_audio: bool) -> Box<dyn AudioDevice> {
    if no_audio {
        info!("Audio disabled, using the simulated device");
        return Box::new(SimulatedDevice::new());
    }
    match ambientplay::audio::RodioDevice::new(1.0) {
        Ok(device) => Box::new(device),
        Err(e) => {
            warn!("No audio output ({}), using the simulated device", e);
            Box::new(SimulatedDevice::new())
        }
    }
}

#[cfg(not(feature = "audio"))]
fn open_device(_no_audio: bool) -> Box<dyn AudioDevice> {
    info!("Built without audio, using the simulated device");
    Box::new(SimulatedDevice::new())
}

#[cfg(feature = "prefs")]
fn open_store(path: &Path) -> Box<dyn PreferenceStore> {
    match ambientplay::selection::SqlitePreferenceStore::new(path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("Could not open {} ({}), flags will not persist", path.display(), e);
            Box::new(MemoryPreferenceStore::new())
        }
    }
}

#[cfg(not(feature = "prefs"))]
fn open_store(_path: &Path) -> Box<dyn PreferenceStore> {
    Box::new(MemoryPreferenceStore::new())
}

/// Returns false when the user asked to quit
fn handle_control(session: &mut DriverSession, event: ControlEvent) -> bool {
    debug!("Control: {:?}", event);

    match event {
        ControlEvent::Quit => return false,

        ControlEvent::Play => {
            let current = session.engine().current().cloned();
            match current {
                Some(_) if session.engine().status() == PlaybackStatus::Paused => {
                    session.toggle_pause();
                }
                Some(track) => {
                    session.play_track(&track.id);
                }
                None => session.skip(Direction::Next),
            }
        }
        ControlEvent::Stop => session.stop(),
        ControlEvent::NextTrack => session.skip(Direction::Next),
        ControlEvent::PreviousTrack => session.skip(Direction::Previous),
        ControlEvent::TogglePlayPause => {
            session.toggle_pause();
        }
        ControlEvent::Restart => session.restart_current(),
        ControlEvent::SeekForward => {
            let position = session.engine().playback_progress() + SEEK_STEP;
            session.seek(position);
        }
        ControlEvent::SeekBackward => {
            let position = session.engine().playback_progress() - SEEK_STEP;
            session.seek(position);
        }

        ControlEvent::VolumeUp => {
            let volume = session.config().playback.player_volume + VOLUME_STEP;
            session.set_player_volume(volume);
        }
        ControlEvent::VolumeDown => {
            let volume = session.config().playback.player_volume - VOLUME_STEP;
            session.set_player_volume(volume);
        }

        ControlEvent::ToggleShuffle => {
            let mut playback = session.config().playback.clone();
            playback.shuffle = !playback.shuffle;
            info!("Shuffle {}", if playback.shuffle { "on" } else { "off" });
            session.apply_playback_config(playback);
        }
        ControlEvent::ToggleContextAware => {
            let mut playback = session.config().playback.clone();
            playback.context_aware = !playback.context_aware;
            info!("Context-aware {}", if playback.context_aware { "on" } else { "off" });
            session.apply_playback_config(playback);
        }
        ControlEvent::ToggleHostTracks => {
            let include = !session.config().playback.include_host_tracks;
            session.set_include_host_tracks(include);
        }

        ControlEvent::ToggleCombat => session.context_mut().toggle_combat(),
        ControlEvent::ToggleGamePause => {
            let environment = session.context_mut();
            environment.paused = !environment.paused;
        }
        ControlEvent::ToggleWinter => session.context_mut().toggle_winter(),

        ControlEvent::RefreshLibrary => {
            if let Err(e) = session.rebuild_catalog() {
                warn!("Library refresh failed: {}", e);
            }
        }
    }

    true
}
