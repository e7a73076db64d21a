use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use voice_recorder::{
    http, AppState, AudioInputConfig, Config, InputFactory, InputSource, Recorder, RecorderError,
};

#[derive(Parser)]
#[command(name = "voice-recorder", version, about = "Voice recorder with an HTTP upload receiver")]
struct Cli {
    /// Configuration file (extension optional; missing file means defaults)
    #[arg(long, default_value = "config/voice-recorder")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the upload receiver
    Serve {
        /// Override the listening port
        #[arg(long)]
        port: Option<u16>,

        /// Override the storage directory
        #[arg(long)]
        storage_dir: Option<PathBuf>,
    },

    /// Record one take, optionally uploading it
    Record {
        /// WAV file played back as the input
        #[arg(long, required_unless_present = "microphone", conflicts_with = "microphone")]
        input: Option<PathBuf>,

        /// Record from the default microphone
        #[arg(long)]
        microphone: bool,

        /// Stop after this many seconds (default: end of file, or Ctrl+C)
        #[arg(long, value_parser = parse_duration_secs)]
        duration_secs: Option<Duration>,

        /// Upload the recording once stopped
        #[arg(long)]
        upload: bool,

        /// Override the upload endpoint
        #[arg(long)]
        upload_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve { port, storage_dir } => {
            let port = port.unwrap_or(cfg.service.http.port);
            let storage_dir = storage_dir.unwrap_or(cfg.storage.dir);
            let state =
                AppState::new(storage_dir).with_max_upload_bytes(cfg.storage.max_upload_bytes);

            http::serve(&cfg.service.http.bind, port, state).await
        }
        Command::Record {
            input,
            microphone: _,
            duration_secs,
            upload,
            upload_url,
        } => record(cfg, input, duration_secs, upload, upload_url).await,
    }
}

async fn record(
    cfg: Config,
    input: Option<PathBuf>,
    duration_secs: Option<Duration>,
    upload: bool,
    upload_url: Option<String>,
) -> Result<()> {
    let mut recorder_cfg = cfg.recorder;
    if let Some(url) = upload_url {
        recorder_cfg.upload_url = url;
    }

    let input_config = AudioInputConfig {
        timeslice_ms: recorder_cfg.timeslice_ms,
        chunk_channel_capacity: recorder_cfg.chunk_channel_capacity,
    };

    let (source, file_secs) = match input {
        Some(path) => {
            let reader = hound::WavReader::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let secs = reader.duration() as f64 / reader.spec().sample_rate as f64;
            (InputSource::File(path), Duration::try_from_secs_f64(secs).ok())
        }
        None => (InputSource::Microphone, None),
    };

    let input = InputFactory::create(source, input_config)
        .map_err(|e| report(RecorderError::from(e)))?;
    let mut recorder = Recorder::new(recorder_cfg, input);

    recorder.start().await.map_err(report)?;

    let mut sound = recorder.subscribe_sound();
    let indicator = tokio::spawn(async move {
        while sound.changed().await.is_ok() {
            let present = *sound.borrow_and_update();
            println!("{}", if present { "● sound" } else { "○ silence" });
        }
    });

    println!("Recording... press Ctrl+C to stop");
    match duration_secs.or(file_secs) {
        Some(limit) => {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
        }
    }

    let stats = recorder.stop().await.map_err(report)?;
    indicator.abort();

    if let Some(stats) = stats {
        println!(
            "Recorded {:.1}s in {} chunks ({} bytes)",
            stats.duration_secs,
            stats.chunks_count,
            stats.artifact_bytes.unwrap_or_default()
        );
    }
    if let Some(playback) = recorder.playback() {
        println!("Playback: {}", playback.url());
    }

    if upload {
        let ack = recorder.upload_artifact().await.map_err(report)?;
        println!("{}", ack.message);
    }

    Ok(())
}

/// Accept a finite, non-negative number of seconds
fn parse_duration_secs(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|e| format!("invalid number of seconds: {}", e))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("duration must be finite and non-negative, got {}", value))
}

/// Show the actionable message for a failed action
fn report(e: RecorderError) -> anyhow::Error {
    eprintln!("{}", e.user_message());
    e.into()
}
