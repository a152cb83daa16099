use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use frame_queue::core::pipeline::{self, PipelineOptions, PipelineReport};
use frame_queue::shared::constants;
use frame_queue::utils::logger::{self, LogLevel};
use frame_queue::{CancellationToken, QueueConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory for debug.log / error.log
    #[arg(long, global = true, default_value = ".")]
    log_dir: PathBuf,
    /// Write debug-level lines (queue starvation, cancellations)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Media {
    Video,
    Audio,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic producer/consumer pipeline through a frame queue
    Simulate {
        #[arg(short, long, default_value = constants::CONFIG_FILE)]
        config: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Media::Video)]
        media: Media,
        #[arg(long)]
        capacity: Option<usize>,
        #[arg(long)]
        push_timeout_ms: Option<u64>,
        #[arg(long)]
        pop_timeout_ms: Option<u64>,
        #[arg(short, long, default_value_t = constants::DEFAULT_SIM_FPS)]
        fps: u32,
        #[arg(short = 'n', long, default_value_t = constants::DEFAULT_SIM_FRAMES)]
        frames: u64,
        #[arg(short, long, default_value_t = 0, help = "Simulated decode time per frame")]
        decode_delay_ms: u64,
        #[arg(short, long, help = "Replace the queue after this many frames (close + drain_into)")]
        reconnect_after: Option<u64>,
        #[arg(short, long, default_value_t = constants::DEFAULT_SIM_PAYLOAD_BYTES)]
        payload_bytes: usize,
        #[arg(short, long, default_value_t = constants::DEFAULT_KEYFRAME_INTERVAL)]
        keyframe_interval: u64,
    },
    /// Print the effective queue configuration
    Config {
        #[arg(short, long, default_value = constants::CONFIG_FILE)]
        config: PathBuf,
    },
}

fn load_config(path: &Path) -> Result<QueueConfig> {
    QueueConfig::load_or_default(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    logger::init(&cli.log_dir, level);

    match cli.command {
        Commands::Simulate {
            config,
            media,
            capacity,
            push_timeout_ms,
            pop_timeout_ms,
            fps,
            frames,
            decode_delay_ms,
            reconnect_after,
            payload_bytes,
            keyframe_interval,
        } => {
            let mut queue_config = load_config(&config)?;
            if let Some(capacity) = capacity {
                queue_config.capacity = capacity;
            }
            if let Some(ms) = push_timeout_ms {
                queue_config.push_timeout_ms = ms;
            }
            if let Some(ms) = pop_timeout_ms {
                queue_config.pop_timeout_ms = ms;
            }
            queue_config.validate()?;

            let options = PipelineOptions {
                fps,
                frames,
                decode_delay: Duration::from_millis(decode_delay_ms),
                reconnect_after,
                payload_bytes,
                keyframe_interval,
            };

            let cancel = CancellationToken::new();
            let handler_token = cancel.clone();
            ctrlc::set_handler(move || {
                handler_token.cancel();
            })?;

            let report = run(media, &queue_config, &options, &cancel)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Config { config } => {
            let queue_config = load_config(&config)?;
            println!("{}", serde_json::to_string_pretty(&queue_config)?);
        }
    }

    Ok(())
}

fn run(
    media: Media,
    config: &QueueConfig,
    options: &PipelineOptions,
    cancel: &CancellationToken,
) -> Result<PipelineReport> {
    let payload_bytes = options.payload_bytes;
    let keyframe_interval = options.keyframe_interval;
    match media {
        Media::Video => pipeline::run_pipeline(
            "video",
            config,
            options,
            |index, pts| {
                pipeline::synthetic_video_frame(index, pts, payload_bytes, keyframe_interval)
            },
            cancel,
        ),
        Media::Audio => pipeline::run_pipeline(
            "audio",
            config,
            options,
            |index, pts| pipeline::synthetic_audio_frame(index, pts, payload_bytes),
            cancel,
        ),
    }
}
