//! `gx8006-capture`: records every audio capture session the module streams
//! into its own WAV file.
//!
//! Serial devices are opened raw at the configured `baudrate` (8N1).

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

use gx8006_link::transport::Transport;
use gx8006_link::{
    CaptureConfig, LinkError, SerialLink, SessionEvent, SessionReassembler, WavSinkFactory,
};

#[derive(Parser, Debug)]
#[command(name = "gx8006-capture", version, about = "Record GX8006 audio capture sessions to WAV files")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device path, tcp://host:port or unix:///path (overrides the config file)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Directory for captured WAV files (overrides the config file)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(short = 'f', long)]
    log_file: Option<PathBuf>,
}

/// Log to stdout, and to `log_file` as well when given. Level comes from
/// `RUST_LOG` and defaults to info.
fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let level = LevelFilter::from_str(&rust_log).unwrap_or(LevelFilter::INFO);
    let env_filter = EnvFilter::new(level.to_string());

    let stdout_layer = fmt::layer().with_writer(io::stdout);
    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let file_layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            Box::new(
                Registry::default()
                    .with(env_filter)
                    .with(stdout_layer)
                    .with(file_layer),
            )
        }
        None => Box::new(Registry::default().with(env_filter).with(stdout_layer)),
    };

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(args: &Args) -> gx8006_link::error::Result<CaptureConfig> {
    let mut config = match &args.config {
        Some(path) => CaptureConfig::load(path)?,
        None => CaptureConfig::default(),
    };
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let config = load_config(&args)?;
    let endpoint = config.endpoint()?;
    info!(
        "Opening {} ({} baud, {:?} {} Hz, {} ch)",
        endpoint, config.baudrate, config.format, config.sample_rate, config.channels
    );

    let transport = Transport::connect(&endpoint, config.baudrate).await?;
    let mut link = SerialLink::open(transport, config.link_config());
    let mut session = SessionReassembler::new(WavSinkFactory::for_codec(
        &config.output_dir,
        config.audio_format(),
        config.format,
    )?);
    let timeout = config.receive_timeout();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping capture");
                break;
            }
            received = link.receive(Some(timeout)) => {
                match received {
                    Ok(Some(frame)) => match session.handle(&frame) {
                        Ok(SessionEvent::Ignored) => {
                            debug!(
                                "Ignoring frame cmd=0x{:02X} ({} payload bytes)",
                                frame.command(),
                                frame.payload_len()
                            );
                        }
                        Ok(SessionEvent::Dropped) => {
                            warn!("Dropped capture frame outside of a session");
                        }
                        Ok(_) => {}
                        Err(e) => error!("Capture sink failed: {}", e),
                    },
                    Ok(None) => {}
                    Err(LinkError::ConnectionClosed) => {
                        warn!("Link closed by the device side");
                        break;
                    }
                    Err(e) => {
                        error!("Link failed: {}", e);
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = session.shutdown() {
        error!("Failed to close capture in progress: {}", e);
    }

    let stats = link.stats();
    let termination = link.close().await?;
    info!(
        "Link stopped ({:?}): {} frames, {} bytes skipped, {} checksum failures",
        termination, stats.frames, stats.resync_bytes, stats.checksum_failures
    );
    Ok(())
}
