//! # Tone Monitor
//!
//! Minimal host for a tone dial session. Readings go to stdout as JSON lines,
//! one per frame; logs go to stderr. Each line typed on stdin selects a new
//! reference pitch (415 to 466 Hz). `q` or end of input stops the session.
//!
//! ## Architecture
//! - **Main Thread**: applies reference selections, watches the session
//! - **Audio Thread**: capture and analysis, owned by `TunerSession`
//! - **Input Thread**: blocking stdin reads forwarded over a channel

mod display;
mod input;

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tone_core::{ReferenceHandle, SessionError, TunerConfig, TunerSession};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use display::JsonLinesDisplay;
use input::Command;

/// How often the main thread checks whether the audio thread is still alive.
const SESSION_POLL_INTERVAL: Duration = Duration::from_millis(200);

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting tone monitor...");

    let config = TunerConfig::default();
    let reference = ReferenceHandle::default();
    let session = TunerSession::start(
        config,
        reference.clone(),
        JsonLinesDisplay::new(std::io::stdout()),
    )?;

    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("tone-input".into())
        .spawn(move || input::forward_commands(std::io::stdin().lock(), command_tx))
        .context("Failed to spawn input thread")?;

    info!("Reference pitch {}; type a frequency to change it, q to quit", reference.current());

    loop {
        crossbeam_channel::select! {
            recv(command_rx) -> command => match command {
                Ok(Command::Select(hz)) => {
                    if reference.select(hz) {
                        info!("Reference pitch set to {}", reference.current());
                    } else {
                        warn!(
                            "Ignoring {} Hz, keeping {}",
                            hz,
                            reference.current()
                        );
                    }
                }
                Ok(Command::Quit) | Err(_) => break,
            },
            default(SESSION_POLL_INTERVAL) => {
                if !session.is_running() {
                    break;
                }
            }
        }
    }

    match session.stop() {
        Ok(end) => {
            info!("Tone monitor finished ({:?})", end);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            // Capture failures were already logged by the frame loop.
            let logged = e.chain().any(|cause| {
                matches!(
                    cause.downcast_ref::<SessionError>(),
                    Some(SessionError::Capture(_))
                )
            });
            if logged {
                debug!("Session error: {:#}", e);
            } else {
                error!("Session error: {:#}", e);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
