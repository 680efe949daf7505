//! # Session Module
//!
//! Runs a [`FrameLoop`] against the microphone on a dedicated audio thread.
//! The input stream is created on that thread and never leaves it; the thread
//! only ends after the stream has been released.

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::Sender;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

use crate::audio::{self, AudioSource};
use crate::config::TunerConfig;
use crate::error::{CaptureError, SessionError};
use crate::frame_loop::{FrameLoop, SessionEnd};
use crate::reference::ReferenceHandle;
use crate::DisplayAdapter;

/// A running capture session.
///
/// Dropping the session requests shutdown without waiting for it; call
/// [`TunerSession::stop`] to wait and collect the outcome.
#[derive(Debug)]
pub struct TunerSession {
    shutdown_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<Result<SessionEnd, SessionError>>>,
}

impl TunerSession {
    /// Spawns the audio thread and starts capturing from the default microphone.
    ///
    /// Capture is attempted once, on the audio thread. If it fails the thread
    /// exits and [`TunerSession::stop`] reports the error.
    ///
    /// # Arguments
    /// * `config` - Pipeline settings; validated before the thread is spawned
    /// * `reference` - Shared reference pitch, read once per frame
    /// * `display` - Receives every reading on the audio thread
    ///
    /// # Returns
    /// * `Ok(session)` - The audio thread is running
    /// * `Err(e)` - Invalid configuration or the thread could not be spawned
    pub fn start<D>(config: TunerConfig, reference: ReferenceHandle, display: D) -> Result<Self>
    where
        D: DisplayAdapter + Send + 'static,
    {
        let capture = config.capture();
        Self::start_with(config, reference, display, move || {
            audio::request_capture(&capture)
        })
    }

    /// Like [`TunerSession::start`], but audio comes from `grant`.
    ///
    /// `grant` runs once on the audio thread, so the source it returns never
    /// has to cross threads.
    pub fn start_with<S, G, D>(
        config: TunerConfig,
        reference: ReferenceHandle,
        mut display: D,
        grant: G,
    ) -> Result<Self>
    where
        S: AudioSource,
        G: FnOnce() -> Result<S, CaptureError> + Send + 'static,
        D: DisplayAdapter + Send + 'static,
    {
        let mut frame_loop =
            FrameLoop::new(&config, reference).context("Invalid tuner configuration")?;
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let thread_handle = thread::Builder::new()
            .name("tone-audio".into())
            .spawn(move || {
                debug!("Audio thread started");
                let ticks = crossbeam_channel::tick(config.frame_interval);
                let result = frame_loop.run(grant, &mut display, &ticks, &shutdown_rx);
                debug!("Audio thread finished");
                result
            })
            .context("Failed to spawn audio thread")?;

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            thread_handle: Some(thread_handle),
        })
    }

    /// Whether the audio thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Requests shutdown, waits for the audio thread and returns how it ended.
    pub fn stop(mut self) -> Result<SessionEnd> {
        self.request_shutdown();
        let handle = self
            .thread_handle
            .take()
            .ok_or_else(|| anyhow!("Session already stopped"))?;
        let end = handle
            .join()
            .map_err(|_| anyhow!("Audio thread panicked"))?
            .context("Capture session failed")?;
        info!("Session stopped: {:?}", end);
        Ok(end)
    }

    fn request_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // The loop may already be gone.
            let _ = tx.try_send(());
        }
    }
}

impl Drop for TunerSession {
    fn drop(&mut self) {
        self.request_shutdown();
    }
}
