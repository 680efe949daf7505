//! # Frame Loop Module
//!
//! Drives the pipeline once per tick: pull the current window from the audio
//! source, analyze it, pick the peak, map it onto the dial and publish one
//! reading. Ticks arrive on a channel (normally `crossbeam_channel::tick` at
//! the display refresh rate); a second channel requests shutdown and is
//! checked between ticks.
//!
//! The loop owns all of its state. The only thing shared with the outside is
//! the [`ReferenceHandle`], which is read once at the start of every tick.

use crossbeam_channel::Receiver;
use std::time::Instant;
use tracing::{error, info, trace};

use crate::audio::AudioSource;
use crate::config::{AnalyzerConfig, TunerConfig};
use crate::error::{AnalysisError, CaptureError, ConfigError, SessionError};
use crate::fft::SpectralAnalyzer;
use crate::pitch;
use crate::reference::ReferenceHandle;
use crate::tuning::ToneMapper;
use crate::{DisplayAdapter, ToneReading};

/// Lifecycle of the loop. `Running` is terminal for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the capture grant.
    Idle,
    /// Capture active, processing ticks.
    Running,
}

/// How a running session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Shutdown was requested (or its sender went away).
    Cancelled,
    /// The tick source closed.
    TicksStopped,
}

#[derive(Debug)]
pub struct FrameLoop {
    analyzer_config: AnalyzerConfig,
    mapper: ToneMapper,
    reference: ReferenceHandle,
    state: LoopState,
    /// Rotation held while the peak has no defined rotation (silence).
    last_rotation: f32,
    frames_published: u64,
}

impl FrameLoop {
    /// Creates an idle loop.
    ///
    /// # Arguments
    /// * `config` - Validated here; the analyzer itself is built once the sample rate is known
    /// * `reference` - Shared reference pitch, read at the start of every frame
    pub fn new(config: &TunerConfig, reference: ReferenceHandle) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            analyzer_config: config.analyzer(),
            mapper: ToneMapper::new(config.tolerance),
            reference,
            state: LoopState::Idle,
            last_rotation: 0.0,
            frames_published: 0,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Readings handed to the display so far.
    pub fn frames_published(&self) -> u64 {
        self.frames_published
    }

    pub fn reference(&self) -> &ReferenceHandle {
        &self.reference
    }

    /// Runs one window through the pipeline and returns the reading.
    ///
    /// A zero or otherwise undefined peak keeps the previous rotation.
    pub fn process_window(
        &mut self,
        analyzer: &mut SpectralAnalyzer,
        samples: &[f32],
    ) -> Result<ToneReading, AnalysisError> {
        let reference = self.reference.current();
        let spectrum = analyzer.analyze(samples)?;
        let peak_frequency_hz = pitch::peak_frequency(&spectrum);
        let mapping = self.mapper.map(peak_frequency_hz, reference);

        if let Some(rotation) = mapping.rotation_degrees {
            self.last_rotation = rotation;
        }

        Ok(ToneReading {
            peak_frequency_hz,
            rotation_degrees: self.last_rotation,
            is_near_tuned: mapping.is_near_tuned,
        })
    }

    /// Acquires the audio source and processes ticks until shutdown.
    ///
    /// `grant` is called exactly once. If it fails the error is logged and
    /// returned, the loop stays `Idle` and nothing is published. Once running,
    /// every tick publishes at most one reading; a malformed window skips that
    /// tick. The source is dropped (and its device released) before this
    /// returns, including when a panic unwinds through the loop.
    ///
    /// # Arguments
    /// * `grant` - Opens the audio source; called once
    /// * `display` - Receives each reading
    /// * `ticks` - One message per frame; the loop ends when it closes
    /// * `shutdown` - A message or hang-up ends the loop between frames
    ///
    /// # Returns
    /// * `Ok(end)` - How the running session ended
    /// * `Err(SessionError::Capture)` - The grant failed; the loop stayed `Idle`
    /// * `Err(SessionError::AlreadyRunning)` - This loop has already run
    pub fn run<S, G, D>(
        &mut self,
        grant: G,
        display: &mut D,
        ticks: &Receiver<Instant>,
        shutdown: &Receiver<()>,
    ) -> Result<SessionEnd, SessionError>
    where
        S: AudioSource,
        G: FnOnce() -> Result<S, CaptureError>,
        D: DisplayAdapter + ?Sized,
    {
        if self.state == LoopState::Running {
            return Err(SessionError::AlreadyRunning);
        }

        let mut source = grant().map_err(|e| {
            error!("Error accessing microphone: {}", e);
            e
        })?;
        let mut analyzer = SpectralAnalyzer::new(self.analyzer_config, source.sample_rate())?;

        self.state = LoopState::Running;
        info!(
            "Frame loop running: {}-point windows at {} Hz, reference {}",
            analyzer.fft_size(),
            analyzer.sample_rate(),
            self.reference.current()
        );

        let end = loop {
            crossbeam_channel::select! {
                recv(shutdown) -> _ => break SessionEnd::Cancelled,
                recv(ticks) -> msg => if msg.is_err() {
                    break SessionEnd::TicksStopped;
                },
            }

            match self.process_window(&mut analyzer, source.window()) {
                Ok(reading) => {
                    self.frames_published += 1;
                    trace!(
                        "Frame {}: {:.2} Hz, {:.1} deg, near tuned: {}",
                        self.frames_published,
                        reading.peak_frequency_hz,
                        reading.rotation_degrees,
                        reading.is_near_tuned
                    );
                    display.publish(&reading);
                }
                Err(e) => error!("Skipping frame: {}", e),
            }
        };

        drop(source);
        info!(
            "Frame loop finished ({:?}) after {} frames",
            end, self.frames_published
        );
        Ok(end)
    }
}
