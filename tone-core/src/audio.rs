//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL (Cross-Platform Audio Library), and
//! the [`AudioSource`] seam the frame loop reads sample windows through.
//!
//! The stream callback never blocks: it down-mixes each chunk to mono and hands
//! it to a bounded channel, dropping the chunk if the analysis side has fallen
//! behind. The frame loop side keeps a ring of the newest samples and exposes
//! them as one contiguous window per tick.

use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

use crate::config::CaptureConfig;
use crate::error::CaptureError;

/// A live stream of mono samples at a fixed rate.
pub trait AudioSource {
    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// The most recent window of samples.
    ///
    /// The returned slice is overwritten on the next call.
    fn window(&mut self) -> &[f32];
}

/// Keeps the newest `size` samples and hands them out as a contiguous window.
///
/// Until `size` samples have arrived the window is zero-padded at the front.
#[derive(Debug, Clone)]
pub struct SampleRing {
    ring: VecDeque<f32>,
    window: Vec<f32>,
    size: usize,
}

impl SampleRing {
    pub fn new(size: usize) -> Self {
        let mut ring = VecDeque::with_capacity(size * 2);
        ring.resize(size, 0.0);
        Self {
            ring,
            window: vec![0.0; size],
            size,
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        // Only the tail can survive.
        let keep = &samples[samples.len().saturating_sub(self.size)..];
        self.ring.extend(keep.iter().copied());
        let excess = self.ring.len().saturating_sub(self.size);
        self.ring.drain(..excess);
    }

    pub fn window(&mut self) -> &[f32] {
        let (front, back) = self.ring.as_slices();
        self.window[..front.len()].copy_from_slice(front);
        self.window[front.len()..].copy_from_slice(back);
        &self.window
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// An [`AudioSource`] fed by chunks arriving over a channel.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: Receiver<Vec<f32>>,
    ring: SampleRing,
    sample_rate: u32,
}

impl ChannelSource {
    pub fn new(receiver: Receiver<Vec<f32>>, window_size: usize, sample_rate: u32) -> Self {
        Self {
            receiver,
            ring: SampleRing::new(window_size),
            sample_rate,
        }
    }
}

impl AudioSource for ChannelSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn window(&mut self) -> &[f32] {
        for chunk in self.receiver.try_iter() {
            self.ring.push(&chunk);
        }
        self.ring.window()
    }
}

/// Microphone input. Dropping it stops and releases the device stream.
pub struct CpalSource {
    stream: cpal::Stream,
    source: ChannelSource,
}

impl std::fmt::Debug for CpalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalSource")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl AudioSource for CpalSource {
    fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    fn window(&mut self) -> &[f32] {
        self.source.window()
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            warn!("Error pausing input stream: {}", e);
        }
        info!("Audio input released");
    }
}

/// Opens the default input device and starts streaming from it.
///
/// This is a single attempt; the caller decides what to do on failure.
///
/// # Audio Configuration
/// - Format: 32-bit float
/// - Channels: fewest the device offers, down-mixed to mono
/// - Sample Rate: closest supported to `preferred_sample_rate`
pub fn request_capture(config: &CaptureConfig) -> Result<CpalSource, CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported = find_supported_config(configs, config.preferred_sample_rate)
        .ok_or(CaptureError::NoSupportedConfig)?;

    let rate = config
        .preferred_sample_rate
        .clamp(supported.min_sample_rate().0, supported.max_sample_rate().0);
    let stream_config: cpal::StreamConfig =
        supported.with_sample_rate(cpal::SampleRate(rate)).into();
    let channels = usize::from(stream_config.channels.max(1));

    info!("Selected sample rate: {} Hz, {} channel(s)", rate, channels);

    let (sender, receiver) = crossbeam_channel::bounded(config.channel_capacity);
    let err_fn = |err| error!("An error occurred on the audio stream: {}", err);

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            forward_chunk(&sender, data, channels);
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok(CpalSource {
        stream,
        source: ChannelSource::new(receiver, config.window_size, rate),
    })
}

/// Down-mixes interleaved frames to mono and sends them without blocking.
fn forward_chunk(sender: &Sender<Vec<f32>>, data: &[f32], channels: usize) {
    let mono = downmix(data, channels);
    match sender.try_send(mono) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => debug!("Analysis behind, dropping audio chunk"),
        Err(TrySendError::Disconnected(_)) => {}
    }
}

fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Picks the f32 input configuration with the fewest channels, then the one
/// whose rate range comes closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let distance = if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            };
            (c.channels(), distance)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_starts_silent() {
        let mut ring = SampleRing::new(4);
        assert_eq!(ring.window(), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_ring_zero_pads_front_until_full() {
        let mut ring = SampleRing::new(4);
        ring.push(&[1.0, 2.0]);
        assert_eq!(ring.window(), &[0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_ring_keeps_newest() {
        let mut ring = SampleRing::new(4);
        ring.push(&[1.0, 2.0, 3.0]);
        ring.push(&[4.0, 5.0, 6.0]);
        assert_eq!(ring.window(), &[3.0, 4.0, 5.0, 6.0]);
        ring.push(&[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        assert_eq!(ring.window(), &[9.0, 10.0, 11.0, 12.0]);
        assert_eq!(ring.size(), 4);
    }

    #[test]
    fn test_channel_source_drains_pending_chunks() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut source = ChannelSource::new(rx, 4, 8000);
        tx.send(vec![1.0, 2.0]).unwrap();
        tx.send(vec![3.0]).unwrap();
        assert_eq!(source.window(), &[0.0, 1.0, 2.0, 3.0]);
        // Nothing new: same window.
        assert_eq!(source.window(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(source.sample_rate(), 8000);
    }

    #[test]
    fn test_downmix_averages_frames() {
        assert_eq!(downmix(&[1.0, 3.0, -1.0, 1.0], 2), vec![2.0, 0.0]);
        assert_eq!(downmix(&[0.5, 0.25], 1), vec![0.5, 0.25]);
    }

    #[test]
    fn test_forward_chunk_drops_when_full() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        forward_chunk(&tx, &[1.0, 1.0], 2);
        forward_chunk(&tx, &[2.0, 2.0], 2);
        assert_eq!(rx.try_recv().unwrap(), vec![1.0]);
        assert!(rx.try_recv().is_err());
    }
}
