//! JSON-lines display adapter: one object per reading on the wrapped writer.

use serde::Serialize;
use std::io::Write;
use tracing::warn;

use tone_core::{DisplayAdapter, ToneReading};

/// What a dial front end needs to draw one frame.
#[derive(Debug, Serialize)]
struct DialFrame {
    peak_frequency_hz: f32,
    display_frequency_hz: i64,
    rotation_degrees: f32,
    is_near_tuned: bool,
    tint: &'static str,
}

impl From<&ToneReading> for DialFrame {
    fn from(reading: &ToneReading) -> Self {
        Self {
            peak_frequency_hz: reading.peak_frequency_hz,
            display_frequency_hz: reading.display_frequency(),
            rotation_degrees: reading.rotation_degrees,
            is_near_tuned: reading.is_near_tuned,
            tint: reading.tint().hex(),
        }
    }
}

pub struct JsonLinesDisplay<W: Write> {
    writer: W,
    failed: bool,
}

impl<W: Write> JsonLinesDisplay<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed: false,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer
    }

    fn write_frame(&mut self, reading: &ToneReading) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, &DialFrame::from(reading))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> DisplayAdapter for JsonLinesDisplay<W> {
    fn publish(&mut self, reading: &ToneReading) {
        if self.failed {
            return;
        }
        if let Err(e) = self.write_frame(reading) {
            // Usually a closed pipe; stop writing rather than spamming the log.
            warn!("Reading output stopped: {}", e);
            self.failed = true;
        }
    }
}
