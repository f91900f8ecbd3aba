//! Ambient light readings from the sensor node.
//!
//! The node streams 29-byte frames. Bytes 22 and 23 hold a little-endian
//! 16-bit fraction of the sensor's full scale:
//!
//! ```text
//! lux = (b[22] | b[23] << 8) / 65536 * 16000
//! ```
//!
//! Anything that is not exactly 29 bytes is a partial or foreign frame and is
//! dropped without touching the current sample.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use uhfsense_core::constants::{
    ILLUMINATION_FRAME_LEN, LUX_FULL_SCALE, LUX_HIGH_BYTE_OFFSET, LUX_LOW_BYTE_OFFSET,
};
use uhfsense_core::encoding::to_hex;
use uhfsense_hardware::FrameReceiver;

use crate::error::FrameError;

/// Extract the illumination value from a sensor frame.
///
/// # Errors
///
/// Returns `FrameError::Malformed` if the frame is not exactly
/// [`ILLUMINATION_FRAME_LEN`] bytes.
pub fn parse_illumination(frame: &[u8]) -> Result<f64, FrameError> {
    if frame.len() != ILLUMINATION_FRAME_LEN {
        return Err(FrameError::Malformed {
            len: frame.len(),
            expected: ILLUMINATION_FRAME_LEN,
        });
    }
    let raw = u16::from_le_bytes([frame[LUX_LOW_BYTE_OFFSET], frame[LUX_HIGH_BYTE_OFFSET]]);
    Ok(f64::from(raw) / 65536.0 * LUX_FULL_SCALE)
}

/// Latest accepted illumination value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IlluminationSample {
    pub lux: f64,

    /// `None` until the first valid frame arrives.
    pub observed_at: Option<DateTime<Utc>>,
}

/// Single writer of the illumination sample.
#[derive(Debug)]
pub struct IlluminationMonitor {
    sample: watch::Sender<IlluminationSample>,
}

impl IlluminationMonitor {
    pub fn new() -> Self {
        Self {
            sample: watch::Sender::new(IlluminationSample::default()),
        }
    }

    /// A new read handle on the sample.
    pub fn reader(&self) -> IlluminationReader {
        IlluminationReader {
            sample: self.sample.subscribe(),
        }
    }

    /// Apply one inbound frame. Returns the new value if the frame was accepted.
    pub fn ingest(&self, frame: &[u8]) -> Option<f64> {
        match parse_illumination(frame) {
            Ok(lux) => {
                self.sample.send_replace(IlluminationSample {
                    lux,
                    observed_at: Some(Utc::now()),
                });
                trace!(lux, "Illumination updated");
                Some(lux)
            }
            Err(e) => {
                trace!(frame = %to_hex(frame), "Discarding frame: {}", e);
                None
            }
        }
    }

    /// Consume frames until the channel closes. Returns the number accepted.
    pub async fn run(self, mut frames: FrameReceiver) -> u64 {
        let mut accepted = 0;
        while let Some(frame) = frames.recv().await {
            if self.ingest(&frame).is_some() {
                accepted += 1;
            }
        }
        debug!(accepted, "Sensor frame stream closed");
        accepted
    }

    /// Run the monitor on its own task.
    pub fn spawn(self, frames: FrameReceiver) -> JoinHandle<u64> {
        tokio::spawn(self.run(frames))
    }
}

impl Default for IlluminationMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the illumination sample. Cheap to clone.
#[derive(Debug, Clone)]
pub struct IlluminationReader {
    sample: watch::Receiver<IlluminationSample>,
}

impl IlluminationReader {
    pub fn latest(&self) -> IlluminationSample {
        *self.sample.borrow()
    }

    pub fn lux(&self) -> f64 {
        self.sample.borrow().lux
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use tokio::sync::mpsc;

    fn frame_with(low: u8, high: u8) -> Vec<u8> {
        let mut frame = vec![0u8; ILLUMINATION_FRAME_LEN];
        frame[LUX_LOW_BYTE_OFFSET] = low;
        frame[LUX_HIGH_BYTE_OFFSET] = high;
        frame
    }

    #[rstest]
    #[case(0x00, 0x40, 4000.0)]
    #[case(0x00, 0x00, 0.0)]
    #[case(0x00, 0x80, 8000.0)]
    #[case(0xFF, 0xFF, 65535.0 / 65536.0 * 16000.0)]
    fn test_parse_illumination(#[case] low: u8, #[case] high: u8, #[case] expected: f64) {
        let lux = parse_illumination(&frame_with(low, high)).unwrap();
        assert!((lux - expected).abs() < 1e-9);
    }

    #[rstest]
    #[case(0)]
    #[case(28)]
    #[case(30)]
    fn test_wrong_length_is_malformed(#[case] len: usize) {
        assert_eq!(
            parse_illumination(&vec![0x40; len]),
            Err(FrameError::Malformed { len, expected: 29 })
        );
    }

    #[test]
    fn test_initial_sample_is_zero() {
        let monitor = IlluminationMonitor::new();
        let sample = monitor.reader().latest();
        assert_eq!(sample.lux, 0.0);
        assert!(sample.observed_at.is_none());
    }

    #[test]
    fn test_malformed_frame_keeps_previous_sample() {
        let monitor = IlluminationMonitor::new();
        let reader = monitor.reader();

        assert_eq!(monitor.ingest(&frame_with(0x00, 0x40)), Some(4000.0));
        let before = reader.latest();

        assert_eq!(monitor.ingest(&[0x00; 28]), None);
        assert_eq!(reader.latest(), before);
        assert_eq!(reader.lux(), 4000.0);
    }

    #[tokio::test]
    async fn test_run_until_channel_closes() {
        let monitor = IlluminationMonitor::new();
        let reader = monitor.reader();
        let (tx, rx) = mpsc::channel(8);
        let task = monitor.spawn(rx);

        tx.send(frame_with(0x00, 0x40)).await.unwrap();
        tx.send(vec![0x01, 0x02]).await.unwrap();
        tx.send(frame_with(0x00, 0x01)).await.unwrap();
        drop(tx);

        assert_eq!(task.await.unwrap(), 2);
        assert!((reader.lux() - 62.5).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_lux_within_full_scale(frame in prop::collection::vec(any::<u8>(), 29)) {
            let lux = parse_illumination(&frame).unwrap();
            prop_assert!((0.0..16000.0).contains(&lux));
        }
    }
}
