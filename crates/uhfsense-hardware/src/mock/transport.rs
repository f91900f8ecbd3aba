//! Mock serial transport for testing and development.
//!
//! Frames injected through [`MockTransportHandle::inject_frame`] are delivered
//! on the receiver returned by `open`, and every buffer sent is recorded.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    HardwareError, Result,
    traits::{FrameReceiver, SerialTransport},
    types::SerialConfig,
};

/// Capacity of the inbound frame channel.
const FRAME_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Default)]
struct MockTransportState {
    port: Option<String>,
    frame_tx: Option<mpsc::Sender<Vec<u8>>>,
    fail_open: bool,
    fail_writes: bool,
    sent: Vec<Vec<u8>>,
    close_calls: u32,
}

fn lock(state: &Mutex<MockTransportState>) -> MutexGuard<'_, MockTransportState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock serial port.
///
/// # Examples
///
/// ```
/// use uhfsense_hardware::mock::MockTransport;
/// use uhfsense_hardware::traits::SerialTransport;
/// use uhfsense_hardware::types::SerialConfig;
///
/// #[tokio::main]
/// async fn main() -> uhfsense_hardware::Result<()> {
///     let (mut transport, handle) = MockTransport::new();
///     let mut frames = transport.open(&SerialConfig::new("COM3", 9600)).await?;
///
///     handle.inject_frame(vec![0x01, 0x02]).await?;
///     assert_eq!(frames.recv().await, Some(vec![0x01, 0x02]));
///
///     transport.send(&[0xFF, 0xFF]).await?;
///     assert_eq!(handle.sent_frames(), vec![vec![0xFF, 0xFF]]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    /// Create a new mock transport and its control handle.
    pub fn new() -> (Self, MockTransportHandle) {
        let state = Arc::new(Mutex::new(MockTransportState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockTransportHandle { state },
        )
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new().0
    }
}

impl SerialTransport for MockTransport {
    async fn open(&mut self, config: &SerialConfig) -> Result<FrameReceiver> {
        let mut state = lock(&self.state);
        if state.fail_open {
            return Err(HardwareError::port_unavailable(
                &config.port,
                "port not found",
            ));
        }
        if state.port.is_some() {
            return Err(HardwareError::port_unavailable(&config.port, "port in use"));
        }

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        state.port = Some(config.port.clone());
        state.frame_tx = Some(tx);
        debug!(port = %config.port, baud_rate = config.baud_rate, "mock transport opened");
        Ok(rx)
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = lock(&self.state);
        if state.port.is_none() {
            return Err(HardwareError::not_initialized("mock transport"));
        }
        if state.fail_writes {
            return Err(HardwareError::write_failed("injected write failure"));
        }
        state.sent.push(bytes.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.close_calls += 1;
        state.port = None;
        // Dropping the sender closes the receiver side.
        state.frame_tx = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        lock(&self.state).port.is_some()
    }
}

/// Handle for controlling a mock transport.
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransportHandle {
    /// Deliver an inbound frame as if the device had sent it.
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` if the port is closed or the receiver was dropped.
    pub async fn inject_frame(&self, frame: Vec<u8>) -> Result<()> {
        let tx = lock(&self.state)
            .frame_tx
            .clone()
            .ok_or_else(|| HardwareError::disconnected("mock transport closed"))?;
        tx.send(frame)
            .await
            .map_err(|_| HardwareError::disconnected("frame receiver dropped"))
    }

    /// Buffers written so far, in order.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        lock(&self.state).sent.clone()
    }

    /// Make `open` fail.
    pub fn fail_open(&self, fail: bool) {
        lock(&self.state).fail_open = fail;
    }

    /// Make `send` fail.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    /// Check if the port is open.
    pub fn is_open(&self) -> bool {
        lock(&self.state).port.is_some()
    }

    /// Number of `close` calls received.
    pub fn close_count(&self) -> u32 {
        lock(&self.state).close_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_close_ends_frame_stream() {
        let (mut transport, handle) = MockTransport::new();
        let mut frames = transport
            .open(&SerialConfig::new("COM3", 9600))
            .await
            .unwrap();
        assert!(transport.is_open());

        transport.close().await.unwrap();
        assert_eq!(frames.recv().await, None);
        assert!(handle.inject_frame(vec![1]).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_transport_close_is_idempotent() {
        let (mut transport, handle) = MockTransport::new();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert_eq!(handle.close_count(), 2);
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_mock_transport_open_failure() {
        let (mut transport, handle) = MockTransport::new();
        handle.fail_open(true);
        let err = transport
            .open(&SerialConfig::new("COM9", 9600))
            .await
            .unwrap_err();
        assert!(matches!(err, HardwareError::PortUnavailable { .. }));
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_mock_transport_write_failure() {
        let (mut transport, handle) = MockTransport::new();
        assert!(matches!(
            transport.send(&[0x00]).await,
            Err(HardwareError::NotInitialized { .. })
        ));

        let _frames = transport
            .open(&SerialConfig::new("COM3", 9600))
            .await
            .unwrap();
        handle.fail_writes(true);
        assert!(matches!(
            transport.send(&[0x00]).await,
            Err(HardwareError::WriteFailed { .. })
        ));
        assert!(handle.sent_frames().is_empty());
    }
}
