use thiserror::Error;
use uhfsense_hardware::HardwareError;

/// An inbound sensor frame that is not an illumination update.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Malformed illumination frame: expected {expected} bytes, got {len}")]
    Malformed { len: usize, expected: usize },
}

/// An LED command that could not be delivered.
///
/// Not retried: the next scan window issues a fresh command.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to send {command}: {source}")]
    TransportWriteFailure {
        command: &'static str,
        #[source]
        source: HardwareError,
    },
}
