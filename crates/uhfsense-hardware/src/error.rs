//! Error types for hardware operations.
//!
//! This module defines error types specific to the two device links: the
//! RFID reader driven through its vendor SDK, and the serial link to the
//! sensor node.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Serial port could not be opened.
    #[error("Port {port} unavailable: {reason}")]
    PortUnavailable { port: String, reason: String },

    /// Reader SDK rejected initialization.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Reader SDK call returned a nonzero status code.
    #[error("{operation} failed with status {code}")]
    CallFailed { operation: String, code: i32 },

    /// SDK call did not return within its timeout.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Device was used before initialization.
    #[error("Device not initialized: {device}")]
    NotInitialized { device: String },

    /// Outbound write on a serial link failed.
    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new port unavailable error.
    pub fn port_unavailable(port: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PortUnavailable {
            port: port.into(),
            reason: reason.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new call failed error.
    pub fn call_failed(operation: impl Into<String>, code: i32) -> Self {
        Self::CallFailed {
            operation: operation.into(),
            code,
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new not initialized error.
    pub fn not_initialized(device: impl Into<String>) -> Self {
        Self::NotInitialized {
            device: device.into(),
        }
    }

    /// Create a new write failed error.
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// SDK-style status code for this error.
    ///
    /// `CallFailed` carries the code returned by the SDK; every other failure
    /// maps to `-1`.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::CallFailed { code, .. } => *code,
            _ => -1,
        }
    }
}
