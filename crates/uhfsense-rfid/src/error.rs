//! Error types for tag access and inventory scans.

use thiserror::Error;
use uhfsense_core::Bank;
use uhfsense_hardware::HardwareError;

/// Terminal failure of one read or write call.
///
/// Retryable failures (`DeviceRejected`, `CallFailed`, `Timeout`) are only
/// surfaced after the attempt budget is spent, and carry the kind of the last
/// attempt. `InvalidBank` and `InvalidRequest` are raised before the device
/// is contacted.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Write attempted against a read-only bank.
    #[error("{bank} bank is read-only")]
    InvalidBank { bank: Bank },

    /// Request rejected before reaching the device.
    #[error("Invalid access request: {reason}")]
    InvalidRequest { reason: String },

    /// The tag answered with an error status on the last attempt.
    #[error("{bank} access rejected by tag with status {code:#04x} after {attempts} attempts")]
    DeviceRejected { bank: Bank, code: u8, attempts: u32 },

    /// The SDK call returned a nonzero status on the last attempt.
    #[error("{bank} access call failed with status {code} after {attempts} attempts")]
    CallFailed { bank: Bank, code: i32, attempts: u32 },

    /// No tag answered on the last attempt.
    #[error("{bank} access timed out after {attempts} attempts")]
    Timeout { bank: Bank, attempts: u32 },
}

impl AccessError {
    /// Attempts made before the error was returned. Zero for fail-fast errors.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::DeviceRejected { attempts, .. }
            | Self::CallFailed { attempts, .. }
            | Self::Timeout { attempts, .. } => *attempts,
            Self::InvalidBank { .. } | Self::InvalidRequest { .. } => 0,
        }
    }
}

/// Failure of an inventory scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The reader refused to open a scan window.
    #[error("Failed to start inventory: {0}")]
    Start(#[source] HardwareError),

    /// Polling detections failed mid-window. The window was still stopped.
    #[error("Inventory poll failed: {0}")]
    Poll(#[source] HardwareError),

    /// The reader failed to stop the window.
    #[error("Failed to stop inventory: {0}")]
    Stop(#[source] HardwareError),

    /// Reading or writing the inventory area failed.
    #[error("Inventory area configuration failed: {0}")]
    Area(#[source] HardwareError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_error_display() {
        let err = AccessError::DeviceRejected {
            bank: Bank::User,
            code: 0x04,
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "USER access rejected by tag with status 0x04 after 5 attempts"
        );
        assert_eq!(err.attempts(), 5);
    }

    #[test]
    fn test_invalid_bank_has_no_attempts() {
        let err = AccessError::InvalidBank { bank: Bank::Tid };
        assert_eq!(err.to_string(), "TID bank is read-only");
        assert_eq!(err.attempts(), 0);
    }
}
