//! Common types shared across hardware device implementations.
//!
//! This module defines the outcome of a single tag access call and serial
//! link settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uhfsense_core::Epc;

/// Status field of an access result, as reported by the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessStatus {
    /// The tag completed the operation.
    Success,

    /// The tag answered with a Gen2 error code.
    DeviceError(u8),

    /// No tag answered within the timeout.
    Timeout,
}

/// Result object filled by one read or write call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessResult {
    pub status: AccessStatus,

    /// Bytes read (empty for writes).
    pub data: Vec<u8>,

    /// EPC of the tag that answered, if any.
    pub epc: Epc,
}

impl AccessResult {
    /// Successful access.
    pub fn success(data: Vec<u8>, epc: Epc) -> Self {
        Self {
            status: AccessStatus::Success,
            data,
            epc,
        }
    }

    /// Tag answered with an error code.
    pub fn device_error(code: u8, epc: Epc) -> Self {
        Self {
            status: AccessStatus::DeviceError(code),
            data: Vec::new(),
            epc,
        }
    }

    /// No tag answered.
    pub fn timeout() -> Self {
        Self {
            status: AccessStatus::Timeout,
            data: Vec::new(),
            epc: Epc::default(),
        }
    }

    /// Check if the tag reported success.
    pub fn is_success(&self) -> bool {
        self.status == AccessStatus::Success
    }
}

/// Serial link settings (8 data bits, 1 stop bit, no parity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name (e.g., "COM3", "/dev/ttyUSB0").
    pub port: String,

    /// Baud rate in bits per second.
    pub baud_rate: u32,

    /// Blocking read timeout of the receive loop.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Create a serial configuration with the default read timeout.
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// An available serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub name: String,

    /// Port kind as reported by the OS (USB, PCI, Bluetooth, Unknown).
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_result_constructors() {
        let epc = Epc::new(vec![0xE2, 0x00]);
        assert!(AccessResult::success(vec![1, 2], epc.clone()).is_success());
        assert_eq!(
            AccessResult::device_error(4, epc).status,
            AccessStatus::DeviceError(4)
        );
        let timeout = AccessResult::timeout();
        assert_eq!(timeout.status, AccessStatus::Timeout);
        assert!(timeout.data.is_empty() && timeout.epc.is_empty());
    }

    #[test]
    fn test_serial_config_serialization() {
        let config = SerialConfig::new("COM3", 9600);
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SerialConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
