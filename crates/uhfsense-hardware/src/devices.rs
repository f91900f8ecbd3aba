//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits (RPITIT) are not object-safe, so we cannot use
//! `Box<dyn ReaderDevice>`. These enums provide concrete type dispatch at
//! compile time instead, which lets the controller spawn its tasks over a
//! single concrete device type.
//!
//! # Examples
//!
//! ```
//! use uhfsense_hardware::devices::{AnyReaderDevice, AnySerialTransport};
//! use uhfsense_hardware::mock::{MockReader, MockTransport};
//!
//! let (reader, _handle) = MockReader::new();
//! let any_reader = AnyReaderDevice::Mock(reader);
//!
//! let (transport, _handle) = MockTransport::new();
//! let any_transport = AnySerialTransport::Mock(transport);
//! ```

use std::time::Duration;

use uhfsense_core::{AccessPassword, BankAddress, InventoryArea, InventoryMode, TagReport};

use crate::mock::{MockReader, MockTransport};
#[cfg(feature = "hardware-serial")]
use crate::serial::SerialPortTransport;
use crate::traits::{FrameReceiver, ReaderDevice, SerialTransport};
use crate::types::{AccessResult, SerialConfig};
use crate::Result;

/// Enum wrapper for reader device dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyReaderDevice {
    /// Simulated reader for development and testing.
    Mock(MockReader),
    // Vendor SDK bindings plug in here as another variant.
}

impl ReaderDevice for AnyReaderDevice {
    async fn initialize(&mut self, port: &str) -> Result<()> {
        match self {
            Self::Mock(device) => device.initialize(port).await,
        }
    }

    async fn deinitialize(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.deinitialize().await,
        }
    }

    async fn set_inventory_area(&mut self, area: InventoryArea) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_inventory_area(area).await,
        }
    }

    async fn get_inventory_area(&self) -> Result<InventoryArea> {
        match self {
            Self::Mock(device) => device.get_inventory_area().await,
        }
    }

    async fn start_inventory(&mut self, mode: InventoryMode) -> Result<()> {
        match self {
            Self::Mock(device) => device.start_inventory(mode).await,
        }
    }

    async fn stop_inventory(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.stop_inventory().await,
        }
    }

    async fn poll_inventory(&mut self) -> Result<Vec<TagReport>> {
        match self {
            Self::Mock(device) => device.poll_inventory().await,
        }
    }

    async fn read_tag(
        &mut self,
        password: &AccessPassword,
        address: BankAddress,
        timeout: Duration,
    ) -> Result<AccessResult> {
        match self {
            Self::Mock(device) => device.read_tag(password, address, timeout).await,
        }
    }

    async fn write_tag(
        &mut self,
        password: &AccessPassword,
        address: BankAddress,
        data: &[u8],
        timeout: Duration,
    ) -> Result<AccessResult> {
        match self {
            Self::Mock(device) => device.write_tag(password, address, data, timeout).await,
        }
    }
}

/// Enum wrapper for serial transport dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySerialTransport {
    /// Simulated port for development and testing.
    Mock(MockTransport),

    /// OS serial port.
    #[cfg(feature = "hardware-serial")]
    Serial(SerialPortTransport),
}

impl SerialTransport for AnySerialTransport {
    async fn open(&mut self, config: &SerialConfig) -> Result<FrameReceiver> {
        match self {
            Self::Mock(transport) => transport.open(config).await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(transport) => transport.open(config).await,
        }
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            Self::Mock(transport) => transport.send(bytes).await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(transport) => transport.send(bytes).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(transport) => transport.close().await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(transport) => transport.close().await,
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Mock(transport) => transport.is_open(),
            #[cfg(feature = "hardware-serial")]
            Self::Serial(transport) => transport.is_open(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTag;
    use uhfsense_core::Epc;

    #[tokio::test]
    async fn test_any_reader_dispatch() {
        let (reader, handle) = MockReader::new();
        handle.add_tag(MockTag::new(Epc::new(vec![0xAA, 0xBB])));
        let mut any_reader = AnyReaderDevice::Mock(reader);

        any_reader.initialize("COM4").await.unwrap();
        any_reader.start_inventory(InventoryMode::default()).await.unwrap();
        assert_eq!(any_reader.poll_inventory().await.unwrap().len(), 1);
        any_reader.stop_inventory().await.unwrap();

        assert_eq!(handle.port().as_deref(), Some("COM4"));
        assert_eq!(handle.counts().stop_inventory, 1);
    }

    #[tokio::test]
    async fn test_any_transport_dispatch() {
        let (transport, handle) = MockTransport::new();
        let mut any_transport = AnySerialTransport::Mock(transport);

        let _frames = any_transport
            .open(&SerialConfig::new("COM3", 9600))
            .await
            .unwrap();
        any_transport.send(&[0xFE, 0xFE]).await.unwrap();
        assert!(any_transport.is_open());
        assert_eq!(handle.sent_frames().len(), 1);
    }
}
