//! Hardware device abstraction layer for the UHF reader and sensor node.
//!
//! This crate defines the contracts of the two external collaborators the
//! rest of the workspace drives:
//!
//! - [`ReaderDevice`]: the vendor RFID SDK. Initialization on a port,
//!   inventory windows, and synchronous bank-addressed tag reads and writes.
//! - [`SerialTransport`]: a byte-oriented serial link that delivers inbound
//!   frames over a channel and accepts outbound buffers.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Enum dispatch**: [`AnyReaderDevice`] and [`AnySerialTransport`] give a
//!   concrete type wherever a trait object would otherwise be needed.
//! - **Thread-safe**: All traits require `Send + Sync` for use with Tokio.
//! - **Error-aware**: All operations return `Result<T>` with [`HardwareError`].
//!
//! # Example
//!
//! ```no_run
//! use uhfsense_hardware::traits::ReaderDevice;
//! use uhfsense_hardware::Result;
//! use uhfsense_core::{AccessPassword, BankAddress};
//! use std::time::Duration;
//!
//! async fn read_user<R: ReaderDevice>(reader: &mut R) -> Result<Vec<u8>> {
//!     let result = reader
//!         .read_tag(&AccessPassword::default(), BankAddress::user(), Duration::from_secs(3))
//!         .await?;
//!     Ok(result.data)
//! }
//! ```
//!
//! # Mock Implementations
//!
//! [`mock::MockReader`] and [`mock::MockTransport`] simulate both links, with
//! control handles for fault injection and call inspection.
//!
//! [`ReaderDevice`]: traits::ReaderDevice
//! [`SerialTransport`]: traits::SerialTransport
//! [`AnyReaderDevice`]: devices::AnyReaderDevice
//! [`AnySerialTransport`]: devices::AnySerialTransport

pub mod devices;
pub mod error;
pub mod mock;
#[cfg(feature = "hardware-serial")]
pub mod serial;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyReaderDevice, AnySerialTransport};
pub use error::{HardwareError, Result};
pub use traits::{FrameReceiver, ReaderDevice, SerialTransport};
pub use types::{AccessResult, AccessStatus, PortInfo, SerialConfig};

#[cfg(feature = "hardware-serial")]
pub use serial::{SerialPortTransport, available_ports};
