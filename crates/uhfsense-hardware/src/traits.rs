//! Hardware device trait definitions.
//!
//! This module defines the contracts of the two external collaborators: the
//! vendor RFID SDK ([`ReaderDevice`]) and the serial link to the sensor node
//! ([`SerialTransport`]). Mock and real implementations sit behind the enum
//! wrappers in [`devices`](crate::devices).
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use std::time::Duration;

use tokio::sync::mpsc;
use uhfsense_core::{AccessPassword, BankAddress, InventoryArea, InventoryMode, TagReport};

use crate::error::Result;
use crate::types::{AccessResult, SerialConfig};

/// Receiving side of a transport's inbound frame channel.
///
/// Each message is one chunk delivered by a data-available event. The channel
/// closes when the transport is closed.
pub type FrameReceiver = mpsc::Receiver<Vec<u8>>;

/// UHF RFID reader abstraction.
///
/// Mirrors the vendor SDK: the reader is initialized on a port, runs inventory
/// windows that report detections, and performs synchronous bank-addressed
/// reads and writes.
///
/// # Exclusivity
///
/// Inventory control and tag access are mutually exclusive on the device. A
/// caller must stop an open inventory before calling [`read_tag`] or
/// [`write_tag`]. Implementations may reject access calls while inventory is
/// running.
///
/// # Object Safety
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic parameters, or the
/// [`AnyReaderDevice`](crate::devices::AnyReaderDevice) enum wrapper when a
/// concrete type is needed.
///
/// [`read_tag`]: ReaderDevice::read_tag
/// [`write_tag`]: ReaderDevice::write_tag
pub trait ReaderDevice: Send + Sync {
    /// Open the reader on the given serial port.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the SDK rejects the port.
    async fn initialize(&mut self, port: &str) -> Result<()>;

    /// Release the reader.
    ///
    /// Safe to call repeatedly and on a reader that was never initialized.
    async fn deinitialize(&mut self) -> Result<()>;

    /// Select the memory region captured with each inventory detection.
    async fn set_inventory_area(&mut self, area: InventoryArea) -> Result<()>;

    /// Query the configured inventory area.
    async fn get_inventory_area(&self) -> Result<InventoryArea>;

    /// Open an inventory window.
    async fn start_inventory(&mut self, mode: InventoryMode) -> Result<()>;

    /// Close the inventory window. Safe to call when no window is open.
    async fn stop_inventory(&mut self) -> Result<()>;

    /// Drain the detections reported since the previous poll.
    ///
    /// Every detection is returned, duplicates included.
    async fn poll_inventory(&mut self) -> Result<Vec<TagReport>>;

    /// Read `address` from the tag in the field.
    ///
    /// # Errors
    ///
    /// An `Err` is a call-level failure (the SDK status code was nonzero).
    /// Tag-level failures are reported through [`AccessResult::status`].
    async fn read_tag(
        &mut self,
        password: &AccessPassword,
        address: BankAddress,
        timeout: Duration,
    ) -> Result<AccessResult>;

    /// Write `data` to `address` on the tag in the field.
    ///
    /// `data` must cover exactly `address.word_length` words.
    ///
    /// # Errors
    ///
    /// Same convention as [`read_tag`](ReaderDevice::read_tag).
    async fn write_tag(
        &mut self,
        password: &AccessPassword,
        address: BankAddress,
        data: &[u8],
        timeout: Duration,
    ) -> Result<AccessResult>;
}

/// Byte-oriented serial link.
///
/// Inbound data is delivered through the channel returned by
/// [`open`](SerialTransport::open); outbound buffers are written with
/// [`send`](SerialTransport::send).
pub trait SerialTransport: Send + Sync {
    /// Open the port and start delivering inbound frames.
    ///
    /// # Errors
    ///
    /// Returns `PortUnavailable` if the port does not exist, is busy, or
    /// rejects the configuration.
    async fn open(&mut self, config: &SerialConfig) -> Result<FrameReceiver>;

    /// Write a buffer to the port.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` when the port is closed and `WriteFailed` when
    /// the OS write fails.
    async fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the port. Safe to call repeatedly and on a port never opened.
    async fn close(&mut self) -> Result<()>;

    /// Check whether the port is open.
    fn is_open(&self) -> bool;
}
