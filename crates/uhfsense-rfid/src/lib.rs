//! UHF tag access and inventory scanning.
//!
//! Built on the [`ReaderDevice`](uhfsense_hardware::ReaderDevice) contract:
//!
//! - [`TagAccessController`]: bank-addressed reads and writes with a bounded
//!   retry budget.
//! - [`InventoryScanner`]: scan windows, single or continuous, that always
//!   stop inventory before releasing the reader.
//! - [`InventoryStore`]: per-window detections with distinct and total counts.
//! - [`verify_write`] and [`run_acceptance`]: read-back verification and the
//!   end-to-end reader check.
//!
//! Scanner and access controller share one [`ReaderHandle`], which serializes
//! every device call.

pub mod access;
pub mod error;
pub mod reader;
pub mod scanner;
pub mod store;
pub mod verify;

pub use access::{AccessPolicy, AccessRequest, TagAccessController};
pub use error::{AccessError, ScanError};
pub use reader::ReaderHandle;
pub use scanner::{
    ContinuousCadence, InventoryScanner, ScanExit, ScanLimits, ScanPhase, ScanReport, WindowSink,
};
pub use store::{ElapsedTime, InventorySession, InventoryStore, ScanStats, TagRecord};
pub use verify::{
    AcceptanceReport, AcceptanceStep, WriteVerification, run_acceptance, verify_write,
};
