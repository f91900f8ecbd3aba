//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware.

pub mod reader;
pub mod transport;

// Re-export commonly used types
pub use reader::{AccessFault, MockCallCounts, MockReader, MockReaderHandle, MockTag};
pub use transport::{MockTransport, MockTransportHandle};
