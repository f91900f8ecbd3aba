//! Sensor node side of the system: illumination readings in, LED commands out.
//!
//! - [`IlluminationMonitor`] turns inbound frames into the latest
//!   [`IlluminationSample`], readable from anywhere through
//!   [`IlluminationReader`].
//! - [`ActuationPolicy`] maps a detected tag and the current lux value to a
//!   [`LedCommand`], which [`dispatch`] writes to the transport.

pub mod command;
pub mod error;
pub mod illumination;
pub mod policy;

pub use command::{LedCommand, dispatch};
pub use error::{DispatchError, FrameError};
pub use illumination::{
    IlluminationMonitor, IlluminationReader, IlluminationSample, parse_illumination,
};
pub use policy::{ActuationPolicy, TagColorRule};
