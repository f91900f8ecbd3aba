//! Integrated reader and sensor controller.
//!
//! Wires the UHF reader, the sensor node link, continuous inventory and the
//! actuation policy together behind [`IntegratedController::start`], driven
//! by a TOML [`Config`].

pub mod config;
pub mod controller;

pub use config::{Config, ConfigError, ReaderSection, ScanSection, SensorSection};
pub use controller::{ControllerEvent, ControllerHandle, IntegratedController, StartupError};
