//! The integrated controller: continuous inventory driving the sensor LED.
//!
//! Two tasks run while the controller is up:
//!
//! - the **scan loop** runs continuous-mode windows and, after each one, sends
//!   an LED command for every distinct tag it saw;
//! - the **illumination monitor** consumes sensor frames and keeps the
//!   latest lux value.
//!
//! The lux value is the only state the two share.

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uhfsense_core::{AccessPassword, Epc, LedColor};
use uhfsense_hardware::{
    AnyReaderDevice, AnySerialTransport, HardwareError, ReaderDevice, SerialTransport,
};
use uhfsense_rfid::{
    AccessPolicy, ContinuousCadence, InventoryScanner, ReaderHandle, ScanError, ScanExit,
    ScanPhase, ScanReport, TagAccessController, WindowSink,
};
use uhfsense_sensor::{
    ActuationPolicy, IlluminationMonitor, IlluminationReader, IlluminationSample, LedCommand,
    dispatch,
};

use crate::config::{Config, ConfigError};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Why the controller could not start. Anything acquired before the failure
/// has been released.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Sensor port {port} unavailable: {source}")]
    PortUnavailable {
        port: String,
        #[source]
        source: HardwareError,
    },

    #[error("Reader initialization on {port} failed: {source}")]
    DeviceInitFailure {
        port: String,
        #[source]
        source: HardwareError,
    },
}

/// Observable things that happen while the controller runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    WindowCompleted {
        distinct_tags: usize,
        total_detections: u32,
        rate_per_sec: u64,
        exit: ScanExit,
    },
    LedCommandSent {
        epc: Epc,
        command: LedCommand,
        lux: f64,
    },
    CommandFailed {
        epc: Epc,
        command: LedCommand,
        reason: String,
    },
    ScanFailed {
        reason: String,
    },
}

type SharedTransport = Arc<Mutex<AnySerialTransport>>;
type SharedPolicy = Arc<RwLock<ActuationPolicy>>;

/// Window sink that turns detections into LED commands.
struct Actuator {
    transport: SharedTransport,
    policy: SharedPolicy,
    illumination: IlluminationReader,
    events: mpsc::Sender<ControllerEvent>,
}

impl Actuator {
    fn emit(&self, event: ControllerEvent) {
        if self.events.try_send(event).is_err() {
            trace!("Controller event dropped");
        }
    }
}

impl WindowSink for Actuator {
    async fn on_window(&mut self, report: &ScanReport) {
        self.emit(ControllerEvent::WindowCompleted {
            distinct_tags: report.stats.distinct_tags,
            total_detections: report.stats.total_detections,
            rate_per_sec: report.stats.rate_per_sec,
            exit: report.exit,
        });

        for tag in &report.session.tags {
            let lux = self.illumination.lux();
            let command = {
                let policy = self.policy.read().unwrap_or_else(PoisonError::into_inner);
                policy.decide(&tag.epc, lux)
            };
            debug!(epc = %tag.epc, lux, command = %command, "Actuation decided");

            let sent = {
                let mut transport = self.transport.lock().await;
                dispatch(&mut *transport, command).await
            };
            match sent {
                Ok(()) => self.emit(ControllerEvent::LedCommandSent {
                    epc: tag.epc.clone(),
                    command,
                    lux,
                }),
                Err(e) => self.emit(ControllerEvent::CommandFailed {
                    epc: tag.epc.clone(),
                    command,
                    reason: e.to_string(),
                }),
            }
        }
    }

    async fn on_error(&mut self, error: &ScanError) {
        warn!("Scan window failed: {}", error);
        self.emit(ControllerEvent::ScanFailed {
            reason: error.to_string(),
        });
    }
}

/// Entry point for the integrated reader plus sensor loop.
pub struct IntegratedController;

impl IntegratedController {
    /// Bring up both links and start the scan loop.
    ///
    /// The sensor port is opened first, then the reader is initialized and
    /// its inventory area applied. If any reader step fails the reader is
    /// released and the sensor port closed before the error is returned.
    pub async fn start(
        config: &Config,
        mut reader: AnyReaderDevice,
        mut transport: AnySerialTransport,
    ) -> Result<ControllerHandle, StartupError> {
        config.validate()?;
        let policy = config.actuation_policy()?;
        let password = config.password()?;

        let serial = config.sensor_serial();
        let frames = transport
            .open(&serial)
            .await
            .map_err(|source| StartupError::PortUnavailable {
                port: serial.port.clone(),
                source,
            })?;

        let reader_port = config.reader.port.clone();
        if let Err(source) = reader.initialize(&reader_port).await {
            error!(port = %reader_port, "Reader initialization failed: {}", source);
            release_transport(&mut transport).await;
            return Err(StartupError::DeviceInitFailure {
                port: reader_port,
                source,
            });
        }

        let reader = ReaderHandle::new(reader);
        let scanner = InventoryScanner::new(reader.clone());
        if let Err(e) = scanner.configure_area(config.reader.inventory_area).await {
            error!("Inventory area rejected: {}", e);
            release_reader(&reader).await;
            release_transport(&mut transport).await;
            let source = match e {
                ScanError::Area(source)
                | ScanError::Start(source)
                | ScanError::Poll(source)
                | ScanError::Stop(source) => source,
            };
            return Err(StartupError::DeviceInitFailure {
                port: reader_port,
                source,
            });
        }

        let monitor = IlluminationMonitor::new();
        let illumination = monitor.reader();
        let monitor_task = monitor.spawn(frames);

        let transport = Arc::new(Mutex::new(transport));
        let policy = Arc::new(RwLock::new(policy));
        let (events_tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let sink = Actuator {
            transport: Arc::clone(&transport),
            policy: Arc::clone(&policy),
            illumination: illumination.clone(),
            events: events_tx,
        };

        let cancel = CancellationToken::new();
        let phase = scanner.phase();
        let scan_task = tokio::spawn(scan_loop(
            scanner,
            config.cadence(),
            cancel.clone(),
            sink,
        ));

        info!(
            reader = %reader_port,
            sensor = %serial.port,
            threshold = config.sensor.threshold_lux,
            "Controller started"
        );
        Ok(ControllerHandle {
            cancel,
            scan_task: Some(scan_task),
            monitor_task: Some(monitor_task),
            reader,
            transport,
            policy,
            illumination,
            phase,
            events,
            password,
            access_policy: config.access_policy(),
            windows: 0,
        })
    }
}

async fn scan_loop(
    mut scanner: InventoryScanner<AnyReaderDevice>,
    cadence: ContinuousCadence,
    cancel: CancellationToken,
    mut sink: Actuator,
) -> u64 {
    scanner.run_continuous(cadence, &cancel, &mut sink).await
}

async fn release_reader(reader: &ReaderHandle<AnyReaderDevice>) {
    if let Err(e) = reader.lock().await.deinitialize().await {
        warn!("Reader deinitialization failed: {}", e);
    }
}

async fn release_transport(transport: &mut AnySerialTransport) {
    if let Err(e) = transport.close().await {
        warn!("Sensor port close failed: {}", e);
    }
}

/// A running controller.
///
/// Dropping the handle without calling [`stop`](Self::stop) cancels the scan
/// loop but does not release the devices.
pub struct ControllerHandle {
    cancel: CancellationToken,
    scan_task: Option<JoinHandle<u64>>,
    monitor_task: Option<JoinHandle<u64>>,
    reader: ReaderHandle<AnyReaderDevice>,
    transport: SharedTransport,
    policy: SharedPolicy,
    illumination: IlluminationReader,
    phase: watch::Receiver<ScanPhase>,
    events: mpsc::Receiver<ControllerEvent>,
    password: AccessPassword,
    access_policy: AccessPolicy,
    windows: u64,
}

impl ControllerHandle {
    pub fn illumination(&self) -> IlluminationSample {
        self.illumination.latest()
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.scan_task.is_some()
    }

    /// Next controller event, or `None` once the scan loop has ended.
    pub async fn next_event(&mut self) -> Option<ControllerEvent> {
        self.events.recv().await
    }

    /// Pin a tag to a color while running.
    ///
    /// # Errors
    ///
    /// Rejects color names other than RED and GREEN, and EPCs that are not hex.
    pub fn add_tag_color(&self, epc_hex: &str, color: &str) -> uhfsense_core::Result<()> {
        self.policy
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .rule
            .add_tag_color(epc_hex, color)
    }

    /// Color the LED would show for `epc` in low light.
    pub fn color_for(&self, epc: &Epc) -> LedColor {
        self.policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rule
            .color_for(epc)
    }

    /// Tag access sharing the controller's reader. Calls wait for the current
    /// scan window to close.
    pub fn access(&self) -> TagAccessController<AnyReaderDevice> {
        TagAccessController::new(self.reader.clone(), self.password, self.access_policy)
    }

    /// Stop scanning and release both devices.
    ///
    /// Lets the current window finish its drain, then deinitializes the reader
    /// and closes the sensor port. Safe to call more than once. Returns the
    /// number of windows completed.
    pub async fn stop(&mut self) -> u64 {
        self.cancel.cancel();

        if let Some(task) = self.scan_task.take() {
            match task.await {
                Ok(windows) => self.windows = windows,
                Err(e) => error!("Scan loop ended abnormally: {}", e),
            }
        }

        release_reader(&self.reader).await;
        release_transport(&mut *self.transport.lock().await).await;

        if let Some(task) = self.monitor_task.take() {
            match task.await {
                Ok(accepted) => debug!(accepted, "Illumination monitor finished"),
                Err(e) => error!("Illumination monitor ended abnormally: {}", e),
            }
        }

        info!(windows = self.windows, "Controller stopped");
        self.windows
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.monitor_task.take() {
            task.abort();
        }
    }
}
