//! Serial transport backed by the `serialport` crate.
//!
//! The port is opened once and cloned: one handle is moved to a dedicated
//! receive thread that forwards every chunk it reads into the frame channel,
//! the other stays behind a mutex for outbound writes, which run on the
//! blocking pool.
//!
//! ```text
//! ┌────────────┐  read()   ┌──────────────┐  mpsc   ┌──────────────┐
//! │ OS port    │──────────►│ rx thread    │────────►│ FrameReceiver│
//! │            │◄──────────│ send() (pool)│         └──────────────┘
//! └────────────┘  write()  └──────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use serialport::{DataBits, Parity, SerialPort, SerialPortType, StopBits};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use uhfsense_core::constants::SERIAL_READ_BUFFER_SIZE;
use uhfsense_core::encoding::to_hex;

use crate::{
    HardwareError, Result,
    traits::{FrameReceiver, SerialTransport},
    types::{PortInfo, SerialConfig},
};

/// Capacity of the inbound frame channel.
const FRAME_CHANNEL_CAPACITY: usize = 64;

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

struct ReceiveThread {
    stop: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

/// An OS serial port.
pub struct SerialPortTransport {
    port_name: Option<String>,
    writer: Option<SharedPort>,
    receiver: Option<ReceiveThread>,
}

impl SerialPortTransport {
    pub fn new() -> Self {
        Self {
            port_name: None,
            writer: None,
            receiver: None,
        }
    }
}

impl Default for SerialPortTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SerialPortTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortTransport")
            .field("port_name", &self.port_name)
            .field("open", &self.writer.is_some())
            .finish()
    }
}

fn receive_loop(
    mut port: Box<dyn SerialPort>,
    tx: mpsc::Sender<Vec<u8>>,
    stop: Arc<AtomicBool>,
    port_name: String,
) {
    let mut buffer = [0u8; SERIAL_READ_BUFFER_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match port.read(&mut buffer) {
            Ok(0) => continue,
            Ok(n) => {
                trace!(port = %port_name, frame = %to_hex(&buffer[..n]), "received");
                if tx.blocking_send(buffer[..n].to_vec()).is_err() {
                    debug!(port = %port_name, "frame receiver dropped, stopping receive loop");
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                continue;
            }
            Err(e) => {
                warn!(port = %port_name, "Serial read failed: {}", e);
                break;
            }
        }
    }
}

impl SerialTransport for SerialPortTransport {
    async fn open(&mut self, config: &SerialConfig) -> Result<FrameReceiver> {
        if self.writer.is_some() {
            return Err(HardwareError::port_unavailable(
                &config.port,
                "transport already open",
            ));
        }

        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| HardwareError::port_unavailable(&config.port, e.to_string()))?;
        let reader = port
            .try_clone()
            .map_err(|e| HardwareError::port_unavailable(&config.port, e.to_string()))?;

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread_port = config.port.clone();
        let join = std::thread::Builder::new()
            .name(format!("serial-rx-{}", config.port))
            .spawn(move || receive_loop(reader, tx, thread_stop, thread_port))?;

        info!(port = %config.port, baud_rate = config.baud_rate, "Serial port opened");
        self.port_name = Some(config.port.clone());
        self.writer = Some(Arc::new(Mutex::new(port)));
        self.receiver = Some(ReceiveThread { stop, join });
        Ok(rx)
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self
            .writer
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| HardwareError::not_initialized("serial transport"))?;
        let data = bytes.to_vec();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut port = writer
                .lock()
                .map_err(|_| HardwareError::write_failed("port mutex poisoned"))?;
            port.write_all(&data)
                .and_then(|()| port.flush())
                .map_err(|e| HardwareError::write_failed(e.to_string()))
        })
        .await
        .map_err(|e| HardwareError::write_failed(e.to_string()))??;

        trace!(frame = %to_hex(bytes), "sent");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer = None;
        if let Some(ReceiveThread { stop, join }) = self.receiver.take() {
            stop.store(true, Ordering::Relaxed);
            // The loop notices the flag within one read timeout.
            let joined = tokio::task::spawn_blocking(move || join.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                warn!("Serial receive thread did not exit cleanly");
            }
        }
        if let Some(port) = self.port_name.take() {
            info!(port = %port, "Serial port closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}

/// List the serial ports present on this machine.
///
/// # Errors
///
/// Returns an error if the OS port enumeration fails.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|e| HardwareError::Io(std::io::Error::other(e.to_string())))?;
    Ok(ports
        .into_iter()
        .map(|p| PortInfo {
            name: p.port_name,
            kind: match p.port_type {
                SerialPortType::UsbPort(_) => "USB",
                SerialPortType::PciPort => "PCI",
                SerialPortType::BluetoothPort => "Bluetooth",
                SerialPortType::Unknown => "Unknown",
            }
            .to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_port_is_unavailable() {
        let mut transport = SerialPortTransport::new();
        let err = transport
            .open(&SerialConfig::new("/dev/does-not-exist-uhfsense", 9600))
            .await
            .unwrap_err();
        assert!(matches!(err, HardwareError::PortUnavailable { .. }));
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_close_without_open() {
        let mut transport = SerialPortTransport::new();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(matches!(
            transport.send(&[0x00]).await,
            Err(HardwareError::NotInitialized { .. })
        ));
    }
}
