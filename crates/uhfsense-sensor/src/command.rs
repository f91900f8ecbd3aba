//! LED commands sent to the sensor node.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};
use uhfsense_core::LedColor;
use uhfsense_core::constants::{GREEN_LED_ON, LED_OFF, RED_LED_ON};
use uhfsense_hardware::SerialTransport;

use crate::error::DispatchError;

/// Command for the node's LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LedCommand {
    On(LedColor),
    Off,
}

impl LedCommand {
    /// Pre-encoded wire payload, sent verbatim.
    pub fn payload(&self) -> &'static [u8] {
        match self {
            Self::On(LedColor::Red) => &RED_LED_ON,
            Self::On(LedColor::Green) => &GREEN_LED_ON,
            Self::Off => &LED_OFF,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::On(LedColor::Red) => "RED_LED_ON",
            Self::On(LedColor::Green) => "GREEN_LED_ON",
            Self::Off => "LED_OFF",
        }
    }
}

impl fmt::Display for LedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Send `command` once.
///
/// # Errors
///
/// Returns `TransportWriteFailure` if the transport rejects the write. The
/// failure is logged here; callers should not retry.
pub async fn dispatch<T: SerialTransport>(
    transport: &mut T,
    command: LedCommand,
) -> Result<(), DispatchError> {
    match transport.send(command.payload()).await {
        Ok(()) => {
            debug!(command = command.name(), "LED command sent");
            Ok(())
        }
        Err(source) => {
            warn!(command = command.name(), "LED command not delivered: {}", source);
            Err(DispatchError::TransportWriteFailure {
                command: command.name(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uhfsense_core::encoding::to_hex;
    use uhfsense_hardware::SerialConfig;
    use uhfsense_hardware::mock::MockTransport;

    #[rstest]
    #[case(LedCommand::On(LedColor::Red), "FFFFB6250100FEFE", "RED_LED_ON")]
    #[case(LedCommand::On(LedColor::Green), "FFFFB6250001FEFE", "GREEN_LED_ON")]
    #[case(LedCommand::Off, "FFFFB6240000FEFE", "LED_OFF")]
    fn test_payloads(#[case] command: LedCommand, #[case] hex: &str, #[case] name: &str) {
        assert_eq!(to_hex(command.payload()), hex);
        assert_eq!(command.to_string(), name);
    }

    #[tokio::test]
    async fn test_dispatch_sends_payload_once() {
        let (mut transport, handle) = MockTransport::new();
        let _frames = transport
            .open(&SerialConfig::new("COM3", 9600))
            .await
            .unwrap();

        dispatch(&mut transport, LedCommand::Off).await.unwrap();
        assert_eq!(handle.sent_frames(), vec![LED_OFF.to_vec()]);
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_not_retried() {
        let (mut transport, handle) = MockTransport::new();
        let _frames = transport
            .open(&SerialConfig::new("COM3", 9600))
            .await
            .unwrap();
        handle.fail_writes(true);

        let err = dispatch(&mut transport, LedCommand::On(LedColor::Green))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::TransportWriteFailure {
                command: "GREEN_LED_ON",
                ..
            }
        ));
        assert!(handle.sent_frames().is_empty());
    }
}
