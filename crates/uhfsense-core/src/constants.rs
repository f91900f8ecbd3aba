//! Core constants for the reader driver and the sensor node link.
//!
//! This module collects every fixed value shared across the workspace: tag
//! memory bank codes, access timing, inventory pacing, the illumination frame
//! layout and the pre-encoded LED command payloads.
//!
//! # Sensor Link Frames
//!
//! Outbound LED commands are 8-byte frames bounded by a fixed header and
//! trailer:
//!
//! ```text
//! FF FF | B6 | 2x | RR | GG | FE FE
//! ```
//!
//! Inbound illumination frames are exactly [`ILLUMINATION_FRAME_LEN`] bytes;
//! the light reading sits at [`LUX_LOW_BYTE_OFFSET`] and
//! [`LUX_HIGH_BYTE_OFFSET`].
//!
//! # Usage
//!
//! ```
//! use uhfsense_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(BANK_USER, 3);
//! let timeout = Duration::from_millis(DEFAULT_READ_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 3);
//! ```

// ============================================================================
// Tag Memory Banks
// ============================================================================

/// Reader SDK code for the EPC memory bank.
pub const BANK_EPC: u8 = 1;

/// Reader SDK code for the TID memory bank (read-only).
pub const BANK_TID: u8 = 2;

/// Reader SDK code for the USER memory bank.
pub const BANK_USER: u8 = 3;

/// First EPC word after the CRC and PC words.
pub const EPC_START_WORD: u16 = 2;

/// Words read from the EPC bank by the fixed EPC preset.
pub const EPC_WORD_LEN: u16 = 1;

/// First TID word read by the fixed TID preset.
pub const TID_START_WORD: u16 = 2;

/// Words read from the TID bank by the fixed TID preset.
pub const TID_WORD_LEN: u16 = 1;

/// First USER word addressed by the fixed USER preset.
pub const USER_START_WORD: u16 = 0;

/// Words addressed by the fixed USER preset (8 hex digits).
pub const USER_WORD_LEN: u16 = 2;

/// Bytes per addressing word.
pub const BYTES_PER_WORD: usize = 2;

// ============================================================================
// Tag Access
// ============================================================================

/// Default access password, 8 hex digits.
pub const DEFAULT_ACCESS_PASSWORD: &str = "00000000";

/// Default timeout for a single read attempt in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 3000;

/// Default timeout for a single write attempt in milliseconds.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 500;

/// Attempts made by a read or write before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Gen2 tag error: the address range exceeds the bank.
pub const TAG_ERROR_MEMORY_OVERRUN: u8 = 0x03;

/// Gen2 tag error: the bank is locked or the password is wrong.
pub const TAG_ERROR_MEMORY_LOCKED: u8 = 0x04;

/// Gen2 tag error: unspecified failure.
pub const TAG_ERROR_NON_SPECIFIC: u8 = 0x0F;

// ============================================================================
// Inventory
// ============================================================================

/// Inventory area code covering the EPC and USER banks.
pub const INVENTORY_AREA_EPC_USER: u8 = 2;

/// Start word of the default inventory area.
pub const INVENTORY_AREA_START_WORD: u16 = 0;

/// Word length of the default inventory area.
pub const INVENTORY_AREA_WORD_LEN: u16 = 6;

/// Inventory mode passed to the reader when a scan window opens.
pub const INVENTORY_MODE_CONTINUOUS: u8 = 2;

/// Mode parameter passed alongside [`INVENTORY_MODE_CONTINUOUS`].
pub const INVENTORY_MODE_PARAM: u8 = 0;

/// Interval between inventory polls in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Total detections that end a single scan early.
pub const DEFAULT_TARGET_COUNT: u32 = 100;

/// Upper bound on a single scan in milliseconds.
pub const DEFAULT_MAX_SCAN_MS: u64 = 10_000;

/// Scan window length in continuous mode, in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 500;

/// Idle gap between continuous windows, in milliseconds.
pub const DEFAULT_IDLE_MS: u64 = 1000;

// ============================================================================
// Serial Links
// ============================================================================

/// Default serial port of the RFID reader.
pub const DEFAULT_READER_PORT: &str = "COM4";

/// Default serial port of the sensor node.
pub const DEFAULT_SENSOR_PORT: &str = "COM3";

/// Default baud rate of the sensor node link.
pub const DEFAULT_SENSOR_BAUD_RATE: u32 = 9600;

/// Largest chunk read from a serial port in one call.
pub const SERIAL_READ_BUFFER_SIZE: usize = 1024;

// ============================================================================
// Illumination Frames
// ============================================================================

/// Length in bytes of an illumination frame (58 hex characters).
pub const ILLUMINATION_FRAME_LEN: usize = 29;

/// Offset of the low byte of the raw light reading.
pub const LUX_LOW_BYTE_OFFSET: usize = 22;

/// Offset of the high byte of the raw light reading.
pub const LUX_HIGH_BYTE_OFFSET: usize = 23;

/// Lux value corresponding to a raw reading of 65536.
pub const LUX_FULL_SCALE: f64 = 16000.0;

/// Below this illumination the LED is switched on.
pub const DEFAULT_ILLUMINATION_THRESHOLD_LUX: f64 = 100.0;

// ============================================================================
// LED Commands
// ============================================================================

/// Header bytes of every outbound sensor command.
pub const COMMAND_HEADER: [u8; 2] = [0xFF, 0xFF];

/// Trailer bytes of every outbound sensor command.
pub const COMMAND_TRAILER: [u8; 2] = [0xFE, 0xFE];

/// Red LED on, green LED off (`FFFFB6250100FEFE`).
pub const RED_LED_ON: [u8; 8] = [0xFF, 0xFF, 0xB6, 0x25, 0x01, 0x00, 0xFE, 0xFE];

/// Green LED on, red LED off (`FFFFB6250001FEFE`).
pub const GREEN_LED_ON: [u8; 8] = [0xFF, 0xFF, 0xB6, 0x25, 0x00, 0x01, 0xFE, 0xFE];

/// Both LEDs off (`FFFFB6240000FEFE`).
pub const LED_OFF: [u8; 8] = [0xFF, 0xFF, 0xB6, 0x24, 0x00, 0x00, 0xFE, 0xFE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_are_framed() {
        for payload in [RED_LED_ON, GREEN_LED_ON, LED_OFF] {
            assert_eq!(payload[..2], COMMAND_HEADER);
            assert_eq!(payload[6..], COMMAND_TRAILER);
        }
    }

    #[test]
    fn test_frame_offsets_within_frame() {
        assert!(LUX_HIGH_BYTE_OFFSET < ILLUMINATION_FRAME_LEN);
        assert_eq!(LUX_HIGH_BYTE_OFFSET, LUX_LOW_BYTE_OFFSET + 1);
    }

    #[test]
    fn test_user_preset_is_eight_hex_digits() {
        assert_eq!(USER_WORD_LEN as usize * BYTES_PER_WORD * 2, 8);
    }
}
