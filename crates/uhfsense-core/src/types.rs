use crate::{
    Result,
    constants::{
        BANK_EPC, BANK_TID, BANK_USER, BYTES_PER_WORD, EPC_START_WORD,
        EPC_WORD_LEN, INVENTORY_AREA_EPC_USER, INVENTORY_AREA_START_WORD, INVENTORY_AREA_WORD_LEN,
        INVENTORY_MODE_CONTINUOUS, INVENTORY_MODE_PARAM, TID_START_WORD, TID_WORD_LEN,
        USER_START_WORD, USER_WORD_LEN,
    },
    encoding::{parse_hex, to_hex},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Addressable memory region of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bank {
    /// EPC memory (CRC, PC and the EPC itself).
    Epc,
    /// Tag identifier memory, written by the manufacturer.
    Tid,
    /// User memory.
    User,
}

impl Bank {
    /// Decode a reader SDK bank code.
    ///
    /// # Errors
    /// Returns `Error::InvalidBank` for codes other than 1, 2 and 3.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            BANK_EPC => Ok(Bank::Epc),
            BANK_TID => Ok(Bank::Tid),
            BANK_USER => Ok(Bank::User),
            other => Err(Error::InvalidBank(other)),
        }
    }

    /// Reader SDK bank code.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Bank::Epc => BANK_EPC,
            Bank::Tid => BANK_TID,
            Bank::User => BANK_USER,
        }
    }

    /// Whether the bank accepts writes. TID is read-only.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        !matches!(self, Bank::Tid)
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Bank::Epc => write!(f, "EPC"),
            Bank::Tid => write!(f, "TID"),
            Bank::User => write!(f, "USER"),
        }
    }
}

/// A word range within one memory bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BankAddress {
    pub bank: Bank,
    pub start_word: u16,
    pub word_length: u16,
}

impl BankAddress {
    /// Create a bank address.
    ///
    /// # Errors
    /// Returns `Error::InvalidAddress` if `word_length` is zero.
    pub fn new(bank: Bank, start_word: u16, word_length: u16) -> Result<Self> {
        if word_length == 0 {
            return Err(Error::InvalidAddress(format!(
                "{bank} word length must be greater than zero"
            )));
        }
        Ok(Self {
            bank,
            start_word,
            word_length,
        })
    }

    /// EPC identifier word, skipping the CRC and PC words.
    #[must_use]
    pub const fn epc() -> Self {
        Self {
            bank: Bank::Epc,
            start_word: EPC_START_WORD,
            word_length: EPC_WORD_LEN,
        }
    }

    /// TID word read by the acceptance sequence.
    #[must_use]
    pub const fn tid() -> Self {
        Self {
            bank: Bank::Tid,
            start_word: TID_START_WORD,
            word_length: TID_WORD_LEN,
        }
    }

    /// First two USER words (8 hex digits).
    #[must_use]
    pub const fn user() -> Self {
        Self {
            bank: Bank::User,
            start_word: USER_START_WORD,
            word_length: USER_WORD_LEN,
        }
    }

    /// Number of bytes covered by this address.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.word_length as usize * BYTES_PER_WORD
    }
}

impl fmt::Display for BankAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}[{}..{}]",
            self.bank,
            self.start_word,
            self.start_word as u32 + self.word_length as u32
        )
    }
}

/// 4-byte tag access password.
///
/// # Security
/// Equality is constant-time and the `Debug` output is redacted.
#[derive(Clone, Copy, Eq)]
pub struct AccessPassword([u8; 4]);

impl AccessPassword {
    /// Wrap raw password bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Parse an 8-digit hex password.
    ///
    /// # Errors
    /// Returns `Error::InvalidPassword` unless the input is exactly 4 bytes of hex.
    pub fn from_hex(input: &str) -> Result<Self> {
        let bytes = parse_hex(input).map_err(|e| Error::InvalidPassword(e.to_string()))?;
        let bytes: [u8; 4] = bytes.try_into().map_err(|v: Vec<u8>| {
            Error::InvalidPassword(format!("expected 4 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl Default for AccessPassword {
    fn default() -> Self {
        Self([0; 4])
    }
}

impl PartialEq for AccessPassword {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl fmt::Debug for AccessPassword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("AccessPassword(********)")
    }
}

impl std::str::FromStr for AccessPassword {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AccessPassword::from_hex(s)
    }
}

/// Electronic Product Code of a tag.
///
/// Serialized as an uppercase hex string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Epc(Vec<u8>);

impl Epc {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse an EPC from hex.
    ///
    /// # Errors
    /// Returns `Error::InvalidHex` if the input is not valid hex.
    pub fn from_hex(input: &str) -> Result<Self> {
        parse_hex(input).map(Self)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// Low nibble of the final byte, i.e. the last hex digit.
    #[must_use]
    pub fn last_nibble(&self) -> Option<u8> {
        self.0.last().map(|b| b & 0x0F)
    }
}

impl fmt::Display for Epc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Epc> for String {
    fn from(epc: Epc) -> Self {
        epc.to_hex()
    }
}

impl TryFrom<String> for Epc {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Epc::from_hex(&value)
    }
}

/// Sensor node LED color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LedColor {
    Red,
    Green,
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedColor::Red => write!(f, "RED"),
            LedColor::Green => write!(f, "GREEN"),
        }
    }
}

impl std::str::FromStr for LedColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("red") {
            Ok(LedColor::Red)
        } else if trimmed.eq_ignore_ascii_case("green") {
            Ok(LedColor::Green)
        } else {
            Err(Error::InvalidColor(s.to_string()))
        }
    }
}

impl From<LedColor> for String {
    fn from(color: LedColor) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for LedColor {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// A single detection reported by the reader during a scan window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagReport {
    pub epc: Epc,
    pub antenna_port: u8,
    pub rssi: i16,
    /// Inventory-area payload captured alongside the EPC.
    pub external_data: Vec<u8>,
}

impl TagReport {
    #[must_use]
    pub fn new(epc: Epc, antenna_port: u8, rssi: i16) -> Self {
        Self {
            epc,
            antenna_port,
            rssi,
            external_data: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_external_data(mut self, data: Vec<u8>) -> Self {
        self.external_data = data;
        self
    }
}

/// Memory region captured with each inventory detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryArea {
    pub area: u8,
    pub start_word: u16,
    pub word_length: u16,
}

impl InventoryArea {
    #[must_use]
    pub const fn new(area: u8, start_word: u16, word_length: u16) -> Self {
        Self {
            area,
            start_word,
            word_length,
        }
    }
}

impl Default for InventoryArea {
    /// EPC plus USER, six words from word 0.
    fn default() -> Self {
        Self::new(
            INVENTORY_AREA_EPC_USER,
            INVENTORY_AREA_START_WORD,
            INVENTORY_AREA_WORD_LEN,
        )
    }
}

/// Inventory mode and parameter passed when a scan window opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMode {
    pub mode: u8,
    pub param: u8,
}

impl Default for InventoryMode {
    fn default() -> Self {
        Self {
            mode: INVENTORY_MODE_CONTINUOUS,
            param: INVENTORY_MODE_PARAM,
        }
    }
}
