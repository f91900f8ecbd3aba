use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Encoding errors
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid access password: {0}")]
    InvalidPassword(String),

    // Tag memory errors
    #[error("Invalid bank code: {0}")]
    InvalidBank(u8),

    #[error("Invalid bank address: {0}")]
    InvalidAddress(String),

    // Actuation errors
    #[error("Invalid LED color: {0} (expected RED or GREEN)")]
    InvalidColor(String),
}

pub type Result<T> = std::result::Result<T, Error>;
