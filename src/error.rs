use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store address {addr} out of range (store holds {size} bytes)")]
    AddressOutOfRange { addr: u16, size: u16 },

    #[error("Timing config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Timing config error: {field} must be at least one tick")]
    InvalidTiming { field: &'static str },

    #[error("could not install diagnostic logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, Error>;
