use thiserror::Error;

/// Errors raised on the control side of the crate.
///
/// Nothing on the audio thread returns these; realtime code falls back to
/// silence or defaults instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("settings document error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("effect chain command queue is full")]
    ChainQueueFull,

    #[error("effect chain edit rejected: {0}")]
    ChainEdit(String),
}

pub type Result<T> = std::result::Result<T, Error>;
