use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Frame errors
    #[error("Invalid frame format: {0}")]
    FrameFormat(String),

    #[error("Invalid card id: {0}")]
    InvalidCardId(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Frame overflow: {len} characters exceeds limit of {max}")]
    FrameOverflow { len: usize, max: usize },

    // Display errors
    #[error("Invalid display line {line} (max {max})")]
    InvalidLine { line: usize, max: usize },

    // State machine errors
    #[error("Invalid phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
