//! Error types for the scoreboard display drivers.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when driving a display.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid line or digit count at construction.
    #[error("Invalid display configuration: {0}")]
    Configuration(String),

    /// A message character has no segment layout.
    #[error("There is no layout for character {0:?}")]
    UnknownCharacter(char),

    /// Formatted message does not fit on the board.
    #[error("Message {message:?} is too long for {digits} digits")]
    MessageTooLong { message: String, digits: usize },

    /// A line write failed at the physical layer.
    #[error("Line {line} fault: {reason}")]
    Hardware { line: String, reason: String },

    /// Rejected custom character layout.
    #[error("Invalid character layout: {0}")]
    InvalidLayout(String),

    /// Decimal point accessed on a 7-line display.
    #[error("There is no 8th line for the decimal point")]
    NoDecimalPoint,

    /// Raw line snapshot has the wrong number of values.
    #[error("Expected {expected} values, got {actual}")]
    ValueCount { expected: usize, actual: usize },

    /// The refresh worker panicked before it could be joined.
    #[error("Display refresh worker panicked")]
    WorkerPanicked,
}

impl Error {
    /// Builds a hardware fault for the named line.
    pub fn hardware(line: &str, reason: impl std::fmt::Display) -> Self {
        Error::Hardware {
            line: line.to_string(),
            reason: reason.to_string(),
        }
    }
}
