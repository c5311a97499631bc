//! Scoreboard Display Hardware Library
//!
//! Drives seven-segment LED digit boards from GPIO output lines: a serial
//! board fed through daisy-chained shift registers, and a parallel board
//! whose digits share segment lines and are lit one at a time.

pub mod error;
pub mod line;
pub mod mock;
pub mod multiplex;
pub mod segments;
pub mod shift;

#[cfg(target_os = "linux")]
pub mod cdev;

pub use error::{Error, Result};
pub use line::{Line, OutputLine, Polarity};
pub use mock::{LineEvent, MockBus, MockLine};
pub use multiplex::{
    Cell, DisplayMessage, MultiplexedDisplay, PinSnapshot, SegmentBank, DEFAULT_REFRESH_DELAY,
};
pub use segments::{ByteSegmentTable, Glyph, SegmentLayout, SegmentLayouts};
pub use shift::{ShiftPins, ShiftRegisterDisplay};

/// A digit board that can show short text.
pub trait LedDisplay: Send {
    /// Shows text, padded or rejected according to the board's rules.
    fn show(&mut self, text: &str) -> Result<()>;

    /// Lights every segment of every digit.
    fn on(&mut self) -> Result<()>;

    /// Blanks the board.
    fn off(&mut self) -> Result<()>;

    /// Returns the number of physical digits.
    fn digit_count(&self) -> usize;
}
