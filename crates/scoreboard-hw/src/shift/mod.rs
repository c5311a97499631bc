//! Shift-register digit board.
//!
//! Drives a chain of serial-in, parallel-out registers (one per digit) over
//! three lines: clock, data and latch.

mod device;

pub use device::{ShiftPins, ShiftRegisterDisplay};
