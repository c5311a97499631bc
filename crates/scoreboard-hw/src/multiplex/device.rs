//! Time-multiplexed multi-digit display.

use super::bank::SegmentBank;
use super::message::DisplayMessage;
use super::worker::RefreshWorker;
use super::{lock, write};
use crate::line::{Line, OutputLine, Polarity};
use crate::segments::Glyph;
use crate::{Error, LedDisplay, Result};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-digit hold time that keeps a typical board bright without flicker.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_millis(7);

/// Raw logical state of every line on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinSnapshot {
    /// Segment lines A..G, then the decimal point if present.
    pub segments: Vec<bool>,
    /// Digit enable lines, leftmost digit first.
    pub digits: Vec<bool>,
}

/// Shared segment lines plus one enable line per digit.
#[derive(Debug)]
pub(super) struct Board {
    bank: SegmentBank,
    digits: Vec<Line>,
}

impl Board {
    pub(super) fn digit_count(&self) -> usize {
        self.digits.len()
    }

    /// Puts a glyph on the segment lines and enables one digit.
    pub(super) fn light(&mut self, digit: usize, glyph: &Glyph) -> Result<()> {
        self.bank.show(glyph)?;
        self.digits[digit].on()
    }

    pub(super) fn unlight(&mut self, digit: usize) -> Result<()> {
        self.digits[digit].off()
    }

    fn set_all(&mut self, on: bool) -> Result<()> {
        self.bank.set_all(on)?;
        for digit in &mut self.digits {
            digit.set(on)?;
        }
        Ok(())
    }

    fn snapshot(&self) -> PinSnapshot {
        PinSnapshot {
            segments: self.bank.values(),
            digits: self.digits.iter().map(Line::is_on).collect(),
        }
    }
}

/// Multi-digit seven-segment display sharing one set of segment lines.
///
/// Only one digit is enabled at a time; a background loop rotates through
/// them every `refresh_delay` so the whole message appears lit. Each
/// [`display`](Self::display) call replaces the loop, and the previous loop
/// is always joined before a new one touches the lines.
pub struct MultiplexedDisplay {
    board: Arc<Mutex<Board>>,
    frame: Arc<RwLock<Vec<Glyph>>>,
    message: DisplayMessage,
    worker: Option<RefreshWorker>,
    has_decimal_point: bool,
    digit_count: usize,
    refresh_delay: Duration,
    align_left: bool,
}

impl MultiplexedDisplay {
    /// Creates a display from 7 or 8 segment lines and at least 2 digit lines.
    ///
    /// Digit lines use the opposite polarity to the segments: on a common
    /// cathode board segments are active-high and digits are enabled low.
    pub fn new(
        segments: Vec<Box<dyn OutputLine>>,
        digits: Vec<Box<dyn OutputLine>>,
        polarity: Polarity,
    ) -> Result<Self> {
        if digits.len() < 2 {
            return Err(Error::Configuration(format!(
                "a multiplexed display must have more than 1 digit, got {}",
                digits.len()
            )));
        }

        let bank = SegmentBank::new(segments, polarity)?;
        let has_decimal_point = bank.has_decimal_point();
        let digit_count = digits.len();
        let digits = digits
            .into_iter()
            .map(|line| Line::new(line, polarity.inverted()))
            .collect();

        let mut board = Board { bank, digits };
        board.set_all(false)?;

        Ok(Self {
            board: Arc::new(Mutex::new(board)),
            frame: Arc::new(RwLock::new(vec![Glyph::BLANK; digit_count])),
            message: DisplayMessage::blank(digit_count),
            worker: None,
            has_decimal_point,
            digit_count,
            refresh_delay: DEFAULT_REFRESH_DELAY,
            align_left: false,
        })
    }

    /// Opens segment and digit lines on a GPIO chip.
    #[cfg(target_os = "linux")]
    pub fn open(
        chip: &str,
        segment_offsets: &[u32],
        digit_offsets: &[u32],
        polarity: Polarity,
    ) -> Result<Self> {
        let segments = crate::cdev::open_lines(chip, segment_offsets, "scoreboard-segments")?;
        let digits = crate::cdev::open_lines(chip, digit_offsets, "scoreboard-digits")?;
        let board = Self::new(segments, digits, polarity)?;
        info!(
            "Multiplexed board ready ({} digits, {} segment lines, {})",
            board.digit_count,
            segment_offsets.len(),
            polarity
        );
        Ok(board)
    }

    /// Sets the per-digit hold used by [`display`](Self::display).
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Sets the alignment used when shown through [`LedDisplay`].
    pub fn with_align_left(mut self, align_left: bool) -> Self {
        self.align_left = align_left;
        self
    }

    /// Shows a message using the configured refresh delay.
    pub fn display(&mut self, message: &str, align_left: bool) -> Result<()> {
        self.display_with_delay(message, align_left, self.refresh_delay)
    }

    /// Shows a message, holding each digit for `refresh_delay`.
    ///
    /// The message is formatted and encoded before anything else happens, so
    /// an oversized message or unknown character fails without disturbing
    /// what is currently shown.
    pub fn display_with_delay(
        &mut self,
        message: &str,
        align_left: bool,
        refresh_delay: Duration,
    ) -> Result<()> {
        let formatted = DisplayMessage::format(
            message,
            self.digit_count,
            self.has_decimal_point,
            align_left,
        )?;
        let glyphs = {
            let board = lock(&self.board);
            formatted
                .cells()
                .iter()
                .map(|cell| board.bank.glyph(cell.ch, cell.decimal_point))
                .collect::<Result<Vec<_>>>()?
        };

        self.stop()?;
        *write(&self.frame) = glyphs;
        self.worker = Some(RefreshWorker::spawn(
            self.board.clone(),
            self.frame.clone(),
            refresh_delay,
        )?);
        debug!("Displaying {:?}", formatted.to_string());
        self.message = formatted;
        Ok(())
    }

    /// Stops the refresh loop, leaving every digit disabled.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            worker.stop()?;
        }
        Ok(())
    }

    /// Returns true while the refresh loop is running.
    pub fn is_refreshing(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Returns the last message passed to [`display`](Self::display).
    pub fn message(&self) -> &DisplayMessage {
        &self.message
    }

    /// Returns the number of digits.
    pub fn digit_count(&self) -> usize {
        self.digit_count
    }

    /// Returns true if the segment lines include a decimal point.
    pub fn has_decimal_point(&self) -> bool {
        self.has_decimal_point
    }

    /// Returns the per-digit hold time.
    pub fn refresh_delay(&self) -> Duration {
        self.refresh_delay
    }

    /// Creates or replaces a character layout for later messages.
    pub fn set_char_layout(&mut self, key: &str, layout: &[bool]) -> Result<()> {
        lock(&self.board).bank.set_char_layout(key, layout)
    }

    /// Returns the raw state of every segment and digit line.
    pub fn value(&self) -> PinSnapshot {
        lock(&self.board).snapshot()
    }

    /// Stops multiplexing and drives every line from a snapshot.
    pub fn set_value(&mut self, value: &PinSnapshot) -> Result<()> {
        if value.digits.len() != self.digit_count {
            return Err(Error::ValueCount {
                expected: self.digit_count,
                actual: value.digits.len(),
            });
        }
        let segment_count = lock(&self.board).bank.line_count();
        if value.segments.len() != segment_count {
            return Err(Error::ValueCount {
                expected: segment_count,
                actual: value.segments.len(),
            });
        }
        self.stop()?;
        let mut board = lock(&self.board);
        board.bank.set_values(&value.segments)?;
        for (digit, &on) in board.digits.iter_mut().zip(&value.digits) {
            digit.set(on)?;
        }
        Ok(())
    }

    fn fill(&mut self, on: bool) -> Result<()> {
        self.stop()?;
        lock(&self.board).set_all(on)
    }
}

impl LedDisplay for MultiplexedDisplay {
    fn show(&mut self, text: &str) -> Result<()> {
        self.display(text, self.align_left)
    }

    fn on(&mut self) -> Result<()> {
        self.fill(true)
    }

    fn off(&mut self) -> Result<()> {
        self.fill(false)
    }

    fn digit_count(&self) -> usize {
        self.digit_count
    }
}

impl Drop for MultiplexedDisplay {
    fn drop(&mut self) {
        if let Err(e) = self.fill(false) {
            warn!("Failed to blank display on shutdown: {}", e);
        }
    }
}
