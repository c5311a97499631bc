//! Segment lines of a single seven-segment digit.

use crate::line::{Line, OutputLine, Polarity};
use crate::segments::{Glyph, SegmentLayout, SegmentLayouts};
use crate::{Error, Result};

/// Seven segment lines (A..G) plus an optional decimal point line.
///
/// On its own this drives a single-digit display. The multiplexed driver
/// shares one bank across all of its digits.
#[derive(Debug)]
pub struct SegmentBank {
    segments: Vec<Line>,
    decimal_point: Option<Line>,
    layouts: SegmentLayouts,
}

impl SegmentBank {
    /// Creates a bank from 7 or 8 lines in A, B, C, D, E, F, G, DP order.
    pub fn new(lines: Vec<Box<dyn OutputLine>>, polarity: Polarity) -> Result<Self> {
        let has_decimal_point = match lines.len() {
            7 => false,
            8 => true,
            n => {
                return Err(Error::Configuration(format!(
                    "a seven segment display must have 7 or 8 lines, got {}",
                    n
                )))
            }
        };

        let mut segments: Vec<Line> = lines
            .into_iter()
            .map(|line| Line::new(line, polarity))
            .collect();
        let decimal_point = if has_decimal_point {
            segments.pop()
        } else {
            None
        };

        Ok(Self {
            segments,
            decimal_point,
            layouts: SegmentLayouts::new(),
        })
    }

    /// Returns true if the bank has a decimal point line.
    pub fn has_decimal_point(&self) -> bool {
        self.decimal_point.is_some()
    }

    /// Returns the number of lines, including the decimal point.
    pub fn line_count(&self) -> usize {
        self.segments.len() + usize::from(self.has_decimal_point())
    }

    /// Returns the character layouts.
    pub fn layouts(&self) -> &SegmentLayouts {
        &self.layouts
    }

    /// Creates or replaces a character layout.
    pub fn set_char_layout(&mut self, key: &str, layout: &[bool]) -> Result<()> {
        self.layouts.register_str(key, layout)
    }

    /// Looks up the glyph for a character and decimal point.
    pub fn glyph(&self, ch: char, decimal_point: bool) -> Result<Glyph> {
        Ok(Glyph {
            segments: self.layouts.encode(ch)?,
            decimal_point: decimal_point && self.has_decimal_point(),
        })
    }

    /// Drives a glyph onto the segment lines.
    pub fn show(&mut self, glyph: &Glyph) -> Result<()> {
        self.show_layout(&glyph.segments)?;
        if let Some(dp) = self.decimal_point.as_mut() {
            dp.set(glyph.decimal_point)?;
        }
        Ok(())
    }

    fn show_layout(&mut self, layout: &SegmentLayout) -> Result<()> {
        for (line, &on) in self.segments.iter_mut().zip(layout.iter()) {
            line.set(on)?;
        }
        Ok(())
    }

    /// Displays a single character, leaving the decimal point alone.
    pub fn display_char(&mut self, ch: char) -> Result<()> {
        let layout = self.layouts.encode(ch)?;
        self.show_layout(&layout)
    }

    /// Displays a hex digit (0-F).
    pub fn display_hex(&mut self, value: u8) -> Result<()> {
        let ch = char::from_digit(u32::from(value), 16).ok_or_else(|| {
            Error::InvalidLayout(format!("{} is not a single hex digit", value))
        })?;
        self.display_char(ch)
    }

    /// Returns the decimal point state.
    pub fn decimal_point(&self) -> Result<bool> {
        self.decimal_point
            .as_ref()
            .map(Line::is_on)
            .ok_or(Error::NoDecimalPoint)
    }

    /// Sets the decimal point state.
    pub fn set_decimal_point(&mut self, on: bool) -> Result<()> {
        self.decimal_point
            .as_mut()
            .ok_or(Error::NoDecimalPoint)?
            .set(on)
    }

    /// Drives every line, including the decimal point, to one state.
    pub fn set_all(&mut self, on: bool) -> Result<()> {
        for line in self.lines_mut() {
            line.set(on)?;
        }
        Ok(())
    }

    /// Lights every segment and the decimal point.
    pub fn on(&mut self) -> Result<()> {
        self.set_all(true)
    }

    /// Blanks the digit.
    pub fn off(&mut self) -> Result<()> {
        self.set_all(false)
    }

    /// Returns the logical state of every line, decimal point last.
    pub fn values(&self) -> Vec<bool> {
        self.segments
            .iter()
            .chain(self.decimal_point.iter())
            .map(Line::is_on)
            .collect()
    }

    /// Drives every line from a snapshot in [`values`](Self::values) order.
    pub fn set_values(&mut self, values: &[bool]) -> Result<()> {
        let expected = self.line_count();
        if values.len() != expected {
            return Err(Error::ValueCount {
                expected,
                actual: values.len(),
            });
        }
        for (line, &on) in self.lines_mut().zip(values) {
            line.set(on)?;
        }
        Ok(())
    }

    fn lines_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.segments.iter_mut().chain(self.decimal_point.iter_mut())
    }
}
