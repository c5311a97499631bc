//! Message formatting for multi-digit displays.

use crate::{Error, Result};

/// One digit position: a character and its decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Character shown on the digit.
    pub ch: char,
    /// Whether the digit's decimal point is lit.
    pub decimal_point: bool,
}

impl Cell {
    /// An unlit digit.
    pub const BLANK: Cell = Cell {
        ch: ' ',
        decimal_point: false,
    };

    /// Creates a cell without a decimal point.
    pub fn new(ch: char) -> Self {
        Self {
            ch,
            decimal_point: false,
        }
    }
}

/// A message laid out over exactly one cell per physical digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    cells: Vec<Cell>,
}

impl DisplayMessage {
    /// An all-blank message for `digits` positions.
    pub fn blank(digits: usize) -> Self {
        Self {
            cells: vec![Cell::BLANK; digits],
        }
    }

    /// Lays a raw string out over `digits` positions.
    ///
    /// When the board has decimal points, a `.` lights the decimal point of
    /// the preceding character instead of taking a digit. A `.` at the start
    /// of the message, or straight after another `.`, gets a blank digit of
    /// its own. Without decimal points `.` is an ordinary character.
    pub fn format(
        message: &str,
        digits: usize,
        decimal_points: bool,
        align_left: bool,
    ) -> Result<Self> {
        let mut cells: Vec<Cell> = Vec::with_capacity(digits);
        for ch in message.chars() {
            if decimal_points && ch == '.' {
                match cells.last_mut() {
                    Some(last) if !last.decimal_point => last.decimal_point = true,
                    _ => cells.push(Cell {
                        ch: ' ',
                        decimal_point: true,
                    }),
                }
            } else {
                cells.push(Cell::new(ch));
            }
        }

        if cells.len() > digits {
            return Err(Error::MessageTooLong {
                message: message.to_string(),
                digits,
            });
        }

        let padding = std::iter::repeat(Cell::BLANK).take(digits - cells.len());
        let cells = if align_left {
            cells.into_iter().chain(padding).collect()
        } else {
            padding.chain(cells).collect()
        };
        Ok(Self { cells })
    }

    /// Returns the cells, one per digit.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns the number of digit positions.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the message covers no digits.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl std::fmt::Display for DisplayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for cell in &self.cells {
            write!(f, "{}", cell.ch)?;
            if cell.decimal_point {
                write!(f, ".")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(message: &DisplayMessage) -> Vec<(char, bool)> {
        message
            .cells()
            .iter()
            .map(|c| (c.ch, c.decimal_point))
            .collect()
    }

    #[test]
    fn test_decimal_points_fold_into_previous_digit() {
        let message = DisplayMessage::format("1.2.3", 3, true, true).unwrap();
        assert_eq!(
            cells(&message),
            vec![('1', true), ('2', true), ('3', false)]
        );
    }

    #[test]
    fn test_leading_and_repeated_decimal_points() {
        let message = DisplayMessage::format(".5", 3, true, true).unwrap();
        assert_eq!(cells(&message), vec![(' ', true), ('5', false), (' ', false)]);

        let message = DisplayMessage::format("1..2", 3, true, true).unwrap();
        assert_eq!(cells(&message), vec![('1', true), (' ', true), ('2', false)]);
    }

    #[test]
    fn test_dot_is_a_character_without_decimal_points() {
        let message = DisplayMessage::format("1.2", 3, false, true).unwrap();
        assert_eq!(cells(&message), vec![('1', false), ('.', false), ('2', false)]);
        assert!(DisplayMessage::format("1.2.3", 3, false, true).is_err());
    }

    #[test]
    fn test_alignment_padding() {
        let left = DisplayMessage::format("ab", 4, true, true).unwrap();
        assert_eq!(left.to_string(), "ab  ");

        let right = DisplayMessage::format("ab", 4, true, false).unwrap();
        assert_eq!(right.to_string(), "  ab");
    }

    #[test]
    fn test_length_always_matches_digits() {
        for message in ["", "1", "12", "1.2", "..", "9.9.9.9."] {
            let formatted = DisplayMessage::format(message, 4, true, false).unwrap();
            assert_eq!(formatted.len(), 4, "message {:?}", message);
        }
    }

    #[test]
    fn test_too_long() {
        let err = DisplayMessage::format("12345", 4, true, true).unwrap_err();
        assert!(matches!(err, Error::MessageTooLong { digits: 4, .. }));

        // Decimal points do not count towards the length
        assert!(DisplayMessage::format("1.2.3.4.", 4, true, true).is_ok());
    }

    #[test]
    fn test_blank() {
        let message = DisplayMessage::blank(3);
        assert_eq!(message.to_string(), "   ");
        assert!(!message.is_empty());
    }
}
