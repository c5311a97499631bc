//! Character to segment encodings.
//!
//! Two tables live here, one per driver:
//! - [`ByteSegmentTable`] packs a glyph into one shift-register byte using the
//!   scoreboard's wiring. Unknown characters render blank.
//! - [`SegmentLayouts`] maps a glyph to seven segment states (A..G) for boards
//!   with one line per segment. Unknown characters are an error.
//!
//! Both tables normalize lookups and registrations to upper case, and both
//! accept new or replacement entries at runtime. Neither is internally
//! synchronized: callers that share a table across threads must guard it.

use crate::{Error, Result};
use std::collections::HashMap;

/// Segment A (top) bit on the shift-register board.
pub const SEG_A: u8 = 1 << 0;
/// Segment B (upper right) bit.
pub const SEG_B: u8 = 1 << 6;
/// Segment C (lower right) bit.
pub const SEG_C: u8 = 1 << 5;
/// Segment D (bottom) bit.
pub const SEG_D: u8 = 1 << 4;
/// Segment E (lower left) bit.
pub const SEG_E: u8 = 1 << 3;
/// Segment F (upper left) bit.
pub const SEG_F: u8 = 1 << 1;
/// Segment G (middle) bit.
pub const SEG_G: u8 = 1 << 2;
/// Decimal point bit.
pub const SEG_DP: u8 = 1 << 7;

/// Mask shown for characters without an entry.
pub const BLANK: u8 = 0;

const DEFAULT_MASKS: [(char, u8); 12] = [
    ('0', SEG_A | SEG_B | SEG_C | SEG_D | SEG_E | SEG_F),
    ('1', SEG_B | SEG_C),
    ('2', SEG_A | SEG_B | SEG_D | SEG_E | SEG_G),
    ('3', SEG_A | SEG_B | SEG_C | SEG_D | SEG_G),
    ('4', SEG_F | SEG_G | SEG_B | SEG_C),
    ('5', SEG_A | SEG_F | SEG_G | SEG_C | SEG_D),
    ('6', SEG_A | SEG_F | SEG_G | SEG_E | SEG_C | SEG_D),
    ('7', SEG_A | SEG_B | SEG_C),
    ('8', SEG_A | SEG_B | SEG_C | SEG_D | SEG_E | SEG_F | SEG_G),
    ('9', SEG_A | SEG_B | SEG_C | SEG_D | SEG_F | SEG_G),
    (' ', BLANK),
    ('-', SEG_G),
];

/// Byte-per-glyph encoding for the shift-register board.
#[derive(Debug, Clone)]
pub struct ByteSegmentTable {
    masks: HashMap<char, u8>,
}

impl Default for ByteSegmentTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSegmentTable {
    /// Creates a table holding the digits, space and minus.
    pub fn new() -> Self {
        Self {
            masks: DEFAULT_MASKS.into_iter().collect(),
        }
    }

    /// Returns the mask for a character, or [`BLANK`] if it has none.
    pub fn encode(&self, ch: char) -> u8 {
        self.masks
            .get(&ch.to_ascii_uppercase())
            .copied()
            .unwrap_or(BLANK)
    }

    /// Inserts or replaces the mask for a character.
    pub fn register(&mut self, ch: char, mask: u8) {
        self.masks.insert(ch.to_ascii_uppercase(), mask);
    }

    /// Returns true if the character has its own entry.
    pub fn contains(&self, ch: char) -> bool {
        self.masks.contains_key(&ch.to_ascii_uppercase())
    }
}

/// Number of segments in a layout (A..G, decimal point excluded).
pub const SEGMENT_COUNT: usize = 7;

/// Segment states in A, B, C, D, E, F, G order.
pub type SegmentLayout = [bool; SEGMENT_COUNT];

/// A layout plus its decimal point, as shown on one digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Glyph {
    /// Segment states A..G.
    pub segments: SegmentLayout,
    /// Decimal point state.
    pub decimal_point: bool,
}

impl Glyph {
    /// All segments and the decimal point off.
    pub const BLANK: Glyph = Glyph {
        segments: [false; SEGMENT_COUNT],
        decimal_point: false,
    };
}

// Bit 6 is segment A, bit 0 is segment G.
const DEFAULT_LAYOUTS: [(char, u8); 39] = [
    ('1', 0b0110000),
    ('2', 0b1101101),
    ('3', 0b1111001),
    ('4', 0b0110011),
    ('5', 0b1011011),
    ('6', 0b1011111),
    ('7', 0b1110000),
    ('8', 0b1111111),
    ('9', 0b1111011),
    ('0', 0b1111110),
    ('A', 0b1110111),
    ('B', 0b0011111),
    ('C', 0b1001110),
    ('D', 0b0111101),
    ('E', 0b1001111),
    ('F', 0b1000111),
    ('G', 0b1011110),
    ('H', 0b0110111),
    ('I', 0b0000110),
    ('J', 0b0111100),
    ('K', 0b1010111),
    ('L', 0b0001110),
    ('M', 0b1010100),
    ('N', 0b1110110),
    ('O', 0b1111110),
    ('P', 0b1100111),
    ('Q', 0b1101011),
    ('R', 0b1100110),
    ('S', 0b1011011),
    ('T', 0b0001111),
    ('U', 0b0011100),
    ('V', 0b0111110),
    ('W', 0b0101010),
    ('X', 0b0110111),
    ('Y', 0b0111011),
    ('Z', 0b1101101),
    ('-', 0b0000001),
    (' ', 0b0000000),
    ('=', 0b0001001),
];

/// Expands a packed A..G bit pattern into a layout.
pub fn layout_from_bits(bits: u8) -> SegmentLayout {
    std::array::from_fn(|i| bits & (1 << (SEGMENT_COUNT - 1 - i)) != 0)
}

/// Seven-segment layouts for boards with one line per segment.
#[derive(Debug, Clone)]
pub struct SegmentLayouts {
    layouts: HashMap<char, SegmentLayout>,
}

impl Default for SegmentLayouts {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentLayouts {
    /// Creates a table holding digits, letters, space, minus and equals.
    pub fn new() -> Self {
        Self {
            layouts: DEFAULT_LAYOUTS
                .into_iter()
                .map(|(ch, bits)| (ch, layout_from_bits(bits)))
                .collect(),
        }
    }

    /// Returns the layout for a character.
    pub fn encode(&self, ch: char) -> Result<SegmentLayout> {
        self.layouts
            .get(&ch.to_ascii_uppercase())
            .copied()
            .ok_or(Error::UnknownCharacter(ch))
    }

    /// Inserts or replaces the layout for a character.
    pub fn register(&mut self, ch: char, layout: SegmentLayout) {
        self.layouts.insert(ch.to_ascii_uppercase(), layout);
    }

    /// Validates and registers a layout given as loose values.
    ///
    /// The key must be exactly one character and the layout exactly seven
    /// segment states.
    pub fn register_str(&mut self, key: &str, layout: &[bool]) -> Result<()> {
        let mut chars = key.chars();
        let ch = match (chars.next(), chars.next()) {
            (Some(ch), None) => ch,
            _ => {
                return Err(Error::InvalidLayout(format!(
                    "only a single character can be used in a layout, got {:?}",
                    key
                )))
            }
        };
        let layout: SegmentLayout = layout.try_into().map_err(|_| {
            Error::InvalidLayout(format!(
                "a character layout must have {} segments, got {}",
                SEGMENT_COUNT,
                layout.len()
            ))
        })?;
        self.register(ch, layout);
        Ok(())
    }

    /// Returns true if the character has a layout.
    pub fn contains(&self, ch: char) -> bool {
        self.layouts.contains_key(&ch.to_ascii_uppercase())
    }
}
