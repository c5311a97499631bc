//! Bit-banged shift-register protocol.

use crate::line::{Line, OutputLine, Polarity};
use crate::segments::ByteSegmentTable;
use crate::{Error, LedDisplay, Result};
use tracing::{debug, info};

/// Line offsets for the three control lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPins {
    /// Shift clock, data is sampled on its rising edge.
    pub clock: u32,
    /// Storage register latch.
    pub latch: u32,
    /// Serial data.
    pub data: u32,
}

impl Default for ShiftPins {
    fn default() -> Self {
        Self {
            clock: 25,
            latch: 23,
            data: 24,
        }
    }
}

/// Digit board fed through daisy-chained shift registers.
///
/// Bytes are shifted out for the last digit first, most significant bit
/// first, and the latch is pulsed once after the whole frame, so the board
/// only ever shows complete frames.
pub struct ShiftRegisterDisplay {
    clock: Line,
    latch: Line,
    data: Line,
    digits: usize,
    table: ByteSegmentTable,
    value: String,
}

impl ShiftRegisterDisplay {
    /// Creates a display over already-opened lines and blanks the board.
    ///
    /// `polarity` applies to the data line only. Clock and latch are always
    /// active high, since the registers act on their physical rising edges.
    pub fn new(
        clock: Box<dyn OutputLine>,
        latch: Box<dyn OutputLine>,
        data: Box<dyn OutputLine>,
        digits: usize,
        polarity: Polarity,
    ) -> Result<Self> {
        if digits == 0 {
            return Err(Error::Configuration(
                "a shift register board needs at least 1 digit".to_string(),
            ));
        }

        let mut display = Self {
            clock: Line::new(clock, Polarity::ActiveHigh),
            latch: Line::new(latch, Polarity::ActiveHigh),
            data: Line::new(data, polarity),
            digits,
            table: ByteSegmentTable::new(),
            value: String::new(),
        };
        display.render("")?;
        Ok(display)
    }

    /// Opens the control lines on a GPIO chip.
    #[cfg(target_os = "linux")]
    pub fn open(chip: &str, pins: ShiftPins, digits: usize, polarity: Polarity) -> Result<Self> {
        let mut lines = crate::cdev::open_lines(
            chip,
            &[pins.clock, pins.latch, pins.data],
            "scoreboard-shift",
        )?
        .into_iter();
        let (Some(clock), Some(latch), Some(data)) = (lines.next(), lines.next(), lines.next())
        else {
            return Err(Error::Configuration(
                "expected clock, latch and data lines".to_string(),
            ));
        };
        let display = Self::new(clock, latch, data, digits, polarity)?;
        info!(
            "Shift register board ready ({} digits, clock={}, latch={}, data={})",
            digits, pins.clock, pins.latch, pins.data
        );
        Ok(display)
    }

    /// Pads or truncates a value to the board width.
    ///
    /// Short values are right-aligned with blanks; long values keep their
    /// leading characters, matching what overflows out of the register chain.
    fn frame(&self, value: &str) -> String {
        let kept: String = value.chars().take(self.digits).collect();
        format!("{:>width$}", kept, width = self.digits)
    }

    /// Renders a value on the board.
    pub fn render(&mut self, value: &str) -> Result<()> {
        let frame = self.frame(value);
        let masks: Vec<u8> = frame.chars().rev().map(|ch| self.table.encode(ch)).collect();
        self.shift_frame(&masks)?;
        debug!("Latched {:?}", frame);
        self.value = frame;
        Ok(())
    }

    /// Shifts out one byte per digit, then latches them all at once.
    fn shift_frame(&mut self, masks: &[u8]) -> Result<()> {
        for &mask in masks {
            self.shift_byte(mask)?;
        }
        self.latch.off()?;
        self.latch.on()?;
        Ok(())
    }

    fn shift_byte(&mut self, mask: u8) -> Result<()> {
        for bit in 0..8 {
            self.clock.off()?;
            self.data.set(mask & (1 << (7 - bit)) != 0)?;
            self.clock.on()?;
        }
        Ok(())
    }

    /// Returns the last fully latched frame.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the number of digits on the board.
    pub fn digits(&self) -> usize {
        self.digits
    }

    /// Returns the encoding table for registering custom characters.
    pub fn table_mut(&mut self) -> &mut ByteSegmentTable {
        &mut self.table
    }
}

impl LedDisplay for ShiftRegisterDisplay {
    fn show(&mut self, text: &str) -> Result<()> {
        self.render(text)
    }

    fn on(&mut self) -> Result<()> {
        self.shift_frame(&vec![0xFF; self.digits])?;
        self.value.clear();
        Ok(())
    }

    fn off(&mut self) -> Result<()> {
        self.render("")
    }

    fn digit_count(&self) -> usize {
        self.digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{LineEvent, MockBus};

    fn board(bus: &MockBus, digits: usize) -> ShiftRegisterDisplay {
        let display = ShiftRegisterDisplay::new(
            bus.boxed("clock"),
            bus.boxed("latch"),
            bus.boxed("data"),
            digits,
            Polarity::ActiveHigh,
        )
        .unwrap();
        bus.clear();
        display
    }

    /// Reconstructs the bytes clocked in on rising edges.
    fn shifted_bytes(events: &[LineEvent]) -> Vec<u8> {
        let mut data = false;
        let mut bits = Vec::new();
        for event in events {
            match event.line.as_str() {
                "data" => data = event.high,
                "clock" if event.high => bits.push(data),
                _ => {}
            }
        }
        bits.chunks(8)
            .map(|byte| byte.iter().fold(0u8, |acc, &b| (acc << 1) | u8::from(b)))
            .collect()
    }

    /// Models a register chain: bits shift in on physical clock rising
    /// edges and are copied to the outputs on a latch rising edge.
    fn latched_bytes(events: &[LineEvent]) -> Vec<u8> {
        let mut levels = (false, false, false);
        let mut shifted = Vec::new();
        let mut latched = Vec::new();
        for event in events {
            let (clock, latch, data) = &mut levels;
            match event.line.as_str() {
                "clock" => {
                    if event.high && !*clock {
                        shifted.push(*data);
                    }
                    *clock = event.high;
                }
                "latch" => {
                    if event.high && !*latch {
                        latched = shifted.clone();
                    }
                    *latch = event.high;
                }
                "data" => *data = event.high,
                _ => {}
            }
        }
        latched
            .chunks(8)
            .map(|byte| byte.iter().fold(0u8, |acc, &b| (acc << 1) | u8::from(b)))
            .collect()
    }

    #[test]
    fn test_zero_digits_rejected() {
        let bus = MockBus::new();
        let result = ShiftRegisterDisplay::new(
            bus.boxed("clock"),
            bus.boxed("latch"),
            bus.boxed("data"),
            0,
            Polarity::ActiveHigh,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_construction_blanks_board() {
        let bus = MockBus::new();
        let display = ShiftRegisterDisplay::new(
            bus.boxed("clock"),
            bus.boxed("latch"),
            bus.boxed("data"),
            4,
            Polarity::ActiveHigh,
        )
        .unwrap();
        assert_eq!(display.value(), "    ");
        assert_eq!(shifted_bytes(&bus.events()), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_render_shifts_last_digit_first_msb_first() {
        let bus = MockBus::new();
        let mut display = board(&bus, 2);

        display.render("12").unwrap();

        let table = ByteSegmentTable::new();
        assert_eq!(
            shifted_bytes(&bus.events()),
            vec![table.encode('2'), table.encode('1')]
        );
        assert_eq!(
            latched_bytes(&bus.events()),
            vec![table.encode('2'), table.encode('1')]
        );
        assert_eq!(display.value(), "12");
    }

    #[test]
    fn test_latch_pulses_once_after_all_bits() {
        let bus = MockBus::new();
        let mut display = board(&bus, 2);

        display.render("12").unwrap();

        let events = bus.events();
        let latch_positions: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.line == "latch")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(bus.writes("latch"), vec![false, true]);
        // 16 bits, each clock low + data + clock high
        assert_eq!(latch_positions, vec![48, 49]);
        assert_eq!(events.len(), 50);

        let rising_edges = events
            .iter()
            .filter(|e| e.line == "clock" && e.high)
            .count();
        assert_eq!(rising_edges, 16);
    }

    #[test]
    fn test_bit_sequence_per_clock_pulse() {
        let bus = MockBus::new();
        let mut display = board(&bus, 1);

        display.render("1").unwrap();

        let events = bus.events();
        for bit in 0..8 {
            let pulse = &events[bit * 3..bit * 3 + 3];
            assert_eq!(pulse[0].line, "clock");
            assert!(!pulse[0].high);
            assert_eq!(pulse[1].line, "data");
            assert_eq!(pulse[2].line, "clock");
            assert!(pulse[2].high);
        }
    }

    #[test]
    fn test_pad_and_truncate() {
        let bus = MockBus::new();
        let mut display = board(&bus, 4);

        display.render("7").unwrap();
        assert_eq!(display.value(), "   7");

        display.render("123456").unwrap();
        assert_eq!(display.value(), "1234");
    }

    #[test]
    fn test_unknown_characters_render_blank() {
        let bus = MockBus::new();
        let mut display = board(&bus, 2);

        display.render("x9").unwrap();

        let table = ByteSegmentTable::new();
        assert_eq!(shifted_bytes(&bus.events()), vec![table.encode('9'), 0]);
    }

    #[test]
    fn test_active_low_inverts_data_only() {
        let bus = MockBus::new();
        let mut display = ShiftRegisterDisplay::new(
            bus.boxed("clock"),
            bus.boxed("latch"),
            bus.boxed("data"),
            1,
            Polarity::ActiveLow,
        )
        .unwrap();
        bus.clear();

        display.render("1").unwrap();

        // Control lines keep their physical sense
        assert_eq!(bus.writes("latch"), vec![false, true]);
        assert_eq!(bus.level("clock"), Some(true));
        let table = ByteSegmentTable::new();
        assert_eq!(latched_bytes(&bus.events()), vec![!table.encode('1')]);
    }

    #[test]
    fn test_fault_abandons_frame() {
        let bus = MockBus::new();
        let mut display = board(&bus, 2);
        display.render("42").unwrap();
        bus.clear();

        bus.fail("data");
        let err = display.render("13").unwrap_err();
        assert!(matches!(err, Error::Hardware { .. }));
        // Nothing was latched and the last good frame is kept
        assert!(bus.writes("latch").is_empty());
        assert_eq!(display.value(), "42");
    }

    #[test]
    fn test_on_and_off() {
        let bus = MockBus::new();
        let mut display = board(&bus, 2);

        display.on().unwrap();
        assert_eq!(shifted_bytes(&bus.events()), vec![0xFF, 0xFF]);

        bus.clear();
        display.off().unwrap();
        assert_eq!(shifted_bytes(&bus.events()), vec![0, 0]);
        assert_eq!(display.digit_count(), 2);
    }

    #[test]
    fn test_custom_character() {
        let bus = MockBus::new();
        let mut display = board(&bus, 1);
        display.table_mut().register('h', 0b0110_1110);

        display.render("H").unwrap();
        assert_eq!(shifted_bytes(&bus.events()), vec![0b0110_1110]);
    }
}
