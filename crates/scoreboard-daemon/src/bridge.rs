//! Forwards scoreboard text to the configured LED board.

use scoreboard_hw::{LedDisplay, MockBus, Polarity, ShiftRegisterDisplay};
use tracing::{debug, info, warn};

use crate::config::{DisplayConfig, DriverKind};

/// Best-effort link between the score model and an LED board.
///
/// A board that failed to open stays absent for the life of the process,
/// and a failing write is logged and dropped. Scoring never sees either.
pub struct ScoreBridge {
    display: Option<Box<dyn LedDisplay>>,
}

impl ScoreBridge {
    /// Wraps an already built board, or none.
    pub fn new(display: Option<Box<dyn LedDisplay>>) -> Self {
        Self { display }
    }

    /// A bridge with no board attached.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Builds the configured board once.
    pub fn from_config(config: &DisplayConfig) -> Self {
        match build_display(config) {
            Ok(Some(board)) => {
                let digits = board.digit_count();
                info!(
                    "LED board ready ({} driver, {} digits)",
                    config.driver, digits
                );
                Self::new(Some(board))
            }
            Ok(None) => {
                info!("No LED board configured");
                Self::disabled()
            }
            Err(e) => {
                warn!(
                    "LED board unavailable: {}. Continuing without a display.",
                    e
                );
                Self::disabled()
            }
        }
    }

    /// Returns true if a board is attached.
    pub fn is_enabled(&self) -> bool {
        self.display.is_some()
    }

    /// Shows text on the board, if there is one.
    pub fn push(&mut self, text: &str) {
        let Some(display) = self.display.as_mut() else {
            return;
        };
        match display.show(text) {
            Ok(()) => debug!("LED board shows {:?}", text),
            Err(e) => warn!("Failed to update LED board with {:?}: {}", text, e),
        }
    }

    /// Blanks the board, if there is one.
    pub fn clear(&mut self) {
        if let Some(display) = self.display.as_mut() {
            if let Err(e) = display.off() {
                warn!("Failed to blank LED board: {}", e);
            }
        }
    }
}

fn build_display(config: &DisplayConfig) -> scoreboard_hw::Result<Option<Box<dyn LedDisplay>>> {
    let polarity = Polarity::from_active_high(config.active_high);
    match config.driver {
        DriverKind::None => Ok(None),
        DriverKind::Simulated => {
            let bus = MockBus::new();
            let display = ShiftRegisterDisplay::new(
                bus.boxed("clock"),
                bus.boxed("latch"),
                bus.boxed("data"),
                config.shift_register.digits,
                polarity,
            )?;
            Ok(Some(Box::new(display)))
        }
        DriverKind::ShiftRegister => open_shift_register(config, polarity).map(Some),
        DriverKind::Multiplexed => open_multiplexed(config, polarity).map(Some),
    }
}

#[cfg(target_os = "linux")]
fn open_shift_register(
    config: &DisplayConfig,
    polarity: Polarity,
) -> scoreboard_hw::Result<Box<dyn LedDisplay>> {
    let pins = scoreboard_hw::ShiftPins {
        clock: config.shift_register.clock,
        latch: config.shift_register.latch,
        data: config.shift_register.data,
    };
    let display =
        ShiftRegisterDisplay::open(&config.chip, pins, config.shift_register.digits, polarity)?;
    Ok(Box::new(display))
}

#[cfg(target_os = "linux")]
fn open_multiplexed(
    config: &DisplayConfig,
    polarity: Polarity,
) -> scoreboard_hw::Result<Box<dyn LedDisplay>> {
    let board = &config.multiplexed;
    let mut display = scoreboard_hw::MultiplexedDisplay::open(
        &config.chip,
        &board.segments,
        &board.digits,
        polarity,
    )?
    .with_refresh_delay(std::time::Duration::from_millis(board.refresh_delay_ms))
    .with_align_left(board.align_left);

    for (key, layout) in &board.glyphs {
        display.set_char_layout(key, layout)?;
    }
    Ok(Box::new(display))
}

#[cfg(not(target_os = "linux"))]
fn open_shift_register(
    _config: &DisplayConfig,
    _polarity: Polarity,
) -> scoreboard_hw::Result<Box<dyn LedDisplay>> {
    Err(scoreboard_hw::Error::Configuration(
        "GPIO character devices are only available on Linux".to_string(),
    ))
}

#[cfg(not(target_os = "linux"))]
fn open_multiplexed(
    config: &DisplayConfig,
    polarity: Polarity,
) -> scoreboard_hw::Result<Box<dyn LedDisplay>> {
    open_shift_register(config, polarity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoreboard_hw::ByteSegmentTable;

    fn simulated(bus: &MockBus, digits: usize) -> ScoreBridge {
        let display = ShiftRegisterDisplay::new(
            bus.boxed("clock"),
            bus.boxed("latch"),
            bus.boxed("data"),
            digits,
            Polarity::ActiveHigh,
        )
        .unwrap();
        bus.clear();
        ScoreBridge::new(Some(Box::new(display)))
    }

    #[test]
    fn test_no_driver_is_disabled() {
        let mut bridge = ScoreBridge::from_config(&DisplayConfig::default());
        assert!(!bridge.is_enabled());
        bridge.push("0000");
        bridge.clear();
    }

    #[test]
    fn test_simulated_driver() {
        let config = DisplayConfig {
            driver: DriverKind::Simulated,
            ..DisplayConfig::default()
        };
        let mut bridge = ScoreBridge::from_config(&config);
        assert!(bridge.is_enabled());
        bridge.push("0510");
    }

    #[test]
    fn test_bad_board_disables_bridge() {
        let mut config = DisplayConfig {
            driver: DriverKind::Simulated,
            ..DisplayConfig::default()
        };
        config.shift_register.digits = 0;
        assert!(!ScoreBridge::from_config(&config).is_enabled());

        // Empty pin lists can never make a multiplexed board
        let config = DisplayConfig {
            driver: DriverKind::Multiplexed,
            chip: "/nonexistent/gpiochip".to_string(),
            ..DisplayConfig::default()
        };
        assert!(!ScoreBridge::from_config(&config).is_enabled());
    }

    #[test]
    fn test_push_latches_text() {
        let bus = MockBus::new();
        let mut bridge = simulated(&bus, 4);

        bridge.push("0510");

        assert_eq!(bus.writes("latch"), vec![false, true]);
        let table = ByteSegmentTable::new();
        // Last digit goes out first
        let first_byte: Vec<bool> = bus.writes("data").into_iter().take(8).collect();
        let expected: Vec<bool> = (0..8)
            .map(|bit| table.encode('0') & (1 << (7 - bit)) != 0)
            .collect();
        assert_eq!(first_byte, expected);
    }

    #[test]
    fn test_push_swallows_faults() {
        let bus = MockBus::new();
        let mut bridge = simulated(&bus, 2);

        bus.fail("clock");
        bridge.push("12");
        assert!(bus.writes("latch").is_empty());

        bus.heal("clock");
        bridge.push("12");
        assert_eq!(bus.writes("latch"), vec![false, true]);
        assert!(bridge.is_enabled());
    }
}
