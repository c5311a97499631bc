//! Output line abstraction shared by both display drivers.
//!
//! A [`Line`] wraps a physical [`OutputLine`] with a [`Polarity`], so drivers
//! work in logical on/off terms and every write re-asserts the electrical
//! level on the line itself.

use crate::Result;
use std::str::FromStr;

/// A single physical output line that can be driven high or low.
pub trait OutputLine: Send {
    /// Drives the line to the given electrical level.
    fn set_level(&mut self, high: bool) -> Result<()>;

    /// Returns the last electrical level driven onto the line.
    fn level(&self) -> bool;

    /// Human-readable line name, used in logs and fault reports.
    fn name(&self) -> &str;
}

impl OutputLine for Box<dyn OutputLine> {
    fn set_level(&mut self, high: bool) -> Result<()> {
        (**self).set_level(high)
    }

    fn level(&self) -> bool {
        (**self).level()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Which electrical level means "on".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    /// Logical on drives the line high (common cathode segments).
    #[default]
    ActiveHigh,
    /// Logical on drives the line low (common anode segments).
    ActiveLow,
}

impl Polarity {
    /// Builds a polarity from an `active_high` flag.
    pub fn from_active_high(active_high: bool) -> Self {
        if active_high {
            Polarity::ActiveHigh
        } else {
            Polarity::ActiveLow
        }
    }

    /// Returns the opposite polarity.
    pub fn inverted(self) -> Self {
        match self {
            Polarity::ActiveHigh => Polarity::ActiveLow,
            Polarity::ActiveLow => Polarity::ActiveHigh,
        }
    }

    /// Translates a logical state into an electrical level.
    pub fn level(self, on: bool) -> bool {
        match self {
            Polarity::ActiveHigh => on,
            Polarity::ActiveLow => !on,
        }
    }
}

impl FromStr for Polarity {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "active-high" | "high" => Ok(Polarity::ActiveHigh),
            "active-low" | "low" => Ok(Polarity::ActiveLow),
            _ => Err(crate::Error::Configuration(format!(
                "unknown polarity: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::ActiveHigh => write!(f, "active-high"),
            Polarity::ActiveLow => write!(f, "active-low"),
        }
    }
}

/// A physical line driven in logical terms.
pub struct Line {
    inner: Box<dyn OutputLine>,
    polarity: Polarity,
}

impl Line {
    /// Wraps a physical line with the given polarity.
    pub fn new(inner: Box<dyn OutputLine>, polarity: Polarity) -> Self {
        Self { inner, polarity }
    }

    /// Switches the line on.
    pub fn on(&mut self) -> Result<()> {
        self.set(true)
    }

    /// Switches the line off.
    pub fn off(&mut self) -> Result<()> {
        self.set(false)
    }

    /// Drives the logical state onto the line.
    pub fn set(&mut self, on: bool) -> Result<()> {
        self.inner.set_level(self.polarity.level(on))
    }

    /// Returns the logical state last driven.
    pub fn is_on(&self) -> bool {
        self.polarity.level(self.inner.level())
    }

    /// Returns the line polarity.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Returns the underlying line name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }
}

impl std::fmt::Debug for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Line")
            .field("name", &self.name())
            .field("polarity", &self.polarity)
            .field("on", &self.is_on())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;

    #[test]
    fn test_polarity_level() {
        assert!(Polarity::ActiveHigh.level(true));
        assert!(!Polarity::ActiveHigh.level(false));
        assert!(!Polarity::ActiveLow.level(true));
        assert!(Polarity::ActiveLow.level(false));
        assert_eq!(Polarity::ActiveHigh.inverted(), Polarity::ActiveLow);
    }

    #[test]
    fn test_polarity_from_str() {
        assert_eq!(
            "active-low".parse::<Polarity>().unwrap(),
            Polarity::ActiveLow
        );
        assert_eq!("HIGH".parse::<Polarity>().unwrap(), Polarity::ActiveHigh);
        assert!("sideways".parse::<Polarity>().is_err());
    }

    #[test]
    fn test_active_low_line_drives_inverted_level() {
        let bus = MockBus::new();
        let mut line = Line::new(Box::new(bus.line("seg")), Polarity::ActiveLow);

        line.on().unwrap();
        assert_eq!(bus.level("seg"), Some(false));
        assert!(line.is_on());

        line.off().unwrap();
        assert_eq!(bus.level("seg"), Some(true));
        assert!(!line.is_on());
    }

    #[test]
    fn test_repeated_writes_reassert_the_line() {
        let bus = MockBus::new();
        let mut line = Line::new(Box::new(bus.line("seg")), Polarity::ActiveHigh);

        line.on().unwrap();
        line.on().unwrap();

        // Both writes reach the line even though the state did not change
        assert_eq!(bus.writes("seg"), vec![true, true]);
    }
}
