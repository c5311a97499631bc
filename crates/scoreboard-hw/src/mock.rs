//! In-memory output lines.
//!
//! Every line created from a [`MockBus`] appends its writes to one shared
//! event log, so the exact order of clock, data, latch, segment and digit
//! writes can be inspected after the fact. The bus is also the backend for
//! running without hardware attached.

use crate::line::OutputLine;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// A single recorded line write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEvent {
    /// Line name.
    pub line: String,
    /// Electrical level written.
    pub high: bool,
}

#[derive(Debug, Default)]
struct BusState {
    events: Vec<LineEvent>,
    levels: HashMap<String, bool>,
    failing: HashSet<String>,
}

/// Shared log of writes made by a set of mock lines.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a new line on this bus, initially low.
    pub fn line(&self, name: &str) -> MockLine {
        self.state().levels.insert(name.to_string(), false);
        MockLine {
            name: name.to_string(),
            level: false,
            bus: self.clone(),
        }
    }

    /// Creates a line and boxes it for use with the drivers.
    pub fn boxed(&self, name: &str) -> Box<dyn OutputLine> {
        Box::new(self.line(name))
    }

    /// Creates `count` boxed lines named `{prefix}{index}`.
    pub fn lines(&self, prefix: &str, count: usize) -> Vec<Box<dyn OutputLine>> {
        (0..count)
            .map(|i| self.boxed(&format!("{}{}", prefix, i)))
            .collect()
    }

    /// Returns every write recorded so far.
    pub fn events(&self) -> Vec<LineEvent> {
        self.state().events.clone()
    }

    /// Returns the levels written to one line, in order.
    pub fn writes(&self, name: &str) -> Vec<bool> {
        self.state()
            .events
            .iter()
            .filter(|e| e.line == name)
            .map(|e| e.high)
            .collect()
    }

    /// Returns the current electrical level of a line.
    pub fn level(&self, name: &str) -> Option<bool> {
        self.state().levels.get(name).copied()
    }

    /// Forgets recorded events, keeping current levels.
    pub fn clear(&self) {
        self.state().events.clear();
    }

    /// Makes every later write to the named line fail.
    pub fn fail(&self, name: &str) {
        self.state().failing.insert(name.to_string());
    }

    /// Stops injecting faults on the named line.
    pub fn heal(&self, name: &str) {
        self.state().failing.remove(name);
    }

    fn record(&self, name: &str, high: bool) -> Result<()> {
        let mut state = self.state();
        if state.failing.contains(name) {
            return Err(Error::hardware(name, "injected fault"));
        }
        state.events.push(LineEvent {
            line: name.to_string(),
            high,
        });
        state.levels.insert(name.to_string(), high);
        trace!(line = name, high, "mock line write");
        Ok(())
    }
}

/// A line whose writes are recorded on a [`MockBus`].
#[derive(Debug)]
pub struct MockLine {
    name: String,
    level: bool,
    bus: MockBus,
}

impl OutputLine for MockLine {
    fn set_level(&mut self, high: bool) -> Result<()> {
        self.bus.record(&self.name, high)?;
        self.level = high;
        Ok(())
    }

    fn level(&self) -> bool {
        self.level
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_records_writes_in_order() {
        let bus = MockBus::new();
        let mut a = bus.line("a");
        let mut b = bus.line("b");

        a.set_level(true).unwrap();
        b.set_level(true).unwrap();
        a.set_level(false).unwrap();

        let events = bus.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].line, "a");
        assert_eq!(events[1].line, "b");
        assert!(!events[2].high);
        assert_eq!(bus.level("a"), Some(false));
        assert_eq!(bus.level("b"), Some(true));
        assert_eq!(bus.level("c"), None);
    }

    #[test]
    fn test_injected_fault() {
        let bus = MockBus::new();
        let mut line = bus.line("clock");
        bus.fail("clock");

        let err = line.set_level(true).unwrap_err();
        assert!(matches!(err, Error::Hardware { ref line, .. } if line == "clock"));
        assert!(bus.events().is_empty());
        assert!(!line.level());

        bus.heal("clock");
        line.set_level(true).unwrap();
        assert_eq!(bus.writes("clock"), vec![true]);
    }

    #[test]
    fn test_clear_keeps_levels() {
        let bus = MockBus::new();
        let mut line = bus.line("latch");
        line.set_level(true).unwrap();
        bus.clear();
        assert!(bus.events().is_empty());
        assert_eq!(bus.level("latch"), Some(true));
    }
}
