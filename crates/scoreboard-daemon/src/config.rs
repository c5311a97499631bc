//! Configuration management.

#![allow(dead_code)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server listen address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory holding persisted scores
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Scoring rules and limits
    #[serde(default)]
    pub scoreboard: ScoreConfig,

    /// LED board configuration
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Scoring rules and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Number of scoreboards served
    #[serde(default = "default_one")]
    pub scoreboards: usize,

    /// Players per scoreboard
    #[serde(default = "default_two")]
    pub players: usize,

    /// Digits shown per player
    #[serde(default = "default_two")]
    pub digits: usize,

    /// Lowest score a player can have
    #[serde(default)]
    pub min_score: i64,

    /// Highest score a player can have
    #[serde(default = "default_max_score")]
    pub max_score: i64,

    /// Score after a reset
    #[serde(default)]
    pub start_score: i64,

    /// Amount added or removed by the web UI buttons
    #[serde(default = "default_step")]
    pub step: i64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            scoreboards: default_one(),
            players: default_two(),
            digits: default_two(),
            min_score: 0,
            max_score: default_max_score(),
            start_score: 0,
            step: default_step(),
        }
    }
}

/// Which display driver the bridge builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// No board attached
    #[default]
    None,
    /// In-memory lines, writes are logged
    Simulated,
    /// Serial board behind shift registers
    ShiftRegister,
    /// Parallel board with shared segment lines
    Multiplexed,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DriverKind::None => "none",
            DriverKind::Simulated => "simulated",
            DriverKind::ShiftRegister => "shift-register",
            DriverKind::Multiplexed => "multiplexed",
        };
        write!(f, "{}", name)
    }
}

/// LED board configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Driver to use
    #[serde(default)]
    pub driver: DriverKind,

    /// GPIO character device
    #[serde(default = "default_chip")]
    pub chip: String,

    /// Segment lines are lit by driving them high
    #[serde(default = "default_true")]
    pub active_high: bool,

    /// Scoreboard shown on the board
    #[serde(default)]
    pub scoreboard: usize,

    /// Shift register board lines
    #[serde(default)]
    pub shift_register: ShiftRegisterConfig,

    /// Multiplexed board lines
    #[serde(default)]
    pub multiplexed: MultiplexedConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::default(),
            chip: default_chip(),
            active_high: true,
            scoreboard: 0,
            shift_register: ShiftRegisterConfig::default(),
            multiplexed: MultiplexedConfig::default(),
        }
    }
}

/// Shift register board line offsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftRegisterConfig {
    #[serde(default = "default_clock")]
    pub clock: u32,

    #[serde(default = "default_latch")]
    pub latch: u32,

    #[serde(default = "default_data")]
    pub data: u32,

    /// Number of chained registers
    #[serde(default = "default_shift_digits")]
    pub digits: usize,
}

impl Default for ShiftRegisterConfig {
    fn default() -> Self {
        Self {
            clock: default_clock(),
            latch: default_latch(),
            data: default_data(),
            digits: default_shift_digits(),
        }
    }
}

/// Multiplexed board line offsets and behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiplexedConfig {
    /// Segment lines A..G, optionally followed by the decimal point
    #[serde(default)]
    pub segments: Vec<u32>,

    /// Digit enable lines, leftmost first
    #[serde(default)]
    pub digits: Vec<u32>,

    /// Pad short messages on the right instead of the left
    #[serde(default)]
    pub align_left: bool,

    /// Time each digit stays lit
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,

    /// Extra characters, each mapped to 7 segment states A..G
    #[serde(default)]
    pub glyphs: BTreeMap<String, Vec<bool>>,
}

impl Default for MultiplexedConfig {
    fn default() -> Self {
        Self {
            segments: Vec::new(),
            digits: Vec::new(),
            align_left: false,
            refresh_delay_ms: default_refresh_delay_ms(),
            glyphs: BTreeMap::new(),
        }
    }
}

// Default value functions
fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_state_dir() -> String {
    "/var/lib/scoreboardd".to_string()
}

fn default_one() -> usize {
    1
}

fn default_two() -> usize {
    2
}

fn default_max_score() -> i64 {
    100
}

fn default_step() -> i64 {
    5
}

fn default_chip() -> String {
    "/dev/gpiochip0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_clock() -> u32 {
    25
}

fn default_latch() -> u32 {
    23
}

fn default_data() -> u32 {
    24
}

fn default_shift_digits() -> usize {
    4
}

fn default_refresh_delay_ms() -> u64 {
    7
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            state_dir: default_state_dir(),
            scoreboard: ScoreConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}
