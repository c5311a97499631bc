//! Scoreboard Board Tool
//!
//! Drives an LED digit board directly, without the daemon. Every driver
//! error is reported.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use scoreboard_hw::{
    ByteSegmentTable, LedDisplay, MockBus, MultiplexedDisplay, OutputLine, Polarity,
    SegmentLayouts, ShiftRegisterDisplay,
};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scoreboardctl")]
#[command(about = "Diagnostic tool for scoreboard LED boards")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// GPIO character device
    #[arg(long, default_value = "/dev/gpiochip0")]
    chip: String,

    /// Segments are lit by driving lines low (common anode)
    #[arg(long)]
    active_low: bool,

    /// Use in-memory lines and print their final levels
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how text is encoded for both board types
    Encode {
        /// Text to encode
        text: String,
    },
    /// Latch a value onto a shift register board
    Render {
        /// Value to show
        value: String,

        #[command(flatten)]
        pins: ShiftArgs,
    },
    /// Show a message on a multiplexed board
    Display {
        /// Message to show; '.' lights the previous digit's decimal point
        message: String,

        /// Pad on the left so the message sits at the right edge
        #[arg(long)]
        right: bool,

        /// Time each digit stays lit, in milliseconds
        #[arg(long, default_value_t = 7)]
        delay_ms: u64,

        /// Seconds to keep refreshing (0 waits for Ctrl-C)
        #[arg(long, default_value_t = 5)]
        hold_secs: u64,

        #[command(flatten)]
        pins: MultiplexArgs,
    },
    /// Light every segment of a multiplexed board
    On {
        /// Seconds to hold before releasing the board (0 waits for Ctrl-C)
        #[arg(long, default_value_t = 5)]
        hold_secs: u64,

        #[command(flatten)]
        pins: MultiplexArgs,
    },
    /// Blank a multiplexed board
    Off {
        #[command(flatten)]
        pins: MultiplexArgs,
    },
}

/// Shift register board lines.
#[derive(Args)]
struct ShiftArgs {
    /// Clock line offset
    #[arg(long, default_value_t = 25)]
    clock: u32,

    /// Latch line offset
    #[arg(long, default_value_t = 23)]
    latch: u32,

    /// Data line offset
    #[arg(long, default_value_t = 24)]
    data: u32,

    /// Number of chained registers
    #[arg(long, default_value_t = 4)]
    digits: usize,
}

/// Multiplexed board lines.
#[derive(Args)]
struct MultiplexArgs {
    /// Segment line offsets A,B,C,D,E,F,G[,DP]
    #[arg(long, value_delimiter = ',', default_value = "17,4,23,8,7,10,9,25")]
    segments: Vec<u32>,

    /// Digit enable line offsets, leftmost first
    #[arg(long = "digit-lines", value_delimiter = ',', default_value = "22,27,18,24")]
    digit_lines: Vec<u32>,
}

/// Where lines come from: a GPIO chip or an in-memory bus.
struct Lines {
    chip: String,
    polarity: Polarity,
    bus: Option<MockBus>,
}

impl Lines {
    fn open(&self, offsets: &[u32], consumer: &str) -> Result<Vec<Box<dyn OutputLine>>> {
        if let Some(bus) = &self.bus {
            return Ok(offsets
                .iter()
                .map(|offset| bus.boxed(&line_name(*offset)))
                .collect());
        }
        debug!("Opening lines {:?} on {}", offsets, self.chip);
        open_gpio(&self.chip, offsets, consumer)
    }

    fn shift_register(&self, pins: &ShiftArgs) -> Result<ShiftRegisterDisplay> {
        let mut lines = self
            .open(&[pins.clock, pins.latch, pins.data], "scoreboardctl")?
            .into_iter();
        let (Some(clock), Some(latch), Some(data)) = (lines.next(), lines.next(), lines.next())
        else {
            bail!("Expected clock, latch and data lines");
        };
        ShiftRegisterDisplay::new(clock, latch, data, pins.digits, self.polarity)
            .context("Failed to set up shift register board")
    }

    fn multiplexed(&self, pins: &MultiplexArgs) -> Result<MultiplexedDisplay> {
        let segments = self.open(&pins.segments, "scoreboardctl-segments")?;
        let digits = self.open(&pins.digit_lines, "scoreboardctl-digits")?;
        MultiplexedDisplay::new(segments, digits, self.polarity)
            .context("Failed to set up multiplexed board")
    }

    /// Prints the final level of simulated lines.
    fn report(&self, offsets: &[u32]) {
        let Some(bus) = &self.bus else {
            return;
        };
        println!("{} line writes", bus.events().len());
        for offset in offsets {
            let name = line_name(*offset);
            let level = match bus.level(&name) {
                Some(true) => "high",
                Some(false) => "low",
                None => "unused",
            };
            println!("  {:<8} {}", name, level);
        }
    }
}

fn line_name(offset: u32) -> String {
    format!("gpio{}", offset)
}

#[cfg(target_os = "linux")]
fn open_gpio(chip: &str, offsets: &[u32], consumer: &str) -> Result<Vec<Box<dyn OutputLine>>> {
    scoreboard_hw::cdev::open_lines(chip, offsets, consumer)
        .with_context(|| format!("Failed to open lines on {}", chip))
}

#[cfg(not(target_os = "linux"))]
fn open_gpio(_chip: &str, _offsets: &[u32], _consumer: &str) -> Result<Vec<Box<dyn OutputLine>>> {
    bail!("GPIO character devices are only available on Linux; use --simulate")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let lines = Lines {
        chip: cli.chip,
        polarity: if cli.active_low {
            Polarity::ActiveLow
        } else {
            Polarity::ActiveHigh
        },
        bus: cli.simulate.then(MockBus::new),
    };

    match cli.command {
        Commands::Encode { text } => {
            handle_encode(&text);
            Ok(())
        }
        Commands::Render { value, pins } => handle_render(&lines, &value, &pins),
        Commands::Display {
            message,
            right,
            delay_ms,
            hold_secs,
            pins,
        } => {
            handle_display(
                &lines,
                &message,
                !right,
                Duration::from_millis(delay_ms),
                hold_secs,
                &pins,
            )
            .await
        }
        Commands::On { hold_secs, pins } => handle_on(&lines, hold_secs, &pins).await,
        Commands::Off { pins } => handle_off(&lines, &pins),
    }
}

fn handle_encode(text: &str) {
    let bytes = ByteSegmentTable::new();
    let layouts = SegmentLayouts::new();

    println!("char  shift     segments");
    for ch in text.chars() {
        let segments = match layouts.encode(ch) {
            Ok(layout) => layout
                .iter()
                .zip("abcdefg".chars())
                .map(|(&on, name)| if on { name } else { '.' })
                .collect::<String>(),
            Err(_) => "unknown".to_string(),
        };
        println!("{:<5} {:08b}  {}", format!("{:?}", ch), bytes.encode(ch), segments);
    }
}

fn handle_render(lines: &Lines, value: &str, pins: &ShiftArgs) -> Result<()> {
    let mut display = lines.shift_register(pins)?;
    display.render(value).context("Failed to render value")?;
    println!("Latched {:?}", display.value());
    lines.report(&[pins.clock, pins.latch, pins.data]);
    Ok(())
}

async fn handle_display(
    lines: &Lines,
    message: &str,
    align_left: bool,
    delay: Duration,
    hold_secs: u64,
    pins: &MultiplexArgs,
) -> Result<()> {
    let mut display = lines.multiplexed(pins)?;
    display
        .display_with_delay(message, align_left, delay)
        .context("Failed to display message")?;
    println!("Showing {:?}", display.message().to_string());

    hold(hold_secs).await?;
    display.stop().context("Failed to stop refresh loop")?;
    lines.report(&all_offsets(pins));
    Ok(())
}

async fn handle_on(lines: &Lines, hold_secs: u64, pins: &MultiplexArgs) -> Result<()> {
    let mut display = lines.multiplexed(pins)?;
    display.on().context("Failed to light board")?;
    println!("All segments on");
    lines.report(&all_offsets(pins));
    hold(hold_secs).await
}

fn handle_off(lines: &Lines, pins: &MultiplexArgs) -> Result<()> {
    let mut display = lines.multiplexed(pins)?;
    display.off().context("Failed to blank board")?;
    println!("All segments off");
    lines.report(&all_offsets(pins));
    Ok(())
}

fn all_offsets(pins: &MultiplexArgs) -> Vec<u32> {
    pins.segments
        .iter()
        .chain(pins.digit_lines.iter())
        .copied()
        .collect()
}

/// Waits for the given number of seconds, or for Ctrl-C when zero.
async fn hold(secs: u64) -> Result<()> {
    if secs == 0 {
        println!("Press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to wait for Ctrl-C")?;
    } else {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
    Ok(())
}
