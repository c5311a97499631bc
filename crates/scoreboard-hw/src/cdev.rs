//! GPIO character-device lines (`/dev/gpiochipN`).

use crate::line::OutputLine;
use crate::{Error, Result};
use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use tracing::{debug, info};

/// Default GPIO chip on Raspberry Pi class boards.
pub const DEFAULT_CHIP: &str = "/dev/gpiochip0";

/// An output line requested from a GPIO character device.
pub struct CdevLine {
    handle: LineHandle,
    name: String,
    level: bool,
}

impl CdevLine {
    /// Requests a single line as an output, initially low.
    pub fn open(chip: &mut Chip, offset: u32, consumer: &str) -> Result<Self> {
        let name = format!("gpio{}", offset);
        let handle = chip
            .get_line(offset)
            .and_then(|line| line.request(LineRequestFlags::OUTPUT, 0, consumer))
            .map_err(|e| Error::hardware(&name, e))?;
        debug!("Requested {} as output for {}", name, consumer);
        Ok(Self {
            handle,
            name,
            level: false,
        })
    }
}

impl OutputLine for CdevLine {
    fn set_level(&mut self, high: bool) -> Result<()> {
        self.handle
            .set_value(u8::from(high))
            .map_err(|e| Error::hardware(&self.name, e))?;
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

/// Opens a chip and requests every offset as an output line.
pub fn open_lines(
    chip_path: &str,
    offsets: &[u32],
    consumer: &str,
) -> Result<Vec<Box<dyn OutputLine>>> {
    let mut chip = Chip::new(chip_path).map_err(|e| Error::hardware(chip_path, e))?;
    let lines = offsets
        .iter()
        .map(|&offset| {
            CdevLine::open(&mut chip, offset, consumer).map(|l| Box::new(l) as Box<dyn OutputLine>)
        })
        .collect::<Result<Vec<_>>>()?;
    info!(
        "Opened {} lines on {} ({:?}) for {}",
        lines.len(),
        chip_path,
        offsets,
        consumer
    );
    Ok(lines)
}
