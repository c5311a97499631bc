//! Background refresh loop for multiplexed digits.

use super::device::Board;
use super::{lock, read};
use crate::segments::Glyph;
use crate::{Error, Result};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Handle to a running refresh loop.
///
/// The loop is the only writer of the board's lines until [`stop`](Self::stop)
/// returns.
pub(super) struct RefreshWorker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl RefreshWorker {
    /// Starts cycling through the digits of `frame`.
    pub(super) fn spawn(
        board: Arc<Mutex<Board>>,
        frame: Arc<RwLock<Vec<Glyph>>>,
        delay: Duration,
    ) -> Result<Self> {
        let (stop, stopped) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("segment-refresh".to_string())
            .spawn(move || {
                debug!("Refresh loop started ({:?} per digit)", delay);
                match refresh_loop(&board, &frame, delay, &stopped) {
                    Ok(()) => debug!("Refresh loop stopped"),
                    Err(e) => warn!("Refresh loop abandoned: {}", e),
                }
            })
            .map_err(|e| Error::hardware("segment-refresh", e))?;
        Ok(Self { stop, handle })
    }

    /// Returns true once the loop has exited, for any reason.
    pub(super) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals the loop and waits for it to release the lines.
    pub(super) fn stop(self) -> Result<()> {
        // The loop may already have exited on a fault
        let _ = self.stop.send(());
        self.handle.join().map_err(|_| Error::WorkerPanicked)
    }
}

fn refresh_loop(
    board: &Mutex<Board>,
    frame: &RwLock<Vec<Glyph>>,
    delay: Duration,
    stopped: &Receiver<()>,
) -> Result<()> {
    let digit_count = lock(board).digit_count();
    let mut digit = 0;
    loop {
        let glyph = read(frame).get(digit).copied().unwrap_or(Glyph::BLANK);
        lock(board).light(digit, &glyph)?;

        let stop = !matches!(stopped.recv_timeout(delay), Err(RecvTimeoutError::Timeout));

        // Never leave a digit enabled, even when stopping
        lock(board).unlight(digit)?;
        if stop {
            return Ok(());
        }
        digit = (digit + 1) % digit_count;
    }
}
