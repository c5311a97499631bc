//! Application state management.

use anyhow::{Context, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::bridge::ScoreBridge;
use crate::config::Config;
use crate::scoring::{ScoreError, Scoreboard, ScoreboardSnapshot};
use crate::store::{FileStore, ScoreStore};

/// Capacity of the update channel; slow WebSocket clients skip ahead.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared application state.
pub struct AppState {
    /// Configuration
    config: Config,

    /// Scoreboards, indexed by sbid
    scoreboards: Vec<Mutex<Scoreboard>>,

    /// Persistent scores
    store: Box<dyn ScoreStore>,

    /// LED board link
    bridge: Mutex<ScoreBridge>,

    /// Snapshot fanout for WebSocket clients
    updates: broadcast::Sender<ScoreboardSnapshot>,
}

impl AppState {
    /// Creates state backed by the state directory and the configured board.
    pub fn new(config: Config) -> Result<Self> {
        let store = FileStore::open(&config.state_dir)?;
        info!("Scores stored in {:?}", store.path());
        let bridge = ScoreBridge::from_config(&config.display);
        Self::with_parts(config, Box::new(store), bridge)
    }

    /// Creates state from explicit parts.
    pub fn with_parts(
        config: Config,
        store: Box<dyn ScoreStore>,
        bridge: ScoreBridge,
    ) -> Result<Self> {
        let limits = &config.scoreboard;
        let scoreboards = (0..limits.scoreboards)
            .map(|sbid| {
                let mut scoreboard = Scoreboard::new(sbid, limits.players, limits.digits, limits)?;
                scoreboard.hydrate(store.as_ref());
                Ok(Mutex::new(scoreboard))
            })
            .collect::<Result<Vec<_>, ScoreError>>()
            .context("Invalid scoreboard configuration")?;

        if config.display.scoreboard >= scoreboards.len() && bridge.is_enabled() {
            warn!(
                "LED board is set to show scoreboard {}, which does not exist",
                config.display.scoreboard
            );
        }

        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Ok(Self {
            config,
            scoreboards,
            store,
            bridge: Mutex::new(bridge),
            updates,
        })
    }

    /// Amount the web UI buttons add or remove.
    pub fn step(&self) -> i64 {
        self.config.scoreboard.step
    }

    fn scoreboard(&self, sbid: usize) -> Result<MutexGuard<'_, Scoreboard>, ScoreError> {
        self.scoreboards
            .get(sbid)
            .map(lock)
            .ok_or(ScoreError::UnknownScoreboard(sbid))
    }

    /// Returns the current scores of a scoreboard.
    pub fn snapshot(&self, sbid: usize) -> Result<ScoreboardSnapshot, ScoreError> {
        Ok(self.scoreboard(sbid)?.snapshot())
    }

    /// Subscribes to snapshots sent after every change.
    pub fn subscribe(&self) -> broadcast::Receiver<ScoreboardSnapshot> {
        self.updates.subscribe()
    }

    /// Shows the current scores on the LED board.
    pub fn show_initial(&self) {
        if let Ok(scoreboard) = self.scoreboard(self.config.display.scoreboard) {
            lock(&self.bridge).push(&scoreboard.display_text());
        }
    }

    /// Blanks the LED board.
    pub fn clear_display(&self) {
        lock(&self.bridge).clear();
    }

    /// Adds to a player's score.
    pub fn increase(
        &self,
        sbid: usize,
        pid: usize,
        amount: i64,
    ) -> Result<ScoreboardSnapshot, ScoreError> {
        let mut scoreboard = self.scoreboard(sbid)?;
        if scoreboard.add(pid, amount)? {
            self.publish(&scoreboard, &[pid]);
        }
        Ok(scoreboard.snapshot())
    }

    /// Subtracts from a player's score.
    pub fn decrease(
        &self,
        sbid: usize,
        pid: usize,
        amount: i64,
    ) -> Result<ScoreboardSnapshot, ScoreError> {
        let mut scoreboard = self.scoreboard(sbid)?;
        if scoreboard.subtract(pid, amount)? {
            self.publish(&scoreboard, &[pid]);
        }
        Ok(scoreboard.snapshot())
    }

    /// Puts every player of a scoreboard back to the start score.
    pub fn reset(&self, sbid: usize) -> Result<ScoreboardSnapshot, ScoreError> {
        let mut scoreboard = self.scoreboard(sbid)?;
        let changed = scoreboard.reset();
        if !changed.is_empty() {
            self.publish(&scoreboard, &changed);
        }
        Ok(scoreboard.snapshot())
    }

    /// Persists changed scores, then notifies clients and the board.
    ///
    /// Called with the scoreboard lock held so updates reach every
    /// consumer in the order they were made.
    fn publish(&self, scoreboard: &Scoreboard, changed: &[usize]) {
        let sbid = scoreboard.sbid();
        for &pid in changed {
            let key = Scoreboard::key(sbid, pid);
            if let Ok(score) = scoreboard.score(pid) {
                if let Err(e) = self.store.set(&key, score) {
                    warn!("Failed to store {}: {:#}", key, e);
                }
            }
        }

        let snapshot = scoreboard.snapshot();
        debug!("Scoreboard {} changed: {:?}", sbid, snapshot.players);
        // No subscribers is fine
        let _ = self.updates.send(snapshot);

        if sbid == self.config.display.scoreboard {
            lock(&self.bridge).push(&scoreboard.display_text());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use scoreboard_hw::{MockBus, Polarity, ShiftRegisterDisplay};
    use std::sync::Arc;
    use tokio::sync::broadcast::error::TryRecvError;

    /// Store that shares its contents with the test.
    struct SharedStore(Arc<MemoryStore>);

    impl ScoreStore for SharedStore {
        fn get(&self, key: &str) -> Option<i64> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: i64) -> anyhow::Result<()> {
            self.0.set(key, value)
        }
    }

    fn state() -> AppState {
        AppState::with_parts(
            Config::default(),
            Box::new(MemoryStore::new()),
            ScoreBridge::disabled(),
        )
        .unwrap()
    }

    fn state_with_board(bus: &MockBus) -> AppState {
        let display = ShiftRegisterDisplay::new(
            bus.boxed("clock"),
            bus.boxed("latch"),
            bus.boxed("data"),
            4,
            Polarity::ActiveHigh,
        )
        .unwrap();
        bus.clear();
        AppState::with_parts(
            Config::default(),
            Box::new(MemoryStore::new()),
            ScoreBridge::new(Some(Box::new(display))),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_changes_are_broadcast() {
        let state = state();
        let mut rx = state.subscribe();

        state.increase(0, 1, 5).unwrap();

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.sbid, 0);
        assert_eq!(snapshot.players[1].score, 5);
        assert_eq!(snapshot.players[1].str, "05");
    }

    #[tokio::test]
    async fn test_unchanged_scores_are_not_broadcast() {
        let state = state();
        let mut rx = state.subscribe();

        let snapshot = state.decrease(0, 0, 5).unwrap();
        assert_eq!(snapshot.players[0].score, 0);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        state.reset(0).unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_updates() {
        let state = state();
        let mut first = state.subscribe();
        let mut second = state.subscribe();

        state.increase(0, 0, 10).unwrap();
        state.reset(0).unwrap();

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.unwrap().players[0].score, 10);
            assert_eq!(rx.recv().await.unwrap().players[0].score, 0);
        }
    }

    #[test]
    fn test_unknown_ids() {
        let state = state();
        assert_eq!(
            state.increase(1, 0, 5),
            Err(ScoreError::UnknownScoreboard(1))
        );
        assert_eq!(
            state.increase(0, 2, 5),
            Err(ScoreError::UnknownPlayer { sbid: 0, pid: 2 })
        );
        assert!(state.snapshot(3).is_err());
    }

    #[test]
    fn test_scores_are_stored_and_hydrated() {
        let store = Arc::new(MemoryStore::new());
        let first = AppState::with_parts(
            Config::default(),
            Box::new(SharedStore(store.clone())),
            ScoreBridge::disabled(),
        )
        .unwrap();
        first.increase(0, 0, 15).unwrap();
        first.increase(0, 1, 20).unwrap();
        assert_eq!(store.get("sb0_p0"), Some(15));

        let second = AppState::with_parts(
            Config::default(),
            Box::new(SharedStore(store)),
            ScoreBridge::disabled(),
        )
        .unwrap();
        let snapshot = second.snapshot(0).unwrap();
        assert_eq!(snapshot.players[0].score, 15);
        assert_eq!(snapshot.players[1].score, 20);
    }

    #[test]
    fn test_changes_reach_the_board() {
        let bus = MockBus::new();
        let state = state_with_board(&bus);

        state.show_initial();
        assert_eq!(bus.writes("latch").len(), 2);

        state.increase(0, 0, 5).unwrap();
        assert_eq!(bus.writes("latch").len(), 4);

        // No change, no frame
        state.decrease(0, 1, 5).unwrap();
        assert_eq!(bus.writes("latch").len(), 4);
    }

    #[test]
    fn test_board_fault_does_not_block_scoring() {
        let bus = MockBus::new();
        let state = state_with_board(&bus);
        bus.fail("data");

        let snapshot = state.increase(0, 0, 5).unwrap();
        assert_eq!(snapshot.players[0].score, 5);
        assert_eq!(state.snapshot(0).unwrap().players[0].score, 5);
    }

    #[test]
    fn test_invalid_limits_fail() {
        let mut config = Config::default();
        config.scoreboard.players = 0;
        assert!(AppState::with_parts(
            config,
            Box::new(MemoryStore::new()),
            ScoreBridge::disabled()
        )
        .is_err());
    }
}
