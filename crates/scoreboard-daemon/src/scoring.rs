//! Score model: scoreboards, players and clamping rules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ScoreConfig;
use crate::store::ScoreStore;

/// Errors raised by score operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScoreError {
    #[error("Unknown scoreboard {0}")]
    UnknownScoreboard(usize),

    #[error("Unknown player {pid} on scoreboard {sbid}")]
    UnknownPlayer { sbid: usize, pid: usize },

    #[error("Invalid scoreboard: {0}")]
    InvalidBoard(String),

    #[error("Score update did not complete: {0}")]
    Interrupted(String),
}

/// One player's score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub pid: usize,
    pub score: i64,
}

/// JSON view of a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub pid: usize,
    pub score: i64,
    /// Score as shown on the board.
    pub str: String,
}

/// JSON view of a scoreboard, as sent to web clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreboardSnapshot {
    pub sbid: usize,
    pub players: Vec<PlayerSnapshot>,
}

/// A set of players whose scores are shown side by side.
#[derive(Debug, Clone)]
pub struct Scoreboard {
    sbid: usize,
    digits: usize,
    min_score: i64,
    max_score: i64,
    start_score: i64,
    players: Vec<Player>,
}

impl Scoreboard {
    /// Creates a scoreboard with every player at the start score.
    pub fn new(
        sbid: usize,
        players: usize,
        digits: usize,
        limits: &ScoreConfig,
    ) -> Result<Self, ScoreError> {
        if sbid >= limits.scoreboards {
            return Err(ScoreError::InvalidBoard(format!(
                "scoreboard {} is beyond the limit of {}",
                sbid, limits.scoreboards
            )));
        }
        if players == 0 || players > limits.players {
            return Err(ScoreError::InvalidBoard(format!(
                "{} players, expected 1 to {}",
                players, limits.players
            )));
        }
        if digits == 0 || digits > limits.digits {
            return Err(ScoreError::InvalidBoard(format!(
                "{} digits, expected 1 to {}",
                digits, limits.digits
            )));
        }
        if limits.min_score > limits.max_score
            || !(limits.min_score..=limits.max_score).contains(&limits.start_score)
        {
            return Err(ScoreError::InvalidBoard(format!(
                "start score {} is outside {}..={}",
                limits.start_score, limits.min_score, limits.max_score
            )));
        }

        Ok(Self {
            sbid,
            digits,
            min_score: limits.min_score,
            max_score: limits.max_score,
            start_score: limits.start_score,
            players: (0..players)
                .map(|pid| Player {
                    pid,
                    score: limits.start_score,
                })
                .collect(),
        })
    }

    /// Storage key for a player's score.
    pub fn key(sbid: usize, pid: usize) -> String {
        format!("sb{}_p{}", sbid, pid)
    }

    /// Loads stored scores, clamping them into range.
    pub fn hydrate(&mut self, store: &dyn ScoreStore) {
        for pid in 0..self.players.len() {
            if let Some(score) = store.get(&Self::key(self.sbid, pid)) {
                self.players[pid].score = self.clamp(score);
            }
        }
    }

    pub fn sbid(&self) -> usize {
        self.sbid
    }

    pub fn score(&self, pid: usize) -> Result<i64, ScoreError> {
        Ok(self.player(pid)?.score)
    }

    fn player(&self, pid: usize) -> Result<&Player, ScoreError> {
        self.players.get(pid).ok_or(ScoreError::UnknownPlayer {
            sbid: self.sbid,
            pid,
        })
    }

    fn clamp(&self, score: i64) -> i64 {
        score.clamp(self.min_score, self.max_score)
    }

    /// Sets a player's score, returning whether it changed.
    pub fn set_score(&mut self, pid: usize, score: i64) -> Result<bool, ScoreError> {
        self.player(pid)?;
        let score = self.clamp(score);
        let player = &mut self.players[pid];
        if player.score == score {
            return Ok(false);
        }
        player.score = score;
        Ok(true)
    }

    /// Adds to a player's score.
    pub fn add(&mut self, pid: usize, amount: i64) -> Result<bool, ScoreError> {
        let score = self.score(pid)?.saturating_add(amount);
        self.set_score(pid, score)
    }

    /// Subtracts from a player's score.
    pub fn subtract(&mut self, pid: usize, amount: i64) -> Result<bool, ScoreError> {
        let score = self.score(pid)?.saturating_sub(amount);
        self.set_score(pid, score)
    }

    /// Puts every player back to the start score, returning who changed.
    pub fn reset(&mut self) -> Vec<usize> {
        let start = self.start_score;
        let mut changed = Vec::new();
        for player in &mut self.players {
            if player.score != start {
                player.score = start;
                changed.push(player.pid);
            }
        }
        changed
    }

    /// Score as shown on the board: capped to the digit width and zero-padded.
    pub fn player_text(&self, pid: usize) -> Result<String, ScoreError> {
        let shown_max = 10_i64
            .checked_pow(self.digits as u32)
            .map_or(i64::MAX, |limit| limit - 1);
        let score = self.score(pid)?.min(shown_max);
        Ok(format!("{:0width$}", score, width = self.digits))
    }

    /// Text for the whole board, players in order.
    pub fn display_text(&self) -> String {
        self.players
            .iter()
            .filter_map(|p| self.player_text(p.pid).ok())
            .collect()
    }

    pub fn snapshot(&self) -> ScoreboardSnapshot {
        ScoreboardSnapshot {
            sbid: self.sbid,
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    pid: p.pid,
                    score: p.score,
                    str: self.player_text(p.pid).unwrap_or_default(),
                })
                .collect(),
        }
    }
}
