//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section and field has a default matching the house rules, so an
//! empty file (or no file at all) yields a playable tournament.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::types::TourneyError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub tournament: TournamentConfig,
    pub scoring: ScoringConfig,
    pub policy: PolicyConfig,
    pub wager: WagerConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TournamentConfig {
    /// Name used for the human seat when the caller supplies a blank one.
    pub human_name: String,
    pub cpu_count: usize,
    pub starting_points: u64,
    /// Bracket rounds played before the final.
    pub rounds: u32,
    pub shuffle_seats: bool,
    /// Seed for every CPU decision. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            human_name: "You".to_string(),
            cpu_count: 15,
            starting_points: 50,
            rounds: 4,
            shuffle_seats: true,
            seed: None,
        }
    }
}

/// Reward curves for successful declarations.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub win_base: u64,
    /// Added per prior consecutive successful WIN declaration.
    pub win_streak_bonus: u64,
    pub lose_base: u64,
    /// Subtracted per prior consecutive successful LOSE declaration.
    pub lose_streak_penalty: u64,
    pub lose_floor: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            win_base: 100,
            win_streak_bonus: 50,
            lose_base: 200,
            lose_streak_penalty: 50,
            lose_floor: 50,
        }
    }
}

/// Tuning for the CPU declaration strategies.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PolicyConfig {
    /// Opponent declarations inspected by the trend strategy.
    pub trend_window: usize,
    /// Probability of countering the opponent's dominant declaration.
    pub trend_bias: f64,
    /// Below this many points the points strategy leans towards LOSE.
    pub points_threshold: u64,
    pub behind_lose_bias: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            trend_window: 3,
            trend_bias: 0.6,
            points_threshold: 200,
            behind_lose_bias: 0.7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WagerConfig {
    /// Exclusive upper bound on a CPU spectator's stake.
    pub max_cpu_stake: u64,
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self { max_cpu_stake: 1000 }
    }
}

/// Settings for the headless driver binary.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Tournaments played back to back, chaining the human's carry-over.
    pub tournaments: u32,
    pub json_output: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tournaments: 1,
            json_output: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), TourneyError> {
        if self.tournament.cpu_count == 0 {
            return Err(TourneyError::Config("cpu_count must be at least 1".into()));
        }
        if self.tournament.rounds == 0 {
            return Err(TourneyError::Config("rounds must be at least 1".into()));
        }
        if self.policy.trend_window == 0 {
            return Err(TourneyError::Config("trend_window must be at least 1".into()));
        }
        for (name, p) in [
            ("trend_bias", self.policy.trend_bias),
            ("behind_lose_bias", self.policy.behind_lose_bias),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(TourneyError::Config(format!(
                    "{name} must be a probability, got {p}"
                )));
            }
        }
        Ok(())
    }
}
