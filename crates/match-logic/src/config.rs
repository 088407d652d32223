//! Arena configuration
//!
//! Read from an optional JSON file (every field may be omitted), then
//! overridden from the environment:
//!
//! - `ARENA_MATCH_ROUNDS`: rounds for a standalone match
//! - `ARENA_TOURNAMENT_ROUNDS`: rounds per tournament match
//! - `ARENA_SEED`: seed for scripted randomness
//! - `ARENA_FUEL`: interpreter steps per decision
//! - `ARENA_TIMEOUT_MS`: per-decision deadline, or `off` to disable it
//! - `ARENA_MEMORY_BYTES`: per-decision allocation budget

use std::env;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::payoff::PayoffMatrix;
use crate::sandbox::SandboxLimits;

pub const DEFAULT_MATCH_ROUNDS: u32 = 50;
pub const DEFAULT_TOURNAMENT_ROUNDS: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArenaConfig {
    pub payoff: PayoffMatrix,
    pub limits: SandboxLimits,
    pub match_rounds: u32,
    pub tournament_rounds: u32,
    pub seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            payoff: PayoffMatrix::STANDARD,
            limits: SandboxLimits::default(),
            match_rounds: DEFAULT_MATCH_ROUNDS,
            tournament_rounds: DEFAULT_TOURNAMENT_ROUNDS,
            seed: 0,
        }
    }
}

impl ArenaConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// File (if any) plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        base.with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| env::var(var).ok())
    }

    /// Apply overrides from any variable source
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
            value.trim().parse().map_err(|_| ConfigError::Env { var, value })
        }

        if let Some(value) = lookup("ARENA_MATCH_ROUNDS") {
            self.match_rounds = parse("ARENA_MATCH_ROUNDS", value)?;
        }
        if let Some(value) = lookup("ARENA_TOURNAMENT_ROUNDS") {
            self.tournament_rounds = parse("ARENA_TOURNAMENT_ROUNDS", value)?;
        }
        if let Some(value) = lookup("ARENA_SEED") {
            self.seed = parse("ARENA_SEED", value)?;
        }
        if let Some(value) = lookup("ARENA_FUEL") {
            self.limits.fuel = parse("ARENA_FUEL", value)?;
        }
        if let Some(value) = lookup("ARENA_TIMEOUT_MS") {
            self.limits.timeout_ms = match value.trim() {
                "off" | "none" => None,
                _ => Some(parse("ARENA_TIMEOUT_MS", value)?),
            };
        }
        if let Some(value) = lookup("ARENA_MEMORY_BYTES") {
            self.limits.memory = parse("ARENA_MEMORY_BYTES", value)?;
        }
        Ok(self)
    }
}
