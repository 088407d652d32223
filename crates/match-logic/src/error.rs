//! Error types
//!
//! `ArenaError` is the only error a caller of the simulation ever sees.
//! `ScriptError` describes why a strategy script was rejected or aborted; it
//! stays inside the sandbox, which turns it into a forced Defect.

use std::time::Duration;
use thiserror::Error;

/// Rejected simulation requests
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ArenaError {
    #[error("Tournament requires at least 2 strategies, got {0}")]
    NotEnoughStrategies(usize),

    #[error("Rounds per match must be positive")]
    InvalidRoundCount,

    #[error("Strategy id '{0}' appears more than once")]
    DuplicateStrategy(String),
}

/// Faults raised while compiling or running a strategy script
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("script exceeds {limit} bytes")]
    SourceTooLong { limit: usize },

    #[error("syntax error at {line}:{column}: {message}")]
    Syntax { line: u32, column: u32, message: String },

    #[error("nesting deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("uncaught throw: {0}")]
    Thrown(String),

    #[error("fuel exhausted after {0} steps")]
    FuelExhausted(u64),

    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("memory budget of {0} bytes exceeded")]
    MemoryExceeded(usize),

    #[error("interpreter panicked")]
    Panicked,
}

/// Failures loading an arena configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("environment variable {var} has invalid value '{value}'")]
    Env { var: &'static str, value: String },
}
