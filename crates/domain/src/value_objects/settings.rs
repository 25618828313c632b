//! Game-rule settings value object
//!
//! Settings are part of the session so the state machine stays a pure
//! function of (state, event); nothing in the reducer reads the environment.

use serde::{Deserialize, Serialize};

/// Configurable game rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Turn on which clearing the quiz wins the game instead of continuing
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

fn default_max_turns() -> u32 {
    10
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

impl GameSettings {
    /// Load from environment variables, using defaults for missing values
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_turns: env_or("WORDMASTER_MAX_TURNS", defaults.max_turns),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
