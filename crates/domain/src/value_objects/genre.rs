//! Story genre selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Genre of the generated story.
///
/// The genre shapes the storyteller prompt; the state machine treats it as
/// opaque configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    /// Swords, magic, and quests
    #[default]
    Fantasy,
    /// Spaceships and future tech
    SciFi,
    /// Ghost stories set in school hallways
    SchoolHorror,
}

impl Genre {
    /// Get all genres for selection menus
    pub fn all() -> &'static [Genre] {
        &[Genre::Fantasy, Genre::SciFi, Genre::SchoolHorror]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fantasy => "fantasy",
            Genre::SciFi => "sci-fi",
            Genre::SchoolHorror => "school-horror",
        }
    }

    /// Get a display name for the genre
    pub fn display_name(&self) -> &'static str {
        match self {
            Genre::Fantasy => "Fantasy",
            Genre::SciFi => "Science Fiction",
            Genre::SchoolHorror => "School Horror",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Genre {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fantasy" => Ok(Genre::Fantasy),
            "sci-fi" | "scifi" | "sf" | "science fiction" => Ok(Genre::SciFi),
            "school-horror" | "horror" | "school horror" => Ok(Genre::SchoolHorror),
            _ => Err(DomainError::parse(format!("Unknown genre: {}", s))),
        }
    }
}
