//! Player-provided game setup.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Genre;

/// Number of vocabulary words a story is built around.
pub const TARGET_WORD_COUNT: usize = 3;

/// Validated player input that starts a session.
///
/// # Invariants
///
/// - `hero_name` is non-empty after trimming
/// - `target_words` holds exactly [`TARGET_WORD_COUNT`] non-blank entries
///
/// # Example
///
/// ```
/// use wordmaster_domain::value_objects::{GameSetup, Genre};
///
/// let setup = GameSetup::new(
///     "Cheolsu",
///     vec!["courage".into(), "adventure".into(), "friendship".into()],
///     Genre::Fantasy,
/// )
/// .unwrap();
///
/// assert_eq!(setup.hero_name(), "Cheolsu");
/// assert_eq!(setup.target_words().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    hero_name: String,
    target_words: Vec<String>,
    genre: Genre,
}

impl GameSetup {
    /// Validate raw player input into a setup.
    ///
    /// Blank entries in `target_words` are dropped before counting, so a
    /// stray empty field does not change the count. Anything other than
    /// exactly three non-blank words is rejected.
    pub fn new(
        hero_name: impl Into<String>,
        target_words: Vec<String>,
        genre: Genre,
    ) -> Result<Self, DomainError> {
        let hero_name = hero_name.into().trim().to_string();
        if hero_name.is_empty() {
            return Err(DomainError::validation("Please enter a hero name!"));
        }

        let target_words: Vec<String> = target_words
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        if target_words.len() != TARGET_WORD_COUNT {
            return Err(DomainError::validation("Please enter all 3 magic words!"));
        }

        Ok(Self {
            hero_name,
            target_words,
            genre,
        })
    }

    #[inline]
    pub fn hero_name(&self) -> &str {
        &self.hero_name
    }

    #[inline]
    pub fn target_words(&self) -> &[String] {
        &self.target_words
    }

    #[inline]
    pub fn genre(&self) -> Genre {
        self.genre
    }
}
