//! Generated story chapter and its comprehension quiz.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Number of answer options a quiz must offer.
pub const QUIZ_OPTION_COUNT: usize = 3;

/// Fill-in-the-blank quiz attached to a chapter.
///
/// # Invariants
///
/// - `question` and `answer` are non-empty after trimming
/// - `options` holds exactly [`QUIZ_OPTION_COUNT`] non-blank entries
/// - `answer` is one of `options`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    question: String,
    options: Vec<String>,
    answer: String,
}

impl Quiz {
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        answer: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let question = question.into().trim().to_string();
        if question.is_empty() {
            return Err(DomainError::validation("quiz question cannot be empty"));
        }

        let options: Vec<String> = options.into_iter().map(|o| o.trim().to_string()).collect();
        if options.len() != QUIZ_OPTION_COUNT {
            return Err(DomainError::validation(format!(
                "quiz must offer exactly {} options, got {}",
                QUIZ_OPTION_COUNT,
                options.len()
            )));
        }
        if options.iter().any(|o| o.is_empty()) {
            return Err(DomainError::validation("quiz options cannot be blank"));
        }

        let answer = answer.into().trim().to_string();
        if answer.is_empty() {
            return Err(DomainError::validation("quiz answer cannot be empty"));
        }
        if !options.contains(&answer) {
            return Err(DomainError::validation(format!(
                "quiz answer '{}' is not one of the options",
                answer
            )));
        }

        Ok(Self {
            question,
            options,
            answer,
        })
    }

    #[inline]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[inline]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[inline]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Grade a player's pick against the expected answer.
    pub fn is_correct(&self, picked: &str) -> bool {
        self.answer == picked.trim()
    }
}

/// One generated turn of the story.
///
/// Chapters only come to life through the generation contract: the raw
/// storyteller payload is parsed, checked, and normalized before this type
/// is ever constructed.
///
/// # Invariants
///
/// - `title`, `content`, and `summary` are non-empty after trimming
/// - `image_prompt` is either absent or non-blank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    title: String,
    content: String,
    summary: String,
    image_prompt: Option<String>,
    quiz: Quiz,
}

impl Chapter {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        summary: impl Into<String>,
        image_prompt: Option<String>,
        quiz: Quiz,
    ) -> Result<Self, DomainError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("chapter title cannot be empty"));
        }

        let content = content.into().trim().to_string();
        if content.is_empty() {
            return Err(DomainError::validation("chapter content cannot be empty"));
        }

        let summary = summary.into().trim().to_string();
        if summary.is_empty() {
            return Err(DomainError::validation("chapter summary cannot be empty"));
        }

        let image_prompt = image_prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            title,
            content,
            summary,
            image_prompt,
            quiz,
        })
    }

    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    #[inline]
    pub fn image_prompt(&self) -> Option<&str> {
        self.image_prompt.as_deref()
    }

    #[inline]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }
}
