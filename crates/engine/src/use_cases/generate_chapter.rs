//! Chapter generation via the storyteller.
//!
//! Turns session state into a prompt, sends it to the configured storyteller,
//! and validates the reply into a [`Chapter`]. Replies are held to a strict
//! JSON contract, with a salvage pass for models that wrap the object in
//! markdown fences or prose.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use wordmaster_domain::{Chapter, FailureKind, GenerationFailure, Genre, Quiz, Session};

use crate::infrastructure::ports::{ChatMessage, StoryPrompt, StorytellerError, StorytellerPort};
use crate::prompt_templates;

/// Default story language when `WORDMASTER_STORY_LANGUAGE` is not set.
pub const DEFAULT_STORY_LANGUAGE: &str = "Korean (Hangul)";

/// Everything the storyteller needs to write the next chapter.
#[derive(Debug, Clone)]
pub struct ChapterRequest {
    /// Name of the hero.
    pub hero_name: String,
    /// The three vocabulary words the chapter must teach.
    pub target_words: Vec<String>,
    /// Selected genre.
    pub genre: Genre,
    /// Summary of the previous chapter, absent on the first turn.
    pub previous_context: Option<String>,
    /// The player's chosen action, absent on the first turn.
    pub user_action: Option<String>,
}

impl ChapterRequest {
    pub fn new(
        hero_name: impl Into<String>,
        target_words: impl IntoIterator<Item = impl Into<String>>,
        genre: Genre,
    ) -> Self {
        Self {
            hero_name: hero_name.into(),
            target_words: target_words.into_iter().map(Into::into).collect(),
            genre,
            previous_context: None,
            user_action: None,
        }
    }

    pub fn with_previous_context(mut self, context: impl Into<String>) -> Self {
        self.previous_context = Some(context.into());
        self
    }

    pub fn with_user_action(mut self, action: impl Into<String>) -> Self {
        self.user_action = Some(action.into());
        self
    }

    /// Build the request for the session's next chapter.
    ///
    /// Returns `None` until a setup has been installed, since there is
    /// nothing to generate before the player has started a game.
    pub fn from_session(session: &Session) -> Option<Self> {
        let setup = session.setup()?;
        Some(Self {
            hero_name: setup.hero_name().to_string(),
            target_words: setup.target_words().to_vec(),
            genre: setup.genre(),
            previous_context: session.previous_summary().map(String::from),
            user_action: session.pending_action().map(String::from),
        })
    }
}

/// Errors from the generation contract.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The reply could not be parsed as JSON at all.
    #[error("malformed storyteller reply: {0}")]
    MalformedResponse(String),
    /// The reply parsed as JSON but did not satisfy the chapter schema.
    #[error("chapter schema violation: {0}")]
    SchemaViolation(String),
    /// The request to the storyteller failed.
    #[error("storyteller request failed: {0}")]
    Transport(String),
    /// The storyteller did not answer in time.
    #[error("storyteller timed out after {0}s")]
    Timeout(u64),
}

impl GenerationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
            Self::SchemaViolation(_) => FailureKind::SchemaViolation,
            Self::Transport(_) => FailureKind::TransportError,
            Self::Timeout(_) => FailureKind::Timeout,
        }
    }

    /// Convert into the domain failure record carried by the session.
    pub fn into_failure(self, failed_at: DateTime<Utc>) -> GenerationFailure {
        let message = self.to_string();
        GenerationFailure::new(self.kind(), message, failed_at)
    }
}

impl From<StorytellerError> for GenerationError {
    fn from(e: StorytellerError) -> Self {
        match e {
            StorytellerError::RequestFailed(msg) => Self::Transport(msg),
            StorytellerError::InvalidResponse(msg) => Self::MalformedResponse(msg),
            StorytellerError::Timeout(secs) => Self::Timeout(secs),
        }
    }
}

/// Generates validated chapters using the storyteller.
pub struct ChapterGenerator {
    storyteller: Arc<dyn StorytellerPort>,
    language: String,
}

impl ChapterGenerator {
    pub fn new(storyteller: Arc<dyn StorytellerPort>) -> Self {
        Self {
            storyteller,
            language: DEFAULT_STORY_LANGUAGE.to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Build a generator from environment variables.
    ///
    /// Uses `WORDMASTER_STORY_LANGUAGE`, falling back to the default.
    pub fn from_env(storyteller: Arc<dyn StorytellerPort>) -> Self {
        let language = std::env::var("WORDMASTER_STORY_LANGUAGE")
            .unwrap_or_else(|_| DEFAULT_STORY_LANGUAGE.to_string());
        Self::new(storyteller).with_language(language)
    }

    /// Generate the next chapter for a request.
    ///
    /// # Returns
    /// * `Ok(Chapter)` - A validated chapter ready to install into the session
    /// * `Err(GenerationError)` - Classified failure for the session's error screen
    pub async fn generate(&self, request: &ChapterRequest) -> Result<Chapter, GenerationError> {
        let system_prompt = self.build_system_prompt();
        let user_message = build_user_message(request);

        let prompt = StoryPrompt::new(vec![ChatMessage::user(user_message)])
            .with_system_prompt(system_prompt)
            .with_temperature(0.8); // Stories should vary between retries

        tracing::debug!(
            hero = %request.hero_name,
            genre = %request.genre,
            "Requesting next chapter from storyteller"
        );

        let response = self.storyteller.generate(prompt).await?;
        let chapter = parse_chapter(&response.content, &request.target_words)?;

        tracing::info!(title = %chapter.title(), "Chapter generated");
        Ok(chapter)
    }

    fn build_system_prompt(&self) -> String {
        prompt_templates::resolve(prompt_templates::keys::STORYTELLER_SYSTEM_PROMPT)
            .unwrap_or_default()
            .replace("{language}", &self.language)
    }
}

fn build_user_message(request: &ChapterRequest) -> String {
    let mut lines = Vec::new();

    if let Some(preamble) =
        prompt_templates::resolve(prompt_templates::keys::STORYTELLER_USER_PREAMBLE)
    {
        lines.push(preamble);
    }
    lines.push(format!("Hero Name: {}", request.hero_name));
    lines.push(format!("Target Words: {}", request.target_words.join(", ")));
    lines.push(format!("Genre: {}", request.genre.display_name()));
    if let Some(context) = &request.previous_context {
        lines.push(format!("Previous Context: {context}"));
    }
    if let Some(action) = &request.user_action {
        lines.push(format!("User Action: {action}"));
    }
    if let Some(reminder) =
        prompt_templates::resolve(prompt_templates::keys::STORYTELLER_USER_REMINDER)
    {
        lines.push(String::new());
        lines.push(reminder);
    }

    lines.join("\n")
}

// =============================================================================
// Reply validation
// =============================================================================

/// Raw wire shape of a storyteller reply, before domain validation.
#[derive(Debug, Deserialize)]
struct RawChapter {
    title: String,
    content: String,
    summary: String,
    #[serde(default)]
    image_prompt: Option<String>,
    quiz: RawQuiz,
}

#[derive(Debug, Deserialize)]
struct RawQuiz {
    question: String,
    options: Vec<String>,
    answer: String,
}

/// Parse and validate a storyteller reply into a [`Chapter`].
pub(crate) fn parse_chapter(
    reply: &str,
    target_words: &[String],
) -> Result<Chapter, GenerationError> {
    let value = parse_json(reply)?;

    let raw: RawChapter = serde_json::from_value(value)
        .map_err(|e| GenerationError::SchemaViolation(e.to_string()))?;

    let quiz = Quiz::new(raw.quiz.question, raw.quiz.options, raw.quiz.answer)
        .map_err(|e| GenerationError::SchemaViolation(e.to_string()))?;

    let content = wrap_target_words(&raw.content, target_words);

    Chapter::new(raw.title, content, raw.summary, raw.image_prompt, quiz)
        .map_err(|e| GenerationError::SchemaViolation(e.to_string()))
}

/// Parse a reply as JSON, salvaging an embedded object if the reply is not
/// bare JSON.
fn parse_json(reply: &str) -> Result<serde_json::Value, GenerationError> {
    let trimmed = reply.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let salvaged = extract_json(trimmed).ok_or_else(|| {
        GenerationError::MalformedResponse("no JSON object in storyteller reply".to_string())
    })?;

    tracing::warn!(
        reply_len = reply.len(),
        "Storyteller reply was not bare JSON, salvaging embedded object"
    );

    serde_json::from_str(&salvaged).map_err(|e| {
        GenerationError::MalformedResponse(format!("salvaged object is not valid JSON: {e}"))
    })
}

/// Extract a JSON object from a reply that may carry markdown fences or prose.
fn extract_json(reply: &str) -> Option<String> {
    if let Some(block) = extract_fenced(reply) {
        return Some(block);
    }
    extract_balanced(reply)
}

/// Pull the contents of the first markdown code fence, skipping a language tag.
fn extract_fenced(reply: &str) -> Option<String> {
    let start = reply.find("```")?;
    let after = &reply[start + 3..];
    let end = after.find("```")?;
    let mut block = after[..end].trim();

    if !block.starts_with('{') {
        let newline = block.find('\n')?;
        block = block[newline + 1..].trim();
    }

    block.starts_with('{').then(|| block.to_string())
}

/// Scan for the first balanced top-level JSON object.
///
/// Tracks string and escape state so braces inside string values do not
/// confuse the depth count. Returns `None` if no object closes.
fn extract_balanced(reply: &str) -> Option<String> {
    let start = reply.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in reply[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(reply[start..=start + offset].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Wrap bare occurrences of each target word in `<b></b>`.
///
/// Occurrences already inside a bold span stay untouched, so applying this
/// to an already well-formed chapter changes nothing.
fn wrap_target_words(content: &str, target_words: &[String]) -> String {
    let mut result = content.to_string();
    for word in target_words {
        result = wrap_word(&result, word);
    }
    result
}

fn wrap_word(content: &str, word: &str) -> String {
    if word.is_empty() {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len() + 16);
    let mut rest = content;

    while let Some(pos) = rest.find(word) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + word.len()..];

        if inside_bold_span(&out) {
            out.push_str(word);
        } else {
            out.push_str("<b>");
            out.push_str(word);
            out.push_str("</b>");
        }
    }

    out.push_str(rest);
    out
}

/// Whether text ending here sits inside an unclosed `<b>` span.
fn inside_bold_span(text: &str) -> bool {
    match (text.rfind("<b>"), text.rfind("</b>")) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{FinishReason, StoryResponse};
    use async_trait::async_trait;

    /// Mock storyteller that returns a configurable reply.
    struct MockStoryteller {
        reply: String,
    }

    impl MockStoryteller {
        fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
            }
        }
    }

    #[async_trait]
    impl StorytellerPort for MockStoryteller {
        async fn generate(&self, _prompt: StoryPrompt) -> Result<StoryResponse, StorytellerError> {
            Ok(StoryResponse {
                content: self.reply.clone(),
                finish_reason: FinishReason::Stop,
                usage: None,
            })
        }
    }

    fn chapter_json() -> &'static str {
        r#"{
  "title": "The Cave of Echoes",
  "content": "Mina raised her <b>lantern</b> and stepped into the dark. She needed all her <b>courage</b> as a <b>shadow</b> slid across the wall.",
  "summary": "Mina entered the cave. A shadow moved along the wall. She kept going anyway.",
  "image_prompt": "A girl holding a lantern at a cave mouth, anime style",
  "quiz": {
    "question": "Mina raised her ___ and stepped into the dark.",
    "options": ["courage", "shadow", "lantern"],
    "answer": "lantern"
  }
}"#
    }

    fn words() -> Vec<String> {
        vec![
            "courage".to_string(),
            "shadow".to_string(),
            "lantern".to_string(),
        ]
    }

    fn request() -> ChapterRequest {
        ChapterRequest::new("Mina", ["courage", "shadow", "lantern"], Genre::Fantasy)
    }

    #[tokio::test]
    async fn test_generates_chapter_from_bare_json() {
        let generator = ChapterGenerator::new(Arc::new(MockStoryteller::new(chapter_json())));

        let chapter = generator.generate(&request()).await.unwrap();

        assert_eq!(chapter.title(), "The Cave of Echoes");
        assert_eq!(chapter.quiz().answer(), "lantern");
        assert!(chapter.image_prompt().is_some());
    }

    #[tokio::test]
    async fn test_salvages_chapter_from_fenced_reply() {
        let reply = format!("Here is your chapter!\n```json\n{}\n```\nEnjoy!", chapter_json());
        let generator = ChapterGenerator::new(Arc::new(MockStoryteller::new(reply)));

        let chapter = generator.generate(&request()).await.unwrap();
        assert_eq!(chapter.title(), "The Cave of Echoes");
    }

    #[tokio::test]
    async fn test_prompt_sent_to_storyteller_carries_setup() {
        use crate::infrastructure::ports::MockStorytellerPort;

        let mut mock = MockStorytellerPort::new();
        mock.expect_generate()
            .withf(|prompt| {
                let system = prompt.system_prompt.as_deref().unwrap_or_default();
                let user = &prompt.messages[0].content;
                system.contains("**Language**: English.")
                    && user.contains("Hero Name: Mina")
                    && user.contains("Genre: Fantasy")
            })
            .returning(|_| {
                Ok(StoryResponse {
                    content: chapter_json().to_string(),
                    finish_reason: FinishReason::Stop,
                    usage: None,
                })
            });

        let generator = ChapterGenerator::new(Arc::new(mock)).with_language("English");
        let chapter = generator.generate(&request()).await.unwrap();
        assert_eq!(chapter.title(), "The Cave of Echoes");
    }

    #[tokio::test]
    async fn test_transport_errors_carry_their_kind() {
        struct BrokenStoryteller;

        #[async_trait]
        impl StorytellerPort for BrokenStoryteller {
            async fn generate(
                &self,
                _prompt: StoryPrompt,
            ) -> Result<StoryResponse, StorytellerError> {
                Err(StorytellerError::RequestFailed("connection refused".to_string()))
            }
        }

        let generator = ChapterGenerator::new(Arc::new(BrokenStoryteller));
        let err = generator.generate(&request()).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::TransportError);
    }

    #[test]
    fn test_parse_accepts_prose_wrapped_object() {
        let reply = format!("Sure thing, here it comes: {} hope you like it", chapter_json());
        let chapter = parse_chapter(&reply, &words()).unwrap();
        assert_eq!(chapter.title(), "The Cave of Echoes");
    }

    #[test]
    fn test_braces_inside_strings_do_not_end_the_scan() {
        let reply = r#"note before {"title": "Braces {inside} strings", "content": "A <b>shadow</b> with <b>courage</b> and a <b>lantern</b>.", "summary": "s", "quiz": {"question": "q", "options": ["courage", "shadow", "lantern"], "answer": "shadow"}} note after"#;
        let chapter = parse_chapter(reply, &words()).unwrap();
        assert_eq!(chapter.title(), "Braces {inside} strings");
    }

    #[test]
    fn test_reply_without_json_is_malformed() {
        let err = parse_chapter("Once upon a time there was no JSON.", &words()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::MalformedResponse);
    }

    #[test]
    fn test_truncated_json_is_malformed() {
        let truncated = &chapter_json()[..120];
        let err = parse_chapter(truncated, &words()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::MalformedResponse);
    }

    #[test]
    fn test_missing_field_is_schema_violation() {
        let reply = r#"{"title": "t", "content": "c", "quiz": {"question": "q", "options": ["a", "b", "c"], "answer": "a"}}"#;
        let err = parse_chapter(reply, &words()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::SchemaViolation);
    }

    #[test]
    fn test_answer_outside_options_is_schema_violation() {
        let reply = r#"{"title": "t", "content": "c", "summary": "s", "quiz": {"question": "q", "options": ["courage", "shadow", "lantern"], "answer": "dragon"}}"#;
        let err = parse_chapter(reply, &words()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::SchemaViolation);
    }

    #[test]
    fn test_wrong_option_count_is_schema_violation() {
        let reply = r#"{"title": "t", "content": "c", "summary": "s", "quiz": {"question": "q", "options": ["courage", "shadow"], "answer": "courage"}}"#;
        let err = parse_chapter(reply, &words()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::SchemaViolation);
    }

    #[test]
    fn test_bare_target_words_get_wrapped() {
        let content = "She found her courage near the lantern.";
        let wrapped = wrap_target_words(content, &words());
        assert_eq!(
            wrapped,
            "She found her <b>courage</b> near the <b>lantern</b>."
        );
    }

    #[test]
    fn test_wrapping_is_idempotent() {
        let content = "A <b>shadow</b> crossed the courage of the hero.";
        let once = wrap_target_words(content, &words());
        let twice = wrap_target_words(&once, &words());
        assert_eq!(once, twice);
        assert_eq!(once, "A <b>shadow</b> crossed the <b>courage</b> of the hero.");
    }

    #[test]
    fn test_words_inside_longer_bold_spans_stay_untouched() {
        let content = "<b>The shadow king</b> waited.";
        let wrapped = wrap_target_words(content, &words());
        assert_eq!(wrapped, "<b>The shadow king</b> waited.");
    }

    #[test]
    fn test_user_message_carries_context_and_action() {
        let request = request()
            .with_previous_context("Mina entered the cave.")
            .with_user_action("Follow the shadow");

        let message = build_user_message(&request);

        assert!(message.contains("Hero Name: Mina"));
        assert!(message.contains("Target Words: courage, shadow, lantern"));
        assert!(message.contains("Genre: Fantasy"));
        assert!(message.contains("Previous Context: Mina entered the cave."));
        assert!(message.contains("User Action: Follow the shadow"));
    }

    #[test]
    fn test_first_turn_message_omits_empty_lines() {
        let message = build_user_message(&request());

        assert!(!message.contains("Previous Context:"));
        assert!(!message.contains("User Action:"));
    }

    #[test]
    fn test_system_prompt_carries_language() {
        let generator = ChapterGenerator::new(Arc::new(MockStoryteller::new("")))
            .with_language("English");

        let prompt = generator.build_system_prompt();
        assert!(prompt.contains("**Language**: English."));
        assert!(!prompt.contains("{language}"));
    }

    #[test]
    fn test_request_from_session_uses_latest_summary_and_action() {
        use wordmaster_domain::{GameSettings, GameSetup, SessionEvent};

        let setup = GameSetup::new("Mina", words(), Genre::Fantasy).unwrap();
        let chapter = parse_chapter(chapter_json(), &words()).unwrap();

        let session = Session::new(GameSettings::default())
            .dispatch(SessionEvent::Start(setup))
            .dispatch(SessionEvent::ChapterReady(chapter))
            .dispatch(SessionEvent::Advance)
            .dispatch(SessionEvent::AnswerCorrect)
            .dispatch(SessionEvent::SubmitAction("Go deeper".to_string()));

        let request = ChapterRequest::from_session(&session).unwrap();

        assert_eq!(request.hero_name, "Mina");
        assert_eq!(
            request.previous_context.as_deref(),
            Some("Mina entered the cave. A shadow moved along the wall. She kept going anyway.")
        );
        assert_eq!(request.user_action.as_deref(), Some("Go deeper"));
    }
}
