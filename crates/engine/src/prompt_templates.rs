//! Configurable storyteller prompt templates used by the engine.

#![allow(dead_code)]

/// All prompt template keys as constants.
pub mod keys {
    /// System prompt establishing the storyteller role and the JSON contract.
    pub const STORYTELLER_SYSTEM_PROMPT: &str = "storyteller.system_prompt";
    /// First line of the user message, before the request parameters.
    pub const STORYTELLER_USER_PREAMBLE: &str = "storyteller.user_preamble";
    /// Closing line of the user message, repeated on every turn.
    pub const STORYTELLER_USER_REMINDER: &str = "storyteller.user_reminder";
}

/// Default values for all prompt templates.
pub mod defaults {
    /// System prompt for chapter generation.
    ///
    /// `{language}` is replaced with the configured story language before use.
    pub const STORYTELLER_SYSTEM_PROMPT: &str = r#"**Role**: You are a JSON-speaking novelist engine for 5th graders. You write interactive stories where the user decides the next action.

## Output Format
**Strict JSON only**. You MUST respond with ONLY valid JSON, no other text.
```json
{
  "title": "String (Chapter Title)",
  "content": "String (Story text with <b>tags</b>)",
  "summary": "String (CRITICAL: A 3-sentence summary of THIS chapter to be used as context for the NEXT chapter)",
  "image_prompt": "String (An English description of the current scene to generate an illustration. Style: Anime/Webtoon)",
  "quiz": {
    "question": "String (Related to this chapter)",
    "options": ["String", "String", "String"],
    "answer": "String"
  }
}
```

## Constraints
1.  **Length**: ~600 characters.
2.  **Target Words**: You MUST include ALL 3 target words naturally.
3.  **Highlighting**: Wrap every occurrence of the target words with `<b>` and `</b>`.
4.  **Quiz**:
    * Create 1 fill-in-the-blank question based on the story context.
    * The blank should be one of the target words.
    * Provide 3 options (the target words).
    * The `answer` must be one of the strings in `options`.
5.  **Language**: {language}.
6.  **Tone**: Exciting, immersive, suitable for 10-12 year olds (RPG style).
7.  **Continuity**:
    * If `Previous Context` is provided, continue the story from there.
    * If `User Action` is provided, incorporate it into the narrative immediately.

IMPORTANT: Return ONLY the JSON object, nothing else."#;

    /// Opening line of the user message.
    pub const STORYTELLER_USER_PREAMBLE: &str = "Generate a story with these parameters:";

    /// Closing line of the user message.
    pub const STORYTELLER_USER_REMINDER: &str =
        "Remember: Return ONLY valid JSON, no markdown code blocks or other text.";
}

/// Convert a template key to its environment variable name.
pub fn key_to_env_var(key: &str) -> String {
    format!("WORDMASTER_PROMPT_{}", key.to_uppercase().replace('.', "_"))
}

/// Get the default value for a template key.
pub fn get_default(key: &str) -> Option<&'static str> {
    match key {
        keys::STORYTELLER_SYSTEM_PROMPT => Some(defaults::STORYTELLER_SYSTEM_PROMPT),
        keys::STORYTELLER_USER_PREAMBLE => Some(defaults::STORYTELLER_USER_PREAMBLE),
        keys::STORYTELLER_USER_REMINDER => Some(defaults::STORYTELLER_USER_REMINDER),
        _ => None,
    }
}

/// Resolve a template: environment override if set, otherwise the default.
pub fn resolve(key: &str) -> Option<String> {
    std::env::var(key_to_env_var(key))
        .ok()
        .or_else(|| get_default(key).map(String::from))
}

/// Get all known template keys.
pub fn all_keys() -> Vec<&'static str> {
    vec![
        keys::STORYTELLER_SYSTEM_PROMPT,
        keys::STORYTELLER_USER_PREAMBLE,
        keys::STORYTELLER_USER_REMINDER,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_to_env_var() {
        assert_eq!(
            key_to_env_var(keys::STORYTELLER_SYSTEM_PROMPT),
            "WORDMASTER_PROMPT_STORYTELLER_SYSTEM_PROMPT"
        );
    }

    #[test]
    fn test_every_key_has_a_default() {
        for key in all_keys() {
            assert!(get_default(key).is_some(), "missing default for {key}");
        }
    }

    #[test]
    fn test_unknown_key_has_no_default() {
        assert!(get_default("storyteller.nonexistent").is_none());
    }

    #[test]
    fn test_system_prompt_states_the_contract() {
        let prompt = defaults::STORYTELLER_SYSTEM_PROMPT;
        assert!(prompt.contains("{language}"));
        assert!(prompt.contains("\"quiz\""));
        assert!(prompt.contains("<b>"));
        assert!(prompt.contains("ONLY the JSON object"));
    }
}
