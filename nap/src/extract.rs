//! JSON-from-prose extraction
//!
//! Completions are supposed to be bare JSON but routinely arrive wrapped in
//! prose, code fences or reasoning tags. Extraction runs as an explicit
//! pipeline so each stage can be tested on its own:
//!
//! ```text
//! raw text ─► strip_reasoning (optional) ─► locate_object ─► serde_json
//!                                              │ none
//!                                              └─► strip_code_fences
//! ```

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

static REASONING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<thought>.*?</thought>").expect("reasoning pattern is valid"));

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```json\n?|```").expect("fence pattern is valid"));

/// Which noise patterns to remove before locating the object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Noise {
    /// Only code fences (handled by the fallback stage)
    #[default]
    Fences,
    /// `<thought>` sections as well, removed before anything else
    FencesAndReasoning,
}

/// Why no JSON value could be recovered
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Empty response from AI")]
    Empty,

    #[error("{source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        /// The text handed to the parser, kept for diagnostics
        candidate: String,
    },
}

impl ExtractError {
    /// The text that failed to parse, if parsing was attempted
    pub fn candidate(&self) -> Option<&str> {
        match self {
            ExtractError::Empty => None,
            ExtractError::Parse { candidate, .. } => Some(candidate),
        }
    }
}

/// Remove every `<thought>…</thought>` section, tags included
pub fn strip_reasoning(text: &str) -> Cow<'_, str> {
    let stripped = REASONING.replace_all(text, "");
    if let Cow::Owned(_) = stripped {
        debug!("strip_reasoning: removed reasoning sections");
    }
    stripped
}

/// Remove code-fence markers (```` ```json ```` and bare ```` ``` ````) and trim
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Locate the object span: first `{` through last `}`
///
/// The match is greedy across the whole text, lines included, so nested
/// objects and braces inside strings never cut the span short.
pub fn locate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Produce the text that will be handed to the JSON parser
pub fn json_candidate(text: &str, noise: Noise) -> String {
    let cleaned = match noise {
        Noise::Fences => Cow::Borrowed(text),
        Noise::FencesAndReasoning => {
            let stripped = strip_reasoning(text);
            match stripped {
                Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
                Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
            }
        }
    };

    match locate_object(&cleaned) {
        Some(span) => {
            debug!(span_len = span.len(), "json_candidate: extracted object span");
            span.to_string()
        }
        None => {
            debug!("json_candidate: no object span, falling back to fence stripping");
            strip_code_fences(&cleaned)
        }
    }
}

/// Run the full pipeline and parse the result
pub fn extract_json(text: &str, noise: Noise) -> Result<Value, ExtractError> {
    debug!(text_len = text.len(), ?noise, "extract_json: called");
    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    let candidate = json_candidate(text, noise);
    serde_json::from_str(&candidate).map_err(|source| ExtractError::Parse { source, candidate })
}
