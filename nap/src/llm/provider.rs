//! Provider selection
//!
//! Decides once, from the credential snapshot, which OpenAI-compatible
//! endpoint, key and model every completion call goes to.

use std::fmt;

use tracing::debug;

use crate::config::{Credentials, LlmConfig};

/// Key prefix identifying an OpenRouter credential
const OPENROUTER_KEY_PREFIX: &str = "sk-or-v1-";

/// The completion providers this engine can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Primary provider, free-tier model
    OpenRouter,
    /// Secondary provider, selected whenever its key is present
    Groq,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::Groq => "groq",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fully resolved routing for completion calls
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Extra headers sent with every request (routing/attribution)
    pub headers: Vec<(String, String)>,
}

impl ProviderSelection {
    /// Model identifier requests are routed to
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSelection")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("headers", &self.headers)
            .finish()
    }
}

/// Pick the provider from the available credentials
///
/// The secondary key wins when present. Otherwise the primary key is used,
/// with OpenRouter's referrer/title headers attached only when the key has
/// OpenRouter's format. Returns `None` when no credential is configured;
/// callers are expected to have gated on that already.
pub fn select_provider(credentials: &Credentials, config: &LlmConfig) -> Option<ProviderSelection> {
    debug!(?credentials, "select_provider: called");

    if let Some(key) = &credentials.groq_api_key {
        debug!("select_provider: secondary credential present, routing to groq");
        return Some(ProviderSelection {
            provider: Provider::Groq,
            base_url: config.groq_base_url.clone(),
            api_key: key.clone(),
            model: config.groq_model.clone(),
            headers: vec![],
        });
    }

    let key = credentials.openrouter_api_key.as_ref()?;
    let headers = if key.starts_with(OPENROUTER_KEY_PREFIX) {
        debug!("select_provider: openrouter key format, attaching routing headers");
        vec![
            ("HTTP-Referer".to_string(), config.referer.clone()),
            ("X-Title".to_string(), config.title.clone()),
        ]
    } else {
        debug!("select_provider: non-openrouter key format, no routing headers");
        vec![]
    };

    Some(ProviderSelection {
        provider: Provider::OpenRouter,
        base_url: config.openrouter_base_url.clone(),
        api_key: key.clone(),
        model: config.openrouter_model.clone(),
        headers,
    })
}
