//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Requirements analysis system prompt
pub const ANALYZE: &str = include_str!("../../prompts/analyze.pmt");

/// Graph compilation system prompt
pub const COMPILE: &str = include_str!("../../prompts/compile.pmt");

/// Artifact generation system prompt
pub const ARTIFACT: &str = include_str!("../../prompts/artifact.pmt");

/// Artifact generation user message template
pub const ARTIFACT_REQUEST: &str = include_str!("../../prompts/artifact-request.pmt");

/// Every embedded template name
pub const NAMES: [&str; 4] = ["analyze", "compile", "artifact", "artifact-request"];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "analyze" => Some(ANALYZE),
        "compile" => Some(COMPILE),
        "artifact" => Some(ARTIFACT),
        "artifact-request" => Some(ARTIFACT_REQUEST),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_analyze() {
        let prompt = get_embedded("analyze").unwrap();
        assert!(prompt.contains("needsMoreInfo"));
        assert!(prompt.contains("Spice Level"));
        assert!(prompt.contains("Target Audience"));
        assert!(prompt.contains("\"select\""));
    }

    #[test]
    fn test_get_embedded_compile() {
        let prompt = get_embedded("compile").unwrap();
        assert!(prompt.contains("EXACTLY 4-7 steps"));
        assert!(prompt.contains("terminalState"));
        for artifact_type in ["text", "code", "schema", "checklist", "comparison"] {
            assert!(prompt.contains(&format!("\"{}\"", artifact_type)), "missing {}", artifact_type);
        }
    }

    #[test]
    fn test_get_embedded_artifact() {
        let prompt = get_embedded("artifact").unwrap();
        assert!(prompt.contains("- [ ] task"));
        assert!(prompt.contains("featureLabel"));
    }

    #[test]
    fn test_all_names_resolve() {
        for name in NAMES {
            assert!(get_embedded(name).is_some(), "{} not embedded", name);
        }
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
