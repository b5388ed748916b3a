//! Terminal rendering of step artifacts
//!
//! Artifacts are parsed according to their type and fall back to a plain
//! source view whenever parsing fails. Nothing here panics on bad input.

use std::fmt::Write;
use std::sync::LazyLock;

use colored::Colorize;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::ArtifactType;
use crate::extract::strip_code_fences;

static CHECKBOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*]\s*\[[ xX]\]\s*").expect("checkbox pattern is valid"));

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"));

const DEFAULT_FEATURE_LABEL: &str = "Feature";

/// One cell of a comparison table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Yes,
    No,
    Text(String),
    Missing,
}

impl Cell {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Cell::Missing,
            Some(Value::Bool(true)) => Cell::Yes,
            Some(Value::Bool(false)) => Cell::No,
            Some(Value::String(s)) => Cell::Text(s.clone()),
            Some(other) => Cell::Text(other.to_string()),
        }
    }

    fn plain(&self) -> String {
        match self {
            Cell::Yes => "✓".to_string(),
            Cell::No => "×".to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Missing => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    pub feature: String,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonTable {
    pub title: Option<String>,
    pub feature_label: String,
    pub options: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub text: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Bold(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextLine {
    Heading { level: u8, text: String },
    Paragraph(Vec<Span>),
    Blank,
}

/// An artifact parsed for display
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedArtifact {
    Comparison(ComparisonTable),
    /// Comparison content that could not be parsed; shown as source
    ComparisonFallback { raw: String, reason: String },
    Tree(Value),
    Code(String),
    Checklist(Vec<ChecklistItem>),
    Text(Vec<TextLine>),
}

/// Parse `content` for display as `artifact_type`
pub fn render_artifact(content: &str, artifact_type: &ArtifactType) -> RenderedArtifact {
    debug!(%artifact_type, content_len = content.len(), "render_artifact: called");
    match artifact_type {
        ArtifactType::Comparison => match parse_comparison(content) {
            Ok(table) => RenderedArtifact::Comparison(table),
            Err(reason) => {
                warn!(%reason, "Comparison artifact could not be parsed, showing source");
                RenderedArtifact::ComparisonFallback {
                    raw: content.to_string(),
                    reason,
                }
            }
        },
        ArtifactType::Schema => match serde_json::from_str::<Value>(&strip_code_fences(content)) {
            Ok(value) => RenderedArtifact::Tree(value),
            Err(e) => {
                debug!(error = %e, "render_artifact: schema is not JSON, showing source");
                RenderedArtifact::Code(content.to_string())
            }
        },
        ArtifactType::Checklist => RenderedArtifact::Checklist(parse_checklist(content)),
        ArtifactType::Text => RenderedArtifact::Text(parse_text(content)),
        ArtifactType::Code | ArtifactType::Other(_) => RenderedArtifact::Code(content.to_string()),
    }
}

/// Parse `{title?, featureLabel?, features?, options: [{name, features}]}`
fn parse_comparison(content: &str) -> Result<ComparisonTable, String> {
    let value: Value = serde_json::from_str(&strip_code_fences(content)).map_err(|e| e.to_string())?;
    let options = value
        .get("options")
        .and_then(Value::as_array)
        .ok_or_else(|| "Invalid comparison data format. Expected { options: [...] }".to_string())?;

    let features: Vec<String> = match value.get("features").and_then(Value::as_array) {
        Some(list) => list.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        None => options
            .first()
            .and_then(|o| o.get("features"))
            .and_then(Value::as_object)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default(),
    };

    let rows = features
        .into_iter()
        .map(|feature| {
            let cells = options
                .iter()
                .map(|o| {
                    let value = o
                        .get("features")
                        .and_then(|f| f.get(&feature))
                        .filter(|v| !v.is_null())
                        .or_else(|| o.get(&feature));
                    Cell::from_value(value)
                })
                .collect();
            ComparisonRow { feature, cells }
        })
        .collect();

    Ok(ComparisonTable {
        title: value.get("title").and_then(Value::as_str).map(str::to_string),
        feature_label: value
            .get("featureLabel")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_FEATURE_LABEL)
            .to_string(),
        options: options
            .iter()
            .map(|o| match o.get("name") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            })
            .collect(),
        rows,
    })
}

fn parse_checklist(content: &str) -> Vec<ChecklistItem> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let checked = line.starts_with("- [x]") || line.starts_with("* [x]");
            let text = CHECKBOX.replace(line, "").trim().to_string();
            ChecklistItem {
                text: if text.is_empty() { line.to_string() } else { text },
                checked,
            }
        })
        .collect()
}

fn parse_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in BOLD.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            spans.push(Span::Plain(line[last..whole.start()].to_string()));
        }
        spans.push(Span::Bold(inner.as_str().to_string()));
        last = whole.end();
    }
    if last < line.len() {
        spans.push(Span::Plain(line[last..].to_string()));
    }
    spans
}

fn parse_text(content: &str) -> Vec<TextLine> {
    content
        .lines()
        .map(|line| {
            if let Some(text) = line.strip_prefix("### ") {
                TextLine::Heading { level: 3, text: text.to_string() }
            } else if let Some(text) = line.strip_prefix("## ") {
                TextLine::Heading { level: 2, text: text.to_string() }
            } else if let Some(text) = line.strip_prefix("# ") {
                TextLine::Heading { level: 1, text: text.to_string() }
            } else if line.trim().is_empty() {
                TextLine::Blank
            } else {
                TextLine::Paragraph(parse_spans(line))
            }
        })
        .collect()
}

impl RenderedArtifact {
    /// Colored text for a terminal
    pub fn to_terminal(&self) -> String {
        let mut out = String::new();
        match self {
            RenderedArtifact::Comparison(table) => write_table(&mut out, table),
            RenderedArtifact::ComparisonFallback { raw, .. } => {
                let _ = writeln!(
                    out,
                    "{}",
                    "Error parsing comparison data. Falling back to source view.".red()
                );
                write_code(&mut out, raw);
            }
            RenderedArtifact::Tree(value) => write_tree(&mut out, None, value, 0),
            RenderedArtifact::Code(code) => write_code(&mut out, code),
            RenderedArtifact::Checklist(items) => {
                for item in items {
                    if item.checked {
                        let _ = writeln!(out, "{} {}", "[x]".blue().bold(), item.text.dimmed().strikethrough());
                    } else {
                        let _ = writeln!(out, "[ ] {}", item.text);
                    }
                }
            }
            RenderedArtifact::Text(lines) => {
                for line in lines {
                    match line {
                        TextLine::Heading { level: 1, text } => {
                            let _ = writeln!(out, "{}", text.bold().underline());
                        }
                        TextLine::Heading { text, .. } => {
                            let _ = writeln!(out, "{}", text.bold());
                        }
                        TextLine::Blank => out.push('\n'),
                        TextLine::Paragraph(spans) => {
                            for span in spans {
                                match span {
                                    Span::Plain(s) => out.push_str(s),
                                    Span::Bold(s) => {
                                        let _ = write!(out, "{}", s.bold());
                                    }
                                }
                            }
                            out.push('\n');
                        }
                    }
                }
            }
        }
        out
    }
}

fn write_code(out: &mut String, code: &str) {
    let lines: Vec<&str> = code.lines().collect();
    let width = lines.len().to_string().len();
    for (i, line) in lines.iter().enumerate() {
        let number = format!("{:>width$}", i + 1, width = width);
        let _ = writeln!(out, "{} {}", number.dimmed(), line);
    }
}

fn write_table(out: &mut String, table: &ComparisonTable) {
    if let Some(title) = &table.title {
        let _ = writeln!(out, "{}\n", title.bold());
    }

    let mut widths = vec![table.feature_label.chars().count()];
    widths.extend(table.options.iter().map(|o| o.chars().count()));
    for row in &table.rows {
        widths[0] = widths[0].max(row.feature.chars().count());
        for (i, cell) in row.cells.iter().enumerate() {
            if let Some(w) = widths.get_mut(i + 1) {
                *w = (*w).max(cell.plain().chars().count());
            }
        }
    }

    let pad = |s: &str, width: usize| {
        let fill = width.saturating_sub(s.chars().count());
        format!("{}{}", s, " ".repeat(fill))
    };

    let mut header = pad(&table.feature_label, widths[0]).dimmed().to_string();
    for (i, option) in table.options.iter().enumerate() {
        let _ = write!(header, " | {}", pad(option, widths[i + 1]).bold());
    }
    let _ = writeln!(out, "{}", header);
    let total: usize = widths.iter().sum::<usize>() + 3 * table.options.len();
    let _ = writeln!(out, "{}", "-".repeat(total).dimmed());

    for row in &table.rows {
        let mut line = pad(&row.feature, widths[0]);
        for (i, cell) in row.cells.iter().enumerate() {
            let width = widths.get(i + 1).copied().unwrap_or_default();
            let text = pad(&cell.plain(), width);
            let colored = match cell {
                Cell::Yes => text.green().to_string(),
                Cell::No => text.red().to_string(),
                Cell::Missing => text.dimmed().to_string(),
                Cell::Text(_) => text,
            };
            let _ = write!(line, " | {}", colored);
        }
        let _ = writeln!(out, "{}", line);
    }
}

fn write_tree(out: &mut String, key: Option<&str>, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    let label = key.map(|k| format!("{}: ", k.cyan())).unwrap_or_default();
    match value {
        Value::Object(map) => {
            let _ = writeln!(out, "{}{}{}", indent, label, format!("object[{}]", map.len()).dimmed());
            for (k, v) in map {
                write_tree(out, Some(k), v, depth + 1);
            }
        }
        Value::Array(items) => {
            let _ = writeln!(out, "{}{}{}", indent, label, format!("array[{}]", items.len()).dimmed());
            for (i, v) in items.iter().enumerate() {
                write_tree(out, Some(&i.to_string()), v, depth + 1);
            }
        }
        Value::Bool(b) => {
            let text = b.to_string();
            let text = if *b { text.green() } else { text.red() };
            let _ = writeln!(out, "{}{}{}", indent, label, text);
        }
        Value::Number(n) => {
            let _ = writeln!(out, "{}{}{}", indent, label, n.to_string().magenta());
        }
        Value::String(s) if s.starts_with("http://") || s.starts_with("https://") => {
            let _ = writeln!(out, "{}{}{}", indent, label, s.blue().underline());
        }
        Value::String(s) => {
            let _ = writeln!(out, "{}{}{}", indent, label, s);
        }
        Value::Null => {
            let _ = writeln!(out, "{}{}{}", indent, label, "null".dimmed().italic());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_parsed() {
        let content = r#"```json
{"title": "Laptops", "featureLabel": "Spec", "options": [
  {"name": "Air", "features": {"Weight": "1.2kg", "Touch ID": true, "Fan": false}},
  {"name": "Pro", "features": {"Weight": "1.6kg", "Touch ID": true, "Fan": true}}
]}
```"#;
        let rendered = render_artifact(content, &ArtifactType::Comparison);
        let RenderedArtifact::Comparison(table) = &rendered else {
            panic!("expected table, got {:?}", rendered);
        };

        assert_eq!(table.title.as_deref(), Some("Laptops"));
        assert_eq!(table.feature_label, "Spec");
        assert_eq!(table.options, vec!["Air", "Pro"]);
        let features: Vec<&str> = table.rows.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(features, vec!["Weight", "Touch ID", "Fan"]);
        assert_eq!(table.rows[2].cells, vec![Cell::No, Cell::Yes]);

        let text = rendered.to_terminal();
        assert!(text.contains("✓"));
        assert!(text.contains("×"));
        assert!(text.contains("1.6kg"));
    }

    #[test]
    fn test_comparison_explicit_features_and_missing_cells() {
        let content = r#"{"features": ["Price", "Color"], "options": [
            {"name": "A", "features": {"Price": 10}},
            {"name": "B", "Price": "$12"}
        ]}"#;
        let RenderedArtifact::Comparison(table) = render_artifact(content, &ArtifactType::Comparison) else {
            panic!("expected table");
        };
        assert_eq!(table.feature_label, "Feature");
        assert_eq!(table.rows[0].cells, vec![Cell::Text("10".to_string()), Cell::Text("$12".to_string())]);
        assert_eq!(table.rows[1].cells, vec![Cell::Missing, Cell::Missing]);
    }

    #[test]
    fn test_comparison_fallback_on_invalid_json() {
        let content = "Option A is cheaper, option B is faster.";
        match render_artifact(content, &ArtifactType::Comparison) {
            RenderedArtifact::ComparisonFallback { raw, reason } => {
                assert_eq!(raw, content);
                assert!(!reason.is_empty());
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_fallback_without_options() {
        let rendered = render_artifact(r#"{"title": "x"}"#, &ArtifactType::Comparison);
        assert!(matches!(rendered, RenderedArtifact::ComparisonFallback { .. }));
        assert!(rendered.to_terminal().contains("Falling back to source view"));
    }

    #[test]
    fn test_comparison_empty_options() {
        let RenderedArtifact::Comparison(table) = render_artifact(r#"{"options": []}"#, &ArtifactType::Comparison)
        else {
            panic!("expected table");
        };
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_schema_tree_and_fallback() {
        let tree = render_artifact("```json\n{\"port\": 8080, \"tls\": true}\n```", &ArtifactType::Schema);
        assert!(matches!(tree, RenderedArtifact::Tree(_)));
        assert!(tree.to_terminal().contains("8080"));

        let yaml = "port: 8080\ntls: true";
        assert_eq!(
            render_artifact(yaml, &ArtifactType::Schema),
            RenderedArtifact::Code(yaml.to_string())
        );
    }

    #[test]
    fn test_checklist_items() {
        let content = "- [ ] Buy chicken\n\n- [x] Buy butter\n* [x] Garam masala\n  - [ ]   Rice  \nNote: fresh only";
        let RenderedArtifact::Checklist(items) = render_artifact(content, &ArtifactType::Checklist) else {
            panic!("expected checklist");
        };

        let expected = vec![
            ("Buy chicken", false),
            ("Buy butter", true),
            ("Garam masala", true),
            ("Rice", false),
            ("Note: fresh only", false),
        ];
        let actual: Vec<(&str, bool)> = items.iter().map(|i| (i.text.as_str(), i.checked)).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_text_headings_and_bold() {
        let RenderedArtifact::Text(lines) = render_artifact("# Title\n## Sub\n### Minor\n\nUse **ghee** now", &ArtifactType::Text)
        else {
            panic!("expected text");
        };

        assert_eq!(lines[0], TextLine::Heading { level: 1, text: "Title".to_string() });
        assert_eq!(lines[1], TextLine::Heading { level: 2, text: "Sub".to_string() });
        assert_eq!(lines[2], TextLine::Heading { level: 3, text: "Minor".to_string() });
        assert_eq!(lines[3], TextLine::Blank);
        assert_eq!(
            lines[4],
            TextLine::Paragraph(vec![
                Span::Plain("Use ".to_string()),
                Span::Bold("ghee".to_string()),
                Span::Plain(" now".to_string()),
            ])
        );
    }

    #[test]
    fn test_code_is_verbatim() {
        let code = "fn main() {\n    println!(\"hi\");\n}";
        let rendered = render_artifact(code, &ArtifactType::Code);
        assert_eq!(rendered, RenderedArtifact::Code(code.to_string()));
        assert!(rendered.to_terminal().contains("println!(\"hi\");"));
    }

    #[test]
    fn test_unknown_type_shows_source() {
        let content = "graph TD; A-->B";
        let rendered = render_artifact(content, &ArtifactType::Other("diagram".to_string()));
        assert_eq!(rendered, RenderedArtifact::Code(content.to_string()));
    }
}
