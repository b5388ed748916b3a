//! Requirements analysis results

use serde::{Deserialize, Serialize};

use super::lenient;

/// Input kind of a clarification field
///
/// Only closed-choice fields are requested. Anything else the model sends
/// back is carried through untouched so callers can decide what to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum FieldKind {
    #[default]
    Select,
    Other(String),
}

impl From<String> for FieldKind {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("select") {
            FieldKind::Select
        } else {
            FieldKind::Other(s)
        }
    }
}

impl<'de> Deserialize<'de> for FieldKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(lenient::optional_string(deserializer)?.map(FieldKind::from).unwrap_or_default())
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Select => "select".to_string(),
            FieldKind::Other(s) => s,
        }
    }
}

/// A closed-choice preference dimension the analyzer found missing
///
/// Decoding never fails on an object: mistyped members are coerced where
/// the reading is obvious (`1` as id `"1"`, `"yes"` as `true`) and take
/// their default otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationField {
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub id: String,

    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub label: String,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub required: bool,

    #[serde(rename = "type", default)]
    pub kind: FieldKind,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub options: Vec<String>,
}

impl ClarificationField {
    /// Closed-choice fields need at least one option to pick from
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            FieldKind::Select => !self.options.is_empty(),
            FieldKind::Other(_) => true,
        }
    }

    /// Label to show, falling back to the id when the model left it blank
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() { &self.id } else { &self.label }
    }
}

/// Whether a goal needs clarification before compilation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsVerdict {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub needs_more_info: bool,

    #[serde(default, deserialize_with = "lenient::optional_string", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// `None` when absent or not a list; entries that are not objects are dropped
    #[serde(default, deserialize_with = "lenient::object_list", skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<ClarificationField>>,
}

impl RequirementsVerdict {
    /// Fields to ask about; empty when none were sent
    pub fn fields(&self) -> &[ClarificationField] {
        self.fields.as_deref().unwrap_or_default()
    }
}
