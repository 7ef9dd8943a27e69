//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output
//! as an alternative to JSON serialization, and table rows for lists.

use serde_json::Value;
use tabled::Tabled;

use crate::engine::Response;
use crate::kind::ResourceKind;
use crate::record::{value_to_string, Record};

/// Trait for human-readable key-value output.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

/// Fields shown first, in this order, when present.
const LEADING_FIELDS: &[&str] = &["id", "name", "title", "subject", "email", "status", "url"];

impl PrettyPrint for Record {
    fn pretty_print(&self) -> String {
        let header = format!("Record #{}", self.id().unwrap_or_default());
        let divider = "─".repeat(header.len().max(30));
        let mut lines = vec![header, divider];

        let leading = LEADING_FIELDS
            .iter()
            .filter_map(|field| self.get(field).map(|value| (*field, value)));
        let rest = self
            .iter()
            .filter(|(field, _)| !LEADING_FIELDS.contains(&field.as_str()))
            .map(|(field, value)| (field.as_str(), value));

        for (field, value) in leading.chain(rest) {
            if value.is_null() {
                continue;
            }
            lines.push(format!("{:<16}{}", format!("{field}:"), display(value)));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for Response {
    fn pretty_print(&self) -> String {
        let status = format!("HTTP {}", self.status);
        let Value::Object(body) = &self.body else {
            return status;
        };

        let mut lines = vec![status];
        for (key, value) in body {
            match value {
                Value::Object(_) if key == "details" => {
                    lines.push(format!("{key}: {value}"));
                }
                Value::Object(_) => {
                    if let Ok(record) = Record::try_from(value.clone()) {
                        lines.push(record.pretty_print());
                    }
                }
                Value::Array(items) => {
                    let rows: Vec<RecordRow> = items
                        .iter()
                        .filter_map(|v| Record::try_from(v.clone()).ok())
                        .map(|r| RecordRow::from(&r))
                        .collect();
                    lines.push(tabled::Table::new(rows).to_string());
                }
                Value::Null => {}
                other => lines.push(format!("{key}: {}", display(other))),
            }
        }

        lines.join("\n")
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => value.to_string(),
        other => value_to_string(other),
    }
}

/// One table row per record.
#[derive(Tabled)]
pub struct RecordRow {
    pub id: u64,
    pub label: String,
    pub updated_at: String,
}

impl From<&Record> for RecordRow {
    fn from(record: &Record) -> Self {
        let label = ["name", "title", "subject", "value", "body", "locale"]
            .iter()
            .map(|field| record.field_string(field))
            .find(|s| !s.is_empty())
            .unwrap_or_default();
        Self {
            id: record.id().unwrap_or_default(),
            label,
            updated_at: record.field_string("updated_at"),
        }
    }
}

/// One table row per resource kind.
#[derive(Tabled)]
pub struct KindRow {
    pub kind: String,
    pub path: String,
    #[tabled(rename = "model root")]
    pub model_root: String,
}

impl From<ResourceKind> for KindRow {
    fn from(kind: ResourceKind) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            path: kind.path().to_string(),
            model_root: kind.model_root().to_string(),
        }
    }
}
