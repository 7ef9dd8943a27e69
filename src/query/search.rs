//! Field and free-text search.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::kind::ResourceKind;
use crate::record::{value_to_string, Record};
use crate::store::StoreState;

/// Parameters that control paging rather than matching.
const RESERVED_PARAMS: &[&str] = &["query", "page", "per_page", "sort_by", "sort_order"];

/// Engine-owned string fields that free text never matches.
const UNSEARCHED_FIELDS: &[&str] = &["url", "created_at", "updated_at"];

/// Constraint key resolved against organization names.
const ORGANIZATION_KEY: &str = "organization";

/// A search over one collection.
///
/// Every field constraint must hold. A constraint value containing `*`
/// matches as a case-insensitive substring with the wildcards removed;
/// without wildcards it must equal the field's string form. Free text
/// matches if any string field contains it, ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    text: Option<String>,
    fields: Vec<(String, String)>,
    kind: Option<ResourceKind>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text fragment.
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        let text = text.trim();
        self.text = (!text.is_empty()).then(|| text.to_string());
        self
    }

    /// Add a field constraint.
    #[must_use]
    pub fn field(mut self, field: &str, value: &str) -> Self {
        self.fields.push((field.to_string(), value.to_string()));
        self
    }

    /// Parse a query string such as `type:user name:*ann* london`.
    ///
    /// `field:value` tokens become constraints, `type:<name>` selects the
    /// searched kind and the remaining tokens form the free text.
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::new();
        let mut words = Vec::new();

        for token in query.split_whitespace() {
            match token.split_once(':') {
                Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                    let value = value.trim_matches('"');
                    if key == "type" {
                        if let Some(kind) = ResourceKind::from_search_type(value) {
                            parsed.kind = Some(kind);
                            continue;
                        }
                    }
                    parsed.fields.push((key.to_string(), value.to_string()));
                }
                _ => words.push(token),
            }
        }

        parsed.text(&words.join(" "))
    }

    /// Build a query from request parameters.
    ///
    /// `query` is parsed with [`SearchQuery::parse`]; every other
    /// non-paging parameter becomes a field constraint.
    pub fn from_params(params: &Map<String, Value>) -> Self {
        let mut parsed = params
            .get("query")
            .map(|q| Self::parse(&value_to_string(q)))
            .unwrap_or_default();

        for (key, value) in params {
            if RESERVED_PARAMS.contains(&key.as_str()) || value.is_null() {
                continue;
            }
            parsed.fields.push((key.clone(), value_to_string(value)));
        }

        parsed
    }

    /// Kind requested with a `type:` token, if any.
    pub fn kind(&self) -> Option<ResourceKind> {
        self.kind
    }

    /// Free-text fragment, if any.
    pub fn text_fragment(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Field constraints in insertion order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Flatten back into request parameters.
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        if let Some(text) = &self.text {
            params.insert("query".to_string(), Value::String(text.clone()));
        }
        for (field, value) in &self.fields {
            params.insert(field.clone(), Value::String(value.clone()));
        }
        params
    }

    /// Keep the candidates matching this query, preserving order.
    pub(crate) fn filter(&self, state: &StoreState, candidates: Vec<Record>) -> Vec<Record> {
        let organizations = self
            .fields
            .iter()
            .find(|(field, _)| field == ORGANIZATION_KEY)
            .map(|(_, name)| organization_ids(state, name));

        candidates
            .into_iter()
            .filter(|record| self.matches(record, organizations.as_ref()))
            .collect()
    }

    fn matches(&self, record: &Record, organizations: Option<&HashSet<u64>>) -> bool {
        let fields_match = self.fields.iter().all(|(field, expected)| {
            if field == ORGANIZATION_KEY {
                return record
                    .get_u64("organization_id")
                    .is_some_and(|id| organizations.is_some_and(|ids| ids.contains(&id)));
            }
            field_matches(record, field, expected)
        });

        fields_match && self.text.as_deref().map_or(true, |text| text_matches(record, text))
    }
}

fn strip_wildcards(value: &str) -> String {
    value.replace('*', "").to_lowercase()
}

fn field_matches(record: &Record, field: &str, expected: &str) -> bool {
    let actual = record.field_string(field);
    if expected.contains('*') {
        actual.to_lowercase().contains(&strip_wildcards(expected))
    } else {
        actual == expected
    }
}

fn text_matches(record: &Record, text: &str) -> bool {
    let needle = strip_wildcards(text);
    if needle.is_empty() {
        return true;
    }
    record.iter().any(|(field, value)| match value {
        Value::String(s) if !UNSEARCHED_FIELDS.contains(&field.as_str()) => {
            s.to_lowercase().contains(&needle)
        }
        _ => false,
    })
}

/// Organizations whose name equals `name` or starts with it, ignoring case.
/// A blank name matches none.
fn organization_ids(state: &StoreState, name: &str) -> HashSet<u64> {
    let prefix = strip_wildcards(name);
    if prefix.trim().is_empty() {
        return HashSet::new();
    }
    state
        .iter(ResourceKind::Organizations)
        .filter(|org| {
            let org_name = org.field_string("name");
            org_name == name || org_name.to_lowercase().starts_with(&prefix)
        })
        .filter_map(Record::id)
        .collect()
}
