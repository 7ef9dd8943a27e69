//! Saved-view condition evaluation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MockError;
use crate::record::{value_to_string, Record};

/// Comparison applied by a view condition.
///
/// Both operands are compared in their string form, so `1` and `"1"` are
/// equal and an absent field compares as `""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "is_not", alias = "is not")]
    IsNot,
}

impl Operator {
    /// Evaluate the operator on coerced operands.
    pub fn apply(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Is => actual == expected,
            Self::IsNot => actual != expected,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Is => "is",
            Self::IsNot => "is_not",
        })
    }
}

impl FromStr for Operator {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "is" => Ok(Self::Is),
            "is_not" | "is not" => Ok(Self::IsNot),
            other => Err(MockError::InvalidRequest(format!("unknown view operator '{other}'"))),
        }
    }
}

/// A single `(field, operator, value)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(field: &str, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value: value.into(),
        }
    }

    /// Shorthand for an `is` condition.
    pub fn is(field: &str, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Is, value)
    }

    /// Shorthand for an `is_not` condition.
    pub fn is_not(field: &str, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::IsNot, value)
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.operator
            .apply(&record.field_string(&self.field), &value_to_string(&self.value))
    }
}

/// The `all`/`any` condition groups of a view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default)]
    pub all: Vec<Condition>,
    #[serde(default)]
    pub any: Vec<Condition>,
}

impl Conditions {
    /// Parse the `conditions` field of a stored view.
    ///
    /// A view without conditions matches everything.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message if the conditions are malformed,
    /// e.g. an unknown operator.
    pub fn from_record(view: &Record) -> Result<Self, String> {
        match view.get("conditions") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| e.to_string()),
        }
    }

    /// Returns true if the record passes both groups.
    pub fn matches(&self, record: &Record) -> bool {
        self.all.iter().all(|c| c.matches(record))
            && (self.any.is_empty() || self.any.iter().any(|c| c.matches(record)))
    }

    /// Filter candidates, preserving their order.
    ///
    /// `all` conditions narrow the candidate set one after another; a
    /// non-empty `any` group then keeps records matching at least one of its
    /// conditions.
    pub fn filter(&self, candidates: Vec<Record>) -> Vec<Record> {
        let narrowed = self.all.iter().fold(candidates, |set, condition| {
            set.into_iter().filter(|r| condition.matches(r)).collect()
        });

        if self.any.is_empty() {
            return narrowed;
        }

        narrowed
            .into_iter()
            .filter(|r| self.any.iter().any(|c| c.matches(r)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ticket(id: u64, status: &str, priority: &str) -> Record {
        Record::try_from(json!({"id": id, "status": status, "priority": priority})).unwrap()
    }

    fn ids(records: &[Record]) -> Vec<u64> {
        records.iter().filter_map(Record::id).collect()
    }

    fn sample() -> Vec<Record> {
        vec![
            ticket(1, "open", "urgent"),
            ticket(2, "open", "low"),
            ticket(3, "solved", "urgent"),
        ]
    }

    #[test]
    fn test_all_group_intersects() {
        let conditions = Conditions {
            all: vec![Condition::is("status", "open")],
            any: vec![],
        };
        assert_eq!(ids(&conditions.filter(sample())), vec![1, 2]);
    }

    #[test]
    fn test_any_group_restricts_further() {
        let conditions = Conditions {
            all: vec![Condition::is("status", "open")],
            any: vec![Condition::is("priority", "urgent")],
        };
        assert_eq!(ids(&conditions.filter(sample())), vec![1]);
    }

    #[test]
    fn test_is_not_and_string_coercion() {
        let conditions = Conditions {
            all: vec![Condition::is_not("status", "open"), Condition::is("id", "3")],
            any: vec![],
        };
        assert_eq!(ids(&conditions.filter(sample())), vec![3]);
    }

    #[test]
    fn test_absent_field_compares_as_empty() {
        let conditions = Conditions {
            all: vec![Condition::is("group_id", "")],
            any: vec![],
        };
        assert_eq!(conditions.filter(sample()).len(), 3);
    }

    #[test]
    fn test_from_record_rejects_unknown_operator() {
        let view = Record::try_from(json!({
            "conditions": {"all": [{"field": "status", "operator": "greater_than", "value": 1}]}
        }))
        .unwrap();
        assert!(Conditions::from_record(&view).is_err());
    }

    #[test]
    fn test_operator_parses_wire_names() {
        assert_eq!("is".parse::<Operator>().unwrap(), Operator::Is);
        assert_eq!("is not".parse::<Operator>().unwrap(), Operator::IsNot);
        assert!("contains".parse::<Operator>().is_err());
    }
}
