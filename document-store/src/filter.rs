use crate::error::{StoreError, StoreResult};
use serde_json::Value;
use std::cmp::Ordering;

/// A single filter clause. The set of clause kinds is closed on purpose:
/// repositories build specs from typed filters instead of passing duck-typed
/// shapes through the store boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// Top-level field equals the given JSON value; a missing field never matches
    FieldEquals { field: String, value: Value },
    /// Cap the result set after filtering and ordering
    Limit(usize),
    /// Order by a top-level field
    OrderBy { field: String, descending: bool },
}

/// Validated filter specification applied by store backends
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    clauses: Vec<FilterClause>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_equals(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(FilterClause::FieldEquals {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.clauses.push(FilterClause::Limit(limit));
        self
    }

    pub fn order_by(mut self, field: &str, descending: bool) -> Self {
        self.clauses.push(FilterClause::OrderBy {
            field: field.to_string(),
            descending,
        });
        self
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// Reject malformed specs at the boundary rather than matching by accident
    pub fn validate(&self) -> StoreResult<()> {
        let mut limits = 0;
        let mut orderings = 0;
        for clause in &self.clauses {
            match clause {
                FilterClause::FieldEquals { field, .. } | FilterClause::OrderBy { field, .. } => {
                    if field.is_empty() {
                        return Err(StoreError::InvalidFilter("empty field name".to_string()));
                    }
                }
                FilterClause::Limit(_) => limits += 1,
            }
            if matches!(clause, FilterClause::OrderBy { .. }) {
                orderings += 1;
            }
        }
        if limits > 1 {
            return Err(StoreError::InvalidFilter("duplicate limit clause".to_string()));
        }
        if orderings > 1 {
            return Err(StoreError::InvalidFilter("duplicate order clause".to_string()));
        }
        Ok(())
    }

    /// True when every equality clause matches the document
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|clause| match clause {
            FilterClause::FieldEquals { field, value } => doc.get(field) == Some(value),
            _ => true,
        })
    }

    /// Filter, order and cap an in-memory snapshot. Assumes `validate()` passed.
    pub fn apply(&self, docs: Vec<Value>) -> Vec<Value> {
        let mut matched: Vec<Value> = docs.into_iter().filter(|d| self.matches(d)).collect();

        for clause in &self.clauses {
            if let FilterClause::OrderBy { field, descending } = clause {
                matched.sort_by(|a, b| {
                    let ord = compare_fields(a.get(field), b.get(field));
                    if *descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
            }
        }

        for clause in &self.clauses {
            if let FilterClause::Limit(limit) = clause {
                matched.truncate(*limit);
            }
        }

        matched
    }
}

/// Total order over optional JSON scalars: absent < null < bool < number < string < other
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        _ => 4,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equality_against_missing_field_never_matches() {
        let spec = FilterSpec::new().field_equals("status", "draft");
        assert!(!spec.matches(&json!({"other": "draft"})));
        assert!(spec.matches(&json!({"status": "draft"})));
    }

    #[test]
    fn applies_order_and_limit() {
        let spec = FilterSpec::new().order_by("seq", true).limit(2);
        let docs = vec![json!({"seq": 1}), json!({"seq": 3}), json!({"seq": 2})];
        let out = spec.apply(docs);
        assert_eq!(out, vec![json!({"seq": 3}), json!({"seq": 2})]);
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(FilterSpec::new().field_equals("", 1).validate().is_err());
        assert!(FilterSpec::new().limit(1).limit(2).validate().is_err());
        assert!(FilterSpec::new()
            .order_by("a", false)
            .order_by("b", true)
            .validate()
            .is_err());
        assert!(FilterSpec::new().field_equals("a", 1).limit(5).validate().is_ok());
    }
}
