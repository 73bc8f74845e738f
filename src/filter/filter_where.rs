use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;

/// In-memory evaluation of where clauses against record field maps.
///
/// A clause is a JSON object of conditions, all of which must hold. A field
/// condition is either a literal (deep equality) or an object of operator
/// conditions; `and`/`or` take arrays of nested clauses.
pub struct FilterWhere;

impl FilterWhere {
    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        if where_data.is_null() {
            return Ok(());
        }
        match where_data {
            Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause(
                "WHERE must be an object".to_string(),
            )),
        }
    }

    pub fn matches(where_data: &Value, record: &Map<String, Value>) -> Result<bool, FilterError> {
        let conditions = match where_data {
            Value::Null => return Ok(true),
            Value::Object(conditions) => conditions,
            _ => {
                return Err(FilterError::InvalidWhereClause(
                    "WHERE must be an object".to_string(),
                ))
            }
        };

        for (key, expected) in conditions {
            let matched = match key.as_str() {
                "and" => Self::logical_matches(expected, record, true)?,
                "or" => Self::logical_matches(expected, record, false)?,
                field => Self::field_matches(field, expected, record)?,
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn logical_matches(
        clauses: &Value,
        record: &Map<String, Value>,
        require_all: bool,
    ) -> Result<bool, FilterError> {
        let clauses = clauses.as_array().ok_or_else(|| {
            FilterError::InvalidOperatorData("and/or requires an array of clauses".to_string())
        })?;

        for clause in clauses {
            let matched = Self::matches(clause, record)?;
            if require_all && !matched {
                return Ok(false);
            }
            if !require_all && matched {
                return Ok(true);
            }
        }
        // all matched, or none of the alternatives did
        Ok(require_all || clauses.is_empty())
    }

    fn field_matches(
        field: &str,
        expected: &Value,
        record: &Map<String, Value>,
    ) -> Result<bool, FilterError> {
        let actual = record.get(field).unwrap_or(&Value::Null);

        // A non-empty object is an operator spec (all conditions must hold);
        // anything else compares by deep equality.
        if let Value::Object(ops) = expected {
            if !ops.is_empty() {
                for (op, operand) in ops {
                    if !Self::op_matches(op, actual, operand)? {
                        return Ok(false);
                    }
                }
                return Ok(true);
            }
        }

        Ok(actual == expected)
    }

    fn op_matches(op: &str, actual: &Value, operand: &Value) -> Result<bool, FilterError> {
        Ok(match op {
            "neq" | "ne" => actual != operand,
            "gt" => Self::compare(actual, operand) == Some(Ordering::Greater),
            "gte" => matches!(
                Self::compare(actual, operand),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            "lt" => Self::compare(actual, operand) == Some(Ordering::Less),
            "lte" => matches!(
                Self::compare(actual, operand),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
            "between" => {
                let bounds = operand.as_array().filter(|a| a.len() == 2).ok_or_else(|| {
                    FilterError::InvalidOperatorData(
                        "between requires a two-element array".to_string(),
                    )
                })?;
                matches!(
                    Self::compare(actual, &bounds[0]),
                    Some(Ordering::Greater) | Some(Ordering::Equal)
                ) && matches!(
                    Self::compare(actual, &bounds[1]),
                    Some(Ordering::Less) | Some(Ordering::Equal)
                )
            }
            "inq" | "in" => {
                let candidates = operand.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData("inq requires an array".to_string())
                })?;
                candidates.contains(actual)
            }
            "nin" => {
                let candidates = operand.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData("nin requires an array".to_string())
                })?;
                !candidates.contains(actual)
            }
            "like" => Self::like_matches(actual, operand),
            "nlike" => !Self::like_matches(actual, operand),
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    /// Ordering across JSON values: numbers compare numerically, strings
    /// lexicographically (RFC 3339 timestamps sort chronologically this way).
    /// Mixed or non-ordered kinds do not compare.
    pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }

    fn like_matches(actual: &Value, pattern: &Value) -> bool {
        match (actual.as_str(), pattern.as_str()) {
            (Some(text), Some(pattern)) => {
                let text: Vec<char> = text.chars().collect();
                let pattern: Vec<char> = pattern.chars().collect();
                Self::wildcard(&text, &pattern)
            }
            _ => false,
        }
    }

    // SQL-style wildcards: '%' matches any run, '_' exactly one character
    fn wildcard(text: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => text.is_empty(),
            Some((&'%', rest)) => (0..=text.len()).any(|i| Self::wildcard(&text[i..], rest)),
            Some((&'_', rest)) => !text.is_empty() && Self::wildcard(&text[1..], rest),
            Some((c, rest)) => text.first() == Some(c) && Self::wildcard(&text[1..], rest),
        }
    }
}
