use std::collections::HashMap;
use std::fmt;

use chrono::DateTime;
use serde_json::{Map, Value};

use crate::model::{Model, PropertyKind};

pub const CODE_PRESENCE: &str = "presence";
pub const CODE_FORMAT: &str = "format";

/// Structured validation failure carrying a field -> failure-codes mapping,
/// e.g. `{ "name": ["presence"] }`.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub model: String,
    pub codes: HashMap<String, Vec<String>>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&String> = self.codes.keys().collect();
        fields.sort();
        let details: Vec<String> = fields
            .iter()
            .map(|field| format!("{}: {}", field, self.codes[*field].join(", ")))
            .collect();
        write!(
            f,
            "The `{}` instance is not valid ({})",
            self.model,
            details.join("; ")
        )
    }
}

impl std::error::Error for ValidationError {}

/// Validate a field map against the model's property definitions.
///
/// Checks run after the `before save` notification, so hook mutations are
/// validated, not the caller's original payload. Required properties must be
/// present, non-null and (for strings) non-empty; Date-kinded properties must
/// parse as RFC 3339 timestamps.
pub fn validate(model: &Model, fields: &Map<String, Value>) -> Result<(), ValidationError> {
    let mut codes: HashMap<String, Vec<String>> = HashMap::new();

    for (name, definition) in model.properties() {
        let value = fields.get(name);

        if definition.required && !is_present(value) {
            codes
                .entry(name.clone())
                .or_default()
                .push(CODE_PRESENCE.to_string());
            continue;
        }

        if definition.kind == PropertyKind::Date {
            if let Some(value) = value {
                if !value.is_null() && !parses_as_timestamp(value) {
                    codes
                        .entry(name.clone())
                        .or_default()
                        .push(CODE_FORMAT.to_string());
                }
            }
        }
    }

    if codes.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            model: model.model_name().to_string(),
            codes,
        })
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn parses_as_timestamp(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelBuilder, PropertyDefinition};
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn test_model() -> Model {
        let builder = ModelBuilder::new();
        builder.define(
            "TestModel",
            [
                ("name", PropertyDefinition::string().required()),
                ("born", PropertyDefinition::date()),
            ],
        )
    }

    #[test]
    fn test_presence_of_missing_field() {
        let err = validate(&test_model(), &fields(json!({}))).unwrap_err();
        assert_eq!(err.codes["name"], vec!["presence"]);
    }

    #[test]
    fn test_presence_of_empty_string() {
        let err = validate(&test_model(), &fields(json!({ "name": "" }))).unwrap_err();
        assert_eq!(err.codes["name"], vec!["presence"]);
    }

    #[test]
    fn test_format_of_bad_timestamp() {
        let err = validate(
            &test_model(),
            &fields(json!({ "name": "ok", "born": "yesterday" })),
        )
        .unwrap_err();
        assert_eq!(err.codes["born"], vec!["format"]);
    }

    #[test]
    fn test_valid_fields_pass() {
        let result = validate(
            &test_model(),
            &fields(json!({ "name": "ok", "born": "2024-05-01T12:00:00Z" })),
        );
        assert!(result.is_ok());
    }
}
