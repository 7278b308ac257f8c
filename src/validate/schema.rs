use jsonschema::Validator;
use serde_json::{Value, json};
use std::sync::LazyLock;

use super::ValidationError;

static CAD_VALIDATOR: LazyLock<Result<Validator, String>> =
    LazyLock::new(|| jsonschema::validator_for(&cad_response_schema()).map_err(|err| err.to_string()));

/// JSON Schema for a successful close-approach response.
pub fn cad_response_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["signature", "count"],
        "properties": {
            "signature": {
                "type": "object",
                "required": ["version", "source"],
                "properties": {
                    "version": {"type": "string"},
                    "source": {"type": "string"}
                }
            },
            "count": {
                "type": ["integer", "string"],
                "minimum": 0,
                "pattern": "^[0-9]+$"
            },
            "fields": {
                "type": "array",
                "items": {"type": "string"}
            },
            "data": {
                "type": "array",
                "items": {
                    "type": "array",
                    "items": {"type": ["string", "number", "null"]}
                }
            }
        }
    })
}

pub fn check_schema(body: &Value) -> Result<(), ValidationError> {
    let validator = CAD_VALIDATOR
        .as_ref()
        .map_err(|err| ValidationError::new("schema", format!("schema does not compile: {err}")))?;

    let errors: Vec<String> = validator.iter_errors(body).map(|err| err.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new("schema", errors.join("; ")))
    }
}
