use serde_json::Value;

use crate::domain::{CadResponse, keys};

use super::ValidationError;

pub fn check_required_keys(body: &Value, required: &[&str]) -> Result<(), ValidationError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| body.get(key).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(
            "required_keys",
            format!("expected key(s) not found in response: {}", missing.join(", ")),
        ))
    }
}

pub fn check_has_data(response: &CadResponse) -> Result<(), ValidationError> {
    if response.data.is_none() {
        return Err(ValidationError::new("has_data", "expected 'data' key missing"));
    }
    if response.count == 0 || response.rows().is_empty() {
        return Err(ValidationError::new(
            "has_data",
            format!("expected count > 0 but got {}", response.count),
        ));
    }
    Ok(())
}

pub fn check_empty_result(response: &CadResponse) -> Result<(), ValidationError> {
    if response.count != 0 {
        return Err(ValidationError::new(
            "empty_result",
            format!("expected count == 0, but got {}", response.count),
        ));
    }
    if !response.rows().is_empty() {
        return Err(ValidationError::new(
            "empty_result",
            format!("expected no data, but got {} rows", response.rows().len()),
        ));
    }
    Ok(())
}

/// `message` must contain `expected`, ignoring case.
pub fn check_error_message(body: &Value, expected: &str) -> Result<(), ValidationError> {
    let message = body
        .get(keys::MESSAGE)
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::new("error_message", "response has no 'message' string"))?;

    if message.to_lowercase().contains(&expected.to_lowercase()) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "error_message",
            format!("expected '{expected}' in message, actual: '{message}'"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(count: u64, data: Option<Vec<Vec<Value>>>) -> CadResponse {
        serde_json::from_value(json!({
            "signature": {"version": "1.5", "source": "NASA/JPL SBDB Close Approach Data API"},
            "count": count,
            "data": data,
        }))
        .expect("response")
    }

    #[test]
    fn required_keys_lists_every_missing_key() {
        let body = json!({"count": 0, "signature": {}});
        assert!(check_required_keys(&body, &[keys::COUNT, keys::SIGNATURE]).is_ok());

        let err = check_required_keys(&body, &[keys::COUNT, keys::FIELDS, keys::DATA]).expect_err("missing");
        assert!(err.message.ends_with("fields, data"));
    }

    #[test]
    fn empty_and_populated_results() {
        let empty = response(0, None);
        assert!(check_empty_result(&empty).is_ok());
        assert!(check_has_data(&empty).is_err());

        let populated = response(1, Some(vec![vec![json!("2024 AV2")]]));
        assert!(check_has_data(&populated).is_ok());
        assert!(check_empty_result(&populated).is_err());
    }

    #[test]
    fn error_message_match_ignores_case() {
        let body = json!({"message": "Invalid object kind", "code": "400"});
        assert!(check_error_message(&body, "invalid object kind").is_ok());
        assert!(check_error_message(&body, "not recognized").is_err());
        assert!(check_error_message(&json!({"count": 0}), "invalid").is_err());
    }
}
