use serde_json::{json, Map, Value};

pub const REDACTED: &str = "[REDACTED]";

/// Request fields never echoed into logs
pub const SENSITIVE_REQUEST_FIELDS: &[&str] = &[
    "password",
    "userPassword",
    "userNm",
    "userEmail",
    "accessToken",
];

/// Replace sensitive keys at the top level of a map
pub fn redact_map<S: AsRef<str>>(map: &mut Map<String, Value>, fields: &[S]) {
    for field in fields {
        if let Some(value) = map.get_mut(field.as_ref()) {
            if !value.is_null() {
                *value = Value::String(REDACTED.to_string());
            }
        }
    }
}

/// Redact the top level and one level under `data`
pub fn redact_value<S: AsRef<str>>(value: &mut Value, fields: &[S]) {
    let Value::Object(map) = value else {
        return;
    };

    redact_map(map, fields);

    if let Some(Value::Object(data)) = map.get_mut("data") {
        redact_map(data, fields);
    }
}

/// Redacted copy of a raw request body, ready for logging.
///
/// Empty bodies log as null; bodies that are not JSON log as a marker object.
pub fn prepare_body_for_logging(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(mut value) => {
            redact_value(&mut value, SENSITIVE_REQUEST_FIELDS);
            value
        }
        Err(_) => json!({ "serialization_error": true }),
    }
}

/// Redacted copy of an already parsed value; the original is left untouched
pub fn redacted_copy(value: &Value) -> Value {
    let mut copy = value.clone();
    redact_value(&mut copy, SENSITIVE_REQUEST_FIELDS);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_top_level_and_nested_data() {
        let original = json!({
            "userEmail": "kim@example.com",
            "name": "kim",
            "data": {"accessToken": "abc", "userNm": "Kim", "keep": 1},
        });
        let copy = redacted_copy(&original);

        assert_eq!(copy["userEmail"], REDACTED);
        assert_eq!(copy["name"], "kim");
        assert_eq!(copy["data"]["accessToken"], REDACTED);
        assert_eq!(copy["data"]["userNm"], REDACTED);
        assert_eq!(copy["data"]["keep"], 1);

        assert_eq!(original["userEmail"], "kim@example.com");
        assert_eq!(original["data"]["accessToken"], "abc");
    }

    #[test]
    fn test_does_not_descend_past_one_level() {
        let copy = redacted_copy(&json!({"data": {"inner": {"password": "x"}}, "other": {"password": "y"}}));
        assert_eq!(copy["data"]["inner"]["password"], "x");
        assert_eq!(copy["other"]["password"], "y");
    }

    #[test]
    fn test_null_values_stay_null() {
        let copy = redacted_copy(&json!({"password": null}));
        assert_eq!(copy["password"], Value::Null);
    }

    #[test]
    fn test_prepare_body() {
        assert_eq!(prepare_body_for_logging(b""), Value::Null);
        assert_eq!(
            prepare_body_for_logging(b"not json"),
            json!({"serialization_error": true})
        );
        assert_eq!(
            prepare_body_for_logging(br#"{"name":"kim","password":"hunter2"}"#),
            json!({"name": "kim", "password": REDACTED})
        );
        assert_eq!(prepare_body_for_logging(b"[1,2]"), json!([1, 2]));
    }

    #[test]
    fn test_redact_map_with_configured_fields() {
        let mut map = Map::new();
        map.insert("creditCard".to_string(), json!("4111"));
        map.insert("amount".to_string(), json!(10));
        redact_map(&mut map, &["creditCard".to_string()]);
        assert_eq!(map["creditCard"], REDACTED);
        assert_eq!(map["amount"], 10);
    }
}
