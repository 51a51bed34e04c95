use serde_json::Value;

use super::{ResponseEnvelope, ResponseMeta};
use crate::config::Environment;

/// Wraps successful handler values into the standard envelope
#[derive(Debug, Clone, Copy)]
pub struct ResponseEnvelopeTransformer<'a> {
    environment: Environment,
    version: &'a str,
}

impl<'a> ResponseEnvelopeTransformer<'a> {
    pub fn new(environment: Environment, version: &'a str) -> Self {
        Self {
            environment,
            version,
        }
    }

    pub fn transform(&self, value: Value, path: &str) -> ResponseEnvelope {
        let (data, pagination) = split_pagination(value);

        let path = (!self.environment.is_production()).then(|| path.to_string());
        let meta = ResponseMeta::new(self.version, path).with_pagination(pagination);

        ResponseEnvelope::success(data, meta)
    }
}

/// Separate a `{data, pagination}` value into its parts.
///
/// Anything else is returned whole as data. Null is "no value".
pub fn split_pagination(value: Value) -> (Option<Value>, Option<Value>) {
    match value {
        Value::Object(mut map) if map.contains_key("data") && map.contains_key("pagination") => {
            let data = map.remove("data").filter(|data| !data.is_null());
            let pagination = map.remove("pagination").filter(|p| !p.is_null());
            (data, pagination)
        }
        Value::Null => (None, None),
        other => (Some(other), None),
    }
}
