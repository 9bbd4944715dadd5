//! Parameter validation at the module boundary.

use serde_json::Value;

use deskpilot_core::{types::ParamBag, Error, Result};

/// Prefix of the placeholder emitted when an entity could not be resolved.
pub const UNRESOLVED_PREFIX: &str = "unknown-";

/// Typed view over the parameters of one `(module, operation)` call.
pub struct OpParams<'a> {
    module: &'a str,
    operation: &'a str,
    params: &'a ParamBag,
}

impl<'a> OpParams<'a> {
    pub fn new(module: &'a str, operation: &'a str, params: &'a ParamBag) -> Self {
        Self {
            module,
            operation,
            params,
        }
    }

    /// A non-empty string parameter.
    pub fn required(&self, key: &str) -> Result<&'a str> {
        match self.params.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
            Some(Value::String(_)) => Err(self.invalid(format!("parameter '{}' is empty", key))),
            Some(_) => Err(self.invalid(format!("parameter '{}' must be a string", key))),
            None => Err(self.invalid(format!("missing required parameter '{}'", key))),
        }
    }

    /// A required string naming something to act on; unresolved placeholders are rejected.
    pub fn target(&self, key: &str) -> Result<&'a str> {
        let value = self.required(key)?;
        if is_unresolved(value) {
            return Err(self.invalid(format!("unresolved target '{}'", value)));
        }
        Ok(value)
    }

    /// An optional non-empty string parameter.
    pub fn optional(&self, key: &str) -> Option<&'a str> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    fn invalid(&self, reason: String) -> Error {
        Error::invalid_params(self.module, self.operation, reason)
    }
}

/// Whether a value is an `unknown-<kind>` placeholder.
pub fn is_unresolved(value: &str) -> bool {
    value.starts_with(UNRESOLVED_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> ParamBag {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_required_and_optional() {
        let params = bag(json!({"app": "Messenger", "empty": " ", "count": 3}));
        let view = OpParams::new("automation", "launch_app", &params);

        assert_eq!(view.required("app").unwrap(), "Messenger");
        assert!(view.required("empty").is_err());
        assert!(view.required("count").is_err());
        assert!(view.required("missing").is_err());
        assert_eq!(view.optional("app"), Some("Messenger"));
        assert_eq!(view.optional("empty"), None);
    }

    #[test]
    fn test_target_rejects_placeholder() {
        let params = bag(json!({"user": "unknown-user"}));
        let view = OpParams::new("automation", "navigate_to_user", &params);

        let err = view.target("user").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameters for automation.navigate_to_user: unresolved target 'unknown-user'"
        );
    }
}
