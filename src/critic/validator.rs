//! Response Validator
//!
//! Turns a free-form completion into a [`ValidatedResponse`] with a bounded
//! retry loop. Each attempt re-sends the same prompt; exhausting the budget
//! yields `(false, "")` instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::repair::{fix_and_parse_json, strip_code_fences};
use crate::completion::{Prompt, SharedCompletion};
use crate::error::ValidationError;

/// Structured task judgment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedResponse {
    pub success: bool,
    #[serde(default)]
    pub critique: String,
}

impl ValidatedResponse {
    pub fn new(success: bool, critique: impl Into<String>) -> Self {
        Self {
            success,
            critique: critique.into(),
        }
    }

    /// Safe default when no judgment could be obtained
    pub fn failed() -> Self {
        Self::default()
    }
}

/// Parse one raw completion into a judgment
pub fn parse_response(raw: &str) -> Result<ValidatedResponse, ValidationError> {
    let cleaned = strip_code_fences(raw);
    let value = fix_and_parse_json(&cleaned)?;

    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::Schema("expected a JSON object".to_string()))?;

    let success = match obj.get("success") {
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(ValidationError::Schema(format!(
                "`success` must be a boolean, got {}",
                other
            )))
        }
        None => return Err(ValidationError::Schema("missing `success`".to_string())),
    };

    let critique = match obj.get("critique") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    Ok(ValidatedResponse { success, critique })
}

/// Bounded-retry validator over a completion backend
#[derive(Clone)]
pub struct ResponseValidator {
    completion: SharedCompletion,
}

impl ResponseValidator {
    pub fn new(completion: SharedCompletion) -> Self {
        Self { completion }
    }

    /// Request and validate a judgment, trying at most `max_retries` times
    pub async fn invoke(&self, prompt: &Prompt, max_retries: u32) -> ValidatedResponse {
        for attempt in 1..=max_retries {
            let raw = match self.completion.complete(prompt).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(attempt, max_retries, "Critic completion failed: {:#}. Trying again!", e);
                    continue;
                }
            };
            debug!(attempt, "Critic response:\n{}", raw);

            match parse_response(&raw) {
                Ok(response) => return response,
                Err(e) => {
                    warn!(attempt, max_retries, "Error parsing critic response: {}. Trying again!", e);
                }
            }
        }

        error!(
            max_retries,
            "Failed to parse critic response. Consider updating your prompt."
        );
        ValidatedResponse::failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json() {
        let r = parse_response("```json\n{\"success\": true}\n```").unwrap();
        assert_eq!(r, ValidatedResponse::new(true, ""));
    }

    #[test]
    fn test_with_critique() {
        let r = parse_response(r#"{"success": false, "critique": "too slow"}"#).unwrap();
        assert_eq!(r, ValidatedResponse::new(false, "too slow"));
    }

    #[test]
    fn test_null_critique_defaults_to_empty() {
        let r = parse_response(r#"{"success": true, "critique": null}"#).unwrap();
        assert_eq!(r.critique, "");
    }

    #[test]
    fn test_schema_violations() {
        assert!(matches!(
            parse_response(r#"{"critique": "no verdict"}"#),
            Err(ValidationError::Schema(_))
        ));
        assert!(matches!(
            parse_response(r#"{"success": "yes"}"#),
            Err(ValidationError::Schema(_))
        ));
        assert!(matches!(
            parse_response("[true]"),
            Err(ValidationError::Schema(_))
        ));
        assert!(matches!(parse_response("not json"), Err(ValidationError::Repair(_))));
    }
}
