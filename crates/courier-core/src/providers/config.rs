//! Declarative provider configuration
//!
//! A provider row carries one of these as jsonb. The endpoints map keys
//! operations to URL, method, and mapping specs; no code changes are
//! needed to onboard a provider whose wire shape the mapping DSL covers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::adapter::AdapterError;
use crate::mapping::{lookup_path, MappingSpec, ResponseMapping};

/// Operation key for single sends
pub const OP_SEND_SINGLE: &str = "send_single";
/// Operation key for batch sends
pub const OP_SEND_BATCH: &str = "send_batch";
/// Operation key for delivery status pulls
pub const OP_STATUS: &str = "status";

/// Full provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Credential values usable as URL template placeholders
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,

    /// Headers attached to every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Static payload fields merged under the per-message ones
    #[serde(default)]
    pub default_payload: BTreeMap<String, Value>,

    /// Operation name to endpoint spec
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointSpec>,
}

impl ProviderConfig {
    /// Look up an endpoint spec
    pub fn endpoint(&self, operation: &str) -> Option<&EndpointSpec> {
        self.endpoints.get(operation)
    }

    /// Look up an endpoint spec, failing loudly when absent
    pub fn require_endpoint(&self, operation: &'static str) -> Result<&EndpointSpec, AdapterError> {
        self.endpoints
            .get(operation)
            .ok_or(AdapterError::MissingEndpoint(operation))
    }
}

/// One provider endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Endpoint URL; may contain `{placeholder}` tokens
    pub url: String,

    /// HTTP method, e.g. "POST"
    #[serde(default = "default_http_method")]
    pub http_method: String,

    /// Request body mapping (mapped adapters)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_mapping: Option<MappingSpec>,

    /// Response parsing mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mapping: Option<ResponseMapping>,

    /// Soft-failure detection over a 2xx body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_check: Option<ErrorCheck>,
}

fn default_http_method() -> String {
    "POST".to_string()
}

impl EndpointSpec {
    /// Require the request mapping
    pub fn require_request_mapping(&self) -> Result<&MappingSpec, AdapterError> {
        self.request_mapping.as_ref().ok_or_else(|| {
            AdapterError::Mapping(crate::mapping::MappingError::InvalidSpec(
                "endpoint has no request_mapping".to_string(),
            ))
        })
    }

    /// Require the response mapping
    pub fn require_response_mapping(&self) -> Result<&ResponseMapping, AdapterError> {
        self.response_mapping.as_ref().ok_or_else(|| {
            AdapterError::Mapping(crate::mapping::MappingError::InvalidSpec(
                "endpoint has no response_mapping".to_string(),
            ))
        })
    }
}

/// Declarative soft-failure check: the value at `field` must equal
/// `success`, otherwise the invocation is a provider-declared failure
/// even under a 2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCheck {
    /// Dotted path into the response body
    pub field: String,

    /// Expected value on success
    pub success: Value,

    /// Optional path to a human-readable failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_field: Option<String>,
}

impl ErrorCheck {
    /// Evaluate the check against a response body
    pub fn evaluate(&self, body: &Value) -> Result<(), AdapterError> {
        let actual = lookup_path(body, &self.field);
        if actual == Some(&self.success) {
            return Ok(());
        }

        let reason = self
            .reason_field
            .as_deref()
            .and_then(|path| lookup_path(body, path))
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();

        Err(AdapterError::SoftFailure {
            code: actual.map(Value::to_string).unwrap_or_else(|| "absent".to_string()),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_check_passes_on_success_value() {
        let check = ErrorCheck {
            field: "ErrorCode".to_string(),
            success: json!(0),
            reason_field: Some("ErrorDescription".to_string()),
        };

        assert!(check.evaluate(&json!({ "ErrorCode": 0 })).is_ok());
    }

    #[test]
    fn test_error_check_reports_reason() {
        let check = ErrorCheck {
            field: "ErrorCode".to_string(),
            success: json!(0),
            reason_field: Some("ErrorDescription".to_string()),
        };

        let err = check
            .evaluate(&json!({ "ErrorCode": 7, "ErrorDescription": "invalid sender" }))
            .unwrap_err();

        match err {
            AdapterError::SoftFailure { code, reason } => {
                assert_eq!(code, "7");
                assert_eq!(reason, "invalid sender");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_provider_config_deserializes_endpoints() {
        let config: ProviderConfig = serde_json::from_value(json!({
            "credentials": { "api_key": "k" },
            "headers": { "authorization": "Bearer k" },
            "endpoints": {
                "send_batch": {
                    "url": "https://api.example.com/batch",
                    "http_method": "POST",
                    "request_mapping": {
                        "messages": {
                            "type": "array",
                            "mapping": { "to": { "field": "recipient", "type": "string" } }
                        }
                    }
                }
            }
        }))
        .unwrap();

        let endpoint = config.require_endpoint(OP_SEND_BATCH).unwrap();
        assert_eq!(endpoint.http_method, "POST");
        assert!(endpoint.request_mapping.is_some());
        assert!(matches!(
            config.require_endpoint(OP_STATUS),
            Err(AdapterError::MissingEndpoint("status"))
        ));
    }
}
