//! Form-encoded adapter
//!
//! Integration style for REST gateways that only accept one message per
//! form-encoded POST. Batches are emulated with sequential singles;
//! per-recipient failures are collected, never thrown.

use async_trait::async_trait;
use courier_common::types::PhoneNumber;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use super::adapter::{AdapterError, BatchOutcome, DispatchInput, MessageOutcome, ProviderAdapter};
use super::config::{ProviderConfig, OP_SEND_SINGLE, OP_STATUS};
use super::http;
use crate::mapping;

/// Adapter for form-encoded single-send gateways
#[derive(Debug)]
pub struct FormAdapter {
    client: Client,
}

impl FormAdapter {
    /// Create a new form adapter over the shared HTTP client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Render a default-payload value as a form field
fn form_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ProviderAdapter for FormAdapter {
    async fn send_single(
        &self,
        input: &DispatchInput,
        config: &ProviderConfig,
    ) -> Result<MessageOutcome, AdapterError> {
        let endpoint = config.require_endpoint(OP_SEND_SINGLE)?;

        let mut form: BTreeMap<String, String> = config
            .default_payload
            .iter()
            .map(|(k, v)| (k.clone(), form_value(v)))
            .collect();
        let to = PhoneNumber::new(input.country_code.clone(), input.recipient.clone());
        form.insert("To".to_string(), to.e164());
        form.insert("Body".to_string(), input.content.clone());

        let url = http::substitute_url(
            &endpoint.url,
            &config
                .credentials
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect::<Vec<_>>(),
        );
        let request =
            http::apply_headers(self.client.post(&url), &config.headers).form(&form);
        let body = http::execute_json(request, &url).await?;

        if let Some(check) = &endpoint.error_check {
            check.evaluate(&body)?;
        }

        let response_mapping = endpoint.require_response_mapping()?;
        let outcomes =
            mapping::parse_response(response_mapping, &body, std::slice::from_ref(input))?;
        outcomes
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::SoftFailure {
                code: "empty".to_string(),
                reason: "provider response contained no message".to_string(),
            })
    }

    async fn send_batch(
        &self,
        inputs: &[DispatchInput],
        config: &ProviderConfig,
    ) -> Result<BatchOutcome, AdapterError> {
        let mut batch = BatchOutcome::default();

        for input in inputs {
            match self.send_single(input, config).await {
                Ok(outcome) => batch.sent.push(outcome),
                Err(e) => {
                    warn!(recipient = %input.recipient, error = %e, "message failed");
                    batch.failed.push(input.clone());
                }
            }
        }

        Ok(batch)
    }

    async fn get_status(
        &self,
        message_id: &str,
        config: &ProviderConfig,
    ) -> Result<MessageOutcome, AdapterError> {
        let endpoint = config.require_endpoint(OP_STATUS)?;

        let mut vars: Vec<(&str, &str)> = config
            .credentials
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        vars.push(("message_id", message_id));
        let url = http::substitute_url(&endpoint.url, &vars);

        let request = http::apply_headers(self.client.get(&url), &config.headers);
        let body = http::execute_json(request, &url).await?;

        if let Some(check) = &endpoint.error_check {
            check.evaluate(&body)?;
        }

        let response_mapping = endpoint.require_response_mapping()?;
        let outcomes = mapping::parse_response(response_mapping, &body, &[])?;
        outcomes
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::SoftFailure {
                code: "empty".to_string(),
                reason: "status response contained no message".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_common::types::MessageStatus;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input(recipient: &str) -> DispatchInput {
        DispatchInput {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            country_code: "1".to_string(),
            content: "ping".to_string(),
            channel: "sms".to_string(),
        }
    }

    fn config(base_url: &str) -> ProviderConfig {
        serde_json::from_value(json!({
            "credentials": { "account_sid": "AC123" },
            "headers": { "authorization": "Basic dXNlcjpwYXNz" },
            "default_payload": { "From": "+15550001111" },
            "endpoints": {
                "send_single": {
                    "url": format!("{base_url}/accounts/{{account_sid}}/messages"),
                    "http_method": "POST",
                    "response_mapping": {
                        "messages": {
                            "type": "object",
                            "mapping": {
                                "provider_message_id": { "field": "sid", "type": "string" },
                                "status": { "field": "status", "type": "string" },
                                "delivery_status": { "field": "status", "type": "string" }
                            }
                        },
                        "status_map": { "queued": "sent", "failed": "failed" }
                    }
                },
                "status": {
                    "url": format!("{base_url}/accounts/{{account_sid}}/messages/{{message_id}}"),
                    "http_method": "GET",
                    "response_mapping": {
                        "messages": {
                            "type": "object",
                            "mapping": {
                                "provider_message_id": { "field": "sid", "type": "string" },
                                "status": { "field": "status", "type": "string" },
                                "delivery_details": { "field": "error_message", "type": "string" }
                            }
                        },
                        "status_map": { "delivered": "sent", "undelivered": "failed" }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_single_posts_form_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts/AC123/messages"))
            .and(body_string_contains("To=%2B1300111"))
            .and(body_string_contains("Body=ping"))
            .and(body_string_contains("From=%2B15550001111"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sid": "SM42",
                "status": "queued"
            })))
            .mount(&server)
            .await;

        let adapter = FormAdapter::new(Client::new());
        let outcome = adapter
            .send_single(&input("300111"), &config(&server.uri()))
            .await
            .unwrap();

        assert_eq!(outcome.status, MessageStatus::Sent);
        assert_eq!(outcome.provider_message_id.as_deref(), Some("SM42"));
        assert_eq!(outcome.delivery_status, "queued");
    }

    #[tokio::test]
    async fn test_send_batch_collects_per_recipient_failures() {
        let server = MockServer::start().await;
        // First recipient accepted, second rejected at transport level
        Mock::given(method("POST"))
            .and(path("/accounts/AC123/messages"))
            .and(body_string_contains("To=%2B1300111"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sid": "SM1",
                "status": "queued"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/accounts/AC123/messages"))
            .and(body_string_contains("To=%2B1300222"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "invalid number"
            })))
            .mount(&server)
            .await;

        let adapter = FormAdapter::new(Client::new());
        let inputs = vec![input("300111"), input("300222")];
        let batch = adapter
            .send_batch(&inputs, &config(&server.uri()))
            .await
            .unwrap();

        assert_eq!(batch.sent.len(), 1);
        assert_eq!(batch.sent[0].id, Some(inputs[0].id));
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].id, inputs[1].id);
    }

    #[tokio::test]
    async fn test_get_status_maps_terminal_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts/AC123/messages/SM42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sid": "SM42",
                "status": "delivered",
                "error_message": null
            })))
            .mount(&server)
            .await;

        let adapter = FormAdapter::new(Client::new());
        let outcome = adapter
            .get_status("SM42", &config(&server.uri()))
            .await
            .unwrap();

        assert_eq!(outcome.status, MessageStatus::Sent);
        assert_eq!(outcome.provider_message_id.as_deref(), Some("SM42"));
    }
}
