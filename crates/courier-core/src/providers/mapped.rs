//! Config-driven JSON adapter
//!
//! The whole integration lives in the provider's mapping configuration:
//! request bodies are rendered by the mapping engine, responses parsed
//! back through it. Providers with a regular JSON wire shape need no code
//! at all.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use courier_common::types::MessageStatus;

use super::adapter::{AdapterError, BatchOutcome, DispatchInput, MessageOutcome, ProviderAdapter};
use super::config::{ProviderConfig, OP_SEND_BATCH, OP_SEND_SINGLE, OP_STATUS};
use super::http;
use crate::mapping;

/// Adapter for providers described entirely by mapping configuration
#[derive(Debug)]
pub struct MappedAdapter {
    client: Client,
}

impl MappedAdapter {
    /// Create a new mapped adapter over the shared HTTP client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Issue one endpoint call and parse the outcomes
    async fn call_endpoint(
        &self,
        config: &ProviderConfig,
        operation: &'static str,
        source: &Value,
        inputs: &[DispatchInput],
    ) -> Result<Vec<MessageOutcome>, AdapterError> {
        let endpoint = config.require_endpoint(operation)?;
        let spec = endpoint.require_request_mapping()?;
        mapping::validate_spec(spec)?;

        let payload = mapping::build_payload(spec, source)?;

        let url = http::substitute_url(
            &endpoint.url,
            &credential_vars(config),
        );
        let request = http::apply_headers(
            self.client
                .request(http::parse_method(&endpoint.http_method), &url),
            &config.headers,
        )
        .json(&payload);

        let body = http::execute_json(request, &url).await?;

        if let Some(check) = &endpoint.error_check {
            check.evaluate(&body)?;
        }

        let response_mapping = endpoint.require_response_mapping()?;
        Ok(mapping::parse_response(response_mapping, &body, inputs)?)
    }
}

/// Credential map as URL template variables
fn credential_vars(config: &ProviderConfig) -> Vec<(&str, &str)> {
    config
        .credentials
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

#[async_trait]
impl ProviderAdapter for MappedAdapter {
    async fn send_single(
        &self,
        input: &DispatchInput,
        config: &ProviderConfig,
    ) -> Result<MessageOutcome, AdapterError> {
        if config.endpoint(OP_SEND_SINGLE).is_none() {
            // No single endpoint; a one-element batch is equivalent
            config.require_endpoint(OP_SEND_BATCH)?;
            let mut batch = self.send_batch(std::slice::from_ref(input), config).await?;
            return match batch.sent.pop() {
                Some(outcome) => Ok(outcome),
                None => Err(AdapterError::SoftFailure {
                    code: "rejected".to_string(),
                    reason: "provider rejected the message".to_string(),
                }),
            };
        }

        let source = serde_json::to_value(input)
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        let outcomes = self
            .call_endpoint(config, OP_SEND_SINGLE, &source, std::slice::from_ref(input))
            .await?;

        outcomes.into_iter().next().ok_or_else(|| {
            AdapterError::SoftFailure {
                code: "empty".to_string(),
                reason: "provider response contained no message".to_string(),
            }
        })
    }

    async fn send_batch(
        &self,
        inputs: &[DispatchInput],
        config: &ProviderConfig,
    ) -> Result<BatchOutcome, AdapterError> {
        if config.endpoint(OP_SEND_BATCH).is_none() {
            // Batch endpoint absent: emulate with sequential singles,
            // collecting per-recipient failures instead of failing the batch
            config.require_endpoint(OP_SEND_SINGLE)?;
            warn!("send_batch not configured, processing messages individually");

            let mut outcome = BatchOutcome::default();
            for input in inputs {
                match self.send_single(input, config).await {
                    Ok(sent) => outcome.sent.push(sent),
                    Err(e) => {
                        warn!(message_id = %input.id, error = %e, "single send failed");
                        outcome.failed.push(input.clone());
                    }
                }
            }
            return Ok(outcome);
        }

        let source = serde_json::to_value(inputs)
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        let outcomes = self
            .call_endpoint(config, OP_SEND_BATCH, &source, inputs)
            .await?;

        // Outcomes the provider marked failed fall back to the chain
        let mut batch = BatchOutcome::default();
        for outcome in outcomes {
            if outcome.status == MessageStatus::Failed {
                if let Some(input) = inputs.iter().find(|i| Some(i.id) == outcome.id) {
                    batch.failed.push(input.clone());
                    continue;
                }
            }
            batch.sent.push(outcome);
        }
        Ok(batch)
    }

    async fn get_status(
        &self,
        message_id: &str,
        config: &ProviderConfig,
    ) -> Result<MessageOutcome, AdapterError> {
        let endpoint = config.require_endpoint(OP_STATUS)?;

        let mut vars = credential_vars(config);
        vars.push(("message_id", message_id));
        let url = http::substitute_url(&endpoint.url, &vars);

        let request = http::apply_headers(
            self.client
                .request(http::parse_method(&endpoint.http_method), &url),
            &config.headers,
        );

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
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input(recipient: &str) -> DispatchInput {
        DispatchInput {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            country_code: "57".to_string(),
            content: "promo".to_string(),
            channel: "sms".to_string(),
        }
    }

    fn batch_config(base_url: &str) -> ProviderConfig {
        serde_json::from_value(json!({
            "headers": { "authorization": "Bearer token" },
            "endpoints": {
                "send_batch": {
                    "url": format!("{base_url}/messages/batch"),
                    "http_method": "POST",
                    "request_mapping": {
                        "encoding": "UTF-8",
                        "messages": {
                            "type": "array",
                            "mapping": {
                                "to": { "field": "recipient", "type": "string" },
                                "text": { "field": "content", "type": "string" }
                            }
                        }
                    },
                    "response_mapping": {
                        "messages": {
                            "type": "array",
                            "paths": ["results"],
                            "mapping": {
                                "provider_message_id": { "field": "ref", "type": "string" },
                                "status": { "field": "code", "type": "number" }
                            }
                        },
                        "status_map": { "0": "sent", "9": "failed" }
                    },
                    "error_check": {
                        "field": "status",
                        "success": "ok",
                        "reason_field": "reason"
                    }
                }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_batch_maps_request_and_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/batch"))
            .and(body_partial_json(json!({
                "encoding": "UTF-8",
                "messages": [
                    { "to": "300111", "text": "promo" },
                    { "to": "300222", "text": "promo" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "results": [
                    { "ref": "r1", "code": 0 },
                    { "ref": "r2", "code": 9 }
                ]
            })))
            .mount(&server)
            .await;

        let adapter = MappedAdapter::new(Client::new());
        let inputs = vec![input("300111"), input("300222")];
        let batch = adapter
            .send_batch(&inputs, &batch_config(&server.uri()))
            .await
            .unwrap();

        assert_eq!(batch.sent.len(), 1);
        assert_eq!(batch.sent[0].provider_message_id.as_deref(), Some("r1"));
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].id, inputs[1].id);
    }

    #[tokio::test]
    async fn test_send_batch_soft_failure_fails_invocation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "reason": "account suspended"
            })))
            .mount(&server)
            .await;

        let adapter = MappedAdapter::new(Client::new());
        let err = adapter
            .send_batch(&[input("300111")], &batch_config(&server.uri()))
            .await
            .unwrap_err();

        match err {
            AdapterError::SoftFailure { reason, .. } => {
                assert_eq!(reason, "account suspended")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_send_batch_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/batch"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = MappedAdapter::new(Client::new());
        let err = adapter
            .send_batch(&[input("300111")], &batch_config(&server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::Transport(_)));
    }

    #[tokio::test]
    async fn test_send_single_falls_back_to_batch_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "results": [ { "ref": "solo", "code": 0 } ]
            })))
            .mount(&server)
            .await;

        let adapter = MappedAdapter::new(Client::new());
        let outcome = adapter
            .send_single(&input("300111"), &batch_config(&server.uri()))
            .await
            .unwrap();

        assert_eq!(outcome.provider_message_id.as_deref(), Some("solo"));
        assert_eq!(outcome.status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn test_get_status_substitutes_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/abc-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "DELIVRD",
                "ref": "abc-123"
            })))
            .mount(&server)
            .await;

        let config: ProviderConfig = serde_json::from_value(json!({
            "endpoints": {
                "status": {
                    "url": format!("{}/status/{{message_id}}", server.uri()),
                    "http_method": "GET",
                    "response_mapping": {
                        "messages": {
                            "type": "object",
                            "mapping": {
                                "status": { "field": "state", "type": "string" },
                                "provider_message_id": { "field": "ref", "type": "string" }
                            }
                        },
                        "status_map": { "DELIVRD": "sent", "UNDELIV": "failed" }
                    }
                }
            }
        }))
        .unwrap();

        let adapter = MappedAdapter::new(Client::new());
        let outcome = adapter.get_status("abc-123", &config).await.unwrap();

        assert_eq!(outcome.status, MessageStatus::Sent);
        assert_eq!(outcome.provider_message_id.as_deref(), Some("abc-123"));
    }
}
