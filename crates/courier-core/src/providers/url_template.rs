//! Templated-URL adapter
//!
//! Integration style for gateways that take single sends as a GET with
//! `{placeholder}` tokens substituted into the URL, and batches as a JSON
//! POST carrying a nested addressee list. The reply splits accepted and
//! rejected requests into sublists matched back to inputs by recipient.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use courier_common::types::MessageStatus;

use super::adapter::{AdapterError, BatchOutcome, DispatchInput, MessageOutcome, ProviderAdapter};
use super::config::{ProviderConfig, OP_SEND_BATCH, OP_SEND_SINGLE};
use super::http;
use crate::mapping::parse_provider_date;

/// Adapter for templated-URL gateways
#[derive(Debug)]
pub struct UrlTemplateAdapter {
    client: Client,
}

impl UrlTemplateAdapter {
    /// Create a new templated-URL adapter over the shared HTTP client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn outcome_for(
        input: &DispatchInput,
        message_id: Option<String>,
        sent_at: Option<chrono::DateTime<Utc>>,
        raw: Value,
    ) -> MessageOutcome {
        MessageOutcome {
            id: Some(input.id),
            recipient: Some(input.recipient.clone()),
            content: Some(input.content.clone()),
            status: MessageStatus::Sent,
            sent_at: Some(sent_at.unwrap_or_else(Utc::now)),
            delivery_status: "queued".to_string(),
            delivery_details: None,
            provider_raw_response: raw,
            provider_message_id: message_id,
            country_code: Some(input.country_code.clone()),
            priority: 1,
            message_type: "text".to_string(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for UrlTemplateAdapter {
    async fn send_single(
        &self,
        input: &DispatchInput,
        config: &ProviderConfig,
    ) -> Result<MessageOutcome, AdapterError> {
        let endpoint = config.require_endpoint(OP_SEND_SINGLE)?;

        let mut vars: Vec<(&str, &str)> = config
            .credentials
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        vars.push(("mobile", &input.recipient));
        vars.push(("country", &input.country_code));
        vars.push(("message", &input.content));
        vars.push(("message_format", "1"));

        let url = http::substitute_url(&endpoint.url, &vars);
        let request = http::apply_headers(self.client.get(&url), &config.headers);
        let body = http::execute_json(request, &url).await?;

        // Gateway convention: status 1 means accepted
        if body.get("status").and_then(Value::as_i64) != Some(1) {
            let reason = body
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(AdapterError::SoftFailure {
                code: body.get("status").cloned().unwrap_or(Value::Null).to_string(),
                reason,
            });
        }

        let message_id = body
            .pointer("/result/receivedRequests/0/transactionId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let sent_at = body
            .pointer("/result/dateToSend")
            .and_then(Value::as_str)
            .and_then(parse_provider_date);

        Ok(Self::outcome_for(input, message_id, sent_at, body))
    }

    async fn send_batch(
        &self,
        inputs: &[DispatchInput],
        config: &ProviderConfig,
    ) -> Result<BatchOutcome, AdapterError> {
        let endpoint = config.require_endpoint(OP_SEND_BATCH)?;
        let first = inputs
            .first()
            .ok_or(AdapterError::Unsupported("empty batch"))?;

        let payload = json!({
            "country": first.country_code,
            "message": first.content,
            "encoding": "UTF-8",
            "messageFormat": 1,
            "addresseeList": inputs
                .iter()
                .map(|input| json!({
                    "mobile": input.recipient,
                    "message": input.content,
                    "correlationLabel": input.id,
                }))
                .collect::<Vec<_>>(),
        });

        let url = http::substitute_url(
            &endpoint.url,
            &config
                .credentials
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect::<Vec<_>>(),
        );
        let request = http::apply_headers(self.client.post(&url), &config.headers).json(&payload);
        let body = http::execute_json(request, &url).await?;

        let sent_at = body
            .pointer("/result/dateToSend")
            .and_then(Value::as_str)
            .and_then(parse_provider_date);

        let empty = Vec::new();
        let accepted = body
            .pointer("/result/receivedRequests")
            .and_then(Value::as_array)
            .unwrap_or(&empty);
        let rejected = body
            .pointer("/result/failedRequests")
            .and_then(Value::as_array)
            .unwrap_or(&empty);

        let mut batch = BatchOutcome::default();

        for request in accepted {
            let mobile = request.get("mobile").and_then(Value::as_str);
            let Some(input) = inputs.iter().find(|i| Some(i.recipient.as_str()) == mobile) else {
                warn!(?mobile, "accepted request for unknown recipient");
                continue;
            };

            let message_id = request
                .get("transactionId")
                .and_then(Value::as_str)
                .map(str::to_string);
            batch
                .sent
                .push(Self::outcome_for(input, message_id, sent_at, request.clone()));
        }

        for request in rejected {
            let mobile = request.get("mobile").and_then(Value::as_str);
            let Some(input) = inputs.iter().find(|i| Some(i.recipient.as_str()) == mobile) else {
                warn!(?mobile, "rejected request for unknown recipient");
                continue;
            };

            warn!(
                recipient = %input.recipient,
                reason = ?request.get("reason"),
                "provider rejected recipient"
            );
            batch.failed.push(input.clone());
        }

        // Inputs the reply never mentioned are not sent; carry them forward
        for input in inputs {
            let mentioned = batch.sent.iter().any(|o| o.id == Some(input.id))
                || batch.failed.iter().any(|f| f.id == input.id);
            if !mentioned {
                warn!(message_id = %input.id, "recipient missing from provider reply");
                batch.failed.push(input.clone());
            }
        }

        Ok(batch)
    }

    async fn get_status(
        &self,
        _message_id: &str,
        _config: &ProviderConfig,
    ) -> Result<MessageOutcome, AdapterError> {
        Err(AdapterError::Unsupported("status"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input(recipient: &str) -> DispatchInput {
        DispatchInput {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            country_code: "57".to_string(),
            content: "hola".to_string(),
            channel: "sms".to_string(),
        }
    }

    fn config(base_url: &str) -> ProviderConfig {
        serde_json::from_value(json!({
            "credentials": { "account": "acme" },
            "headers": { "authorization": "Basic xyz" },
            "endpoints": {
                "send_single": {
                    "url": format!(
                        "{base_url}/sms/send?account={{account}}&mobile={{mobile}}&country={{country}}&message={{message}}&format={{message_format}}"
                    ),
                    "http_method": "GET"
                },
                "send_batch": {
                    "url": format!("{base_url}/sms/batch"),
                    "http_method": "POST"
                }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_single_substitutes_placeholders() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sms/send"))
            .and(query_param("account", "acme"))
            .and(query_param("mobile", "300111"))
            .and(query_param("message", "hola"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 1,
                "result": {
                    "dateToSend": "2024-05-01T12:00:00Z",
                    "receivedRequests": [ { "mobile": "300111", "transactionId": "t-9" } ]
                }
            })))
            .mount(&server)
            .await;

        let adapter = UrlTemplateAdapter::new(Client::new());
        let outcome = adapter
            .send_single(&input("300111"), &config(&server.uri()))
            .await
            .unwrap();

        assert_eq!(outcome.status, MessageStatus::Sent);
        assert_eq!(outcome.provider_message_id.as_deref(), Some("t-9"));
    }

    #[tokio::test]
    async fn test_send_single_nonpositive_status_is_soft_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sms/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": -4,
                "reason": "invalid destination"
            })))
            .mount(&server)
            .await;

        let adapter = UrlTemplateAdapter::new(Client::new());
        let err = adapter
            .send_single(&input("300111"), &config(&server.uri()))
            .await
            .unwrap_err();

        match err {
            AdapterError::SoftFailure { reason, .. } => {
                assert_eq!(reason, "invalid destination")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_send_batch_partitions_accepted_and_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sms/batch"))
            .and(body_partial_json(json!({ "country": "57", "encoding": "UTF-8" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 1,
                "result": {
                    "dateToSend": "2024-05-01T12:00:00Z",
                    "receivedRequests": [
                        { "mobile": "300111", "transactionId": "t-1" }
                    ],
                    "failedRequests": [
                        { "mobile": "300222", "status": -2, "reason": "blocked" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let adapter = UrlTemplateAdapter::new(Client::new());
        let inputs = vec![input("300111"), input("300222"), input("300333")];
        let batch = adapter
            .send_batch(&inputs, &config(&server.uri()))
            .await
            .unwrap();

        assert_eq!(batch.sent.len(), 1);
        assert_eq!(batch.sent[0].id, Some(inputs[0].id));
        // Rejected plus never-mentioned recipients both carry forward
        assert_eq!(batch.failed.len(), 2);
        assert!(batch.failed.iter().any(|f| f.id == inputs[1].id));
        assert!(batch.failed.iter().any(|f| f.id == inputs[2].id));
    }

    #[tokio::test]
    async fn test_get_status_is_unsupported() {
        let adapter = UrlTemplateAdapter::new(Client::new());
        let err = adapter
            .get_status("t-1", &ProviderConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Unsupported("status")));
    }
}
