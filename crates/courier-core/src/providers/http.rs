//! Shared HTTP plumbing for provider adapters

use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error};

use super::adapter::AdapterError;

/// Build the shared outbound HTTP client with a bounded timeout
pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

/// Substitute `{name}` placeholders in a URL template, percent-encoding
/// the substituted values.
pub fn substitute_url(template: &str, vars: &[(&str, &str)]) -> String {
    let mut url = template.to_string();
    for (name, value) in vars {
        url = url.replace(&format!("{{{name}}}"), &encode_component(value));
    }
    url
}

/// Percent-encode a URL component (RFC 3986 unreserved set)
pub fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

/// Attach configured headers to a request
pub fn apply_headers(
    mut request: RequestBuilder,
    headers: &BTreeMap<String, String>,
) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(name, value);
    }
    request
}

/// Parse an HTTP method string, defaulting to POST
pub fn parse_method(method: &str) -> Method {
    method.parse().unwrap_or(Method::POST)
}

/// Execute a request expecting a JSON body back. Non-2xx statuses and
/// connection failures are transport errors.
pub async fn execute_json(request: RequestBuilder, url: &str) -> Result<Value, AdapterError> {
    debug!(url, "sending provider request");

    let response = request.send().await.map_err(|e| {
        error!(url, error = %e, "provider request failed");
        AdapterError::Transport(e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(url, %status, "provider returned error status");
        return Err(AdapterError::Transport(format!(
            "{url} returned {status}: {body}"
        )));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| AdapterError::Transport(format!("invalid JSON from {url}: {e}")))
}
