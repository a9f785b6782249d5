//! HTTP client utilities shared by the streaming transport and the
//! single-call resources.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::client::ClientError;
use crate::options::{ClientOptions, SecretString};

/// Build a configured HTTP client from client options.
///
/// Only the connect timeout is set here; total timeouts are per request so
/// that streaming bodies are never cut off.
pub fn build_http_client(options: &ClientOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = options.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }

    if let Some(proxy_url) = &options.proxy {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => warn!(proxy = %proxy_url, error = %e, "ignoring invalid proxy URL"),
        }
    }

    builder.build()
}

/// Add extra headers to a request if specified in client options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Attach the bearer token and configured extra headers.
pub fn authorized(
    request: RequestBuilder,
    token: &SecretString,
    options: &ClientOptions,
) -> RequestBuilder {
    let request = request
        .header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
        .header(CONTENT_TYPE, "application/json");
    add_extra_headers(request, &options.extra_headers)
}

/// Apply the single-call timeout, if any.
pub fn with_request_timeout(request: RequestBuilder, options: &ClientOptions) -> RequestBuilder {
    match options.request_timeout {
        Some(timeout) => request.timeout(timeout),
        None => request,
    }
}

/// Pass a successful response through, or turn a non-2xx one into
/// [`ClientError::Status`] using whatever message the body carries.
pub async fn error_for_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(handle_error_response(status, &body))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detail { detail: serde_json::Value },
    Error { error: serde_json::Value },
}

/// Map an error body to a `ClientError`.
///
/// Understands `{"detail": ...}` and `{"error": ...}` bodies; anything else
/// is reported verbatim.
pub fn handle_error_response(status: StatusCode, body: &str) -> ClientError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Detail { detail: value }) | Ok(ErrorBody::Error { error: value }) => {
            match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }
        }
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };
    ClientError::Status { status, message }
}
