use crate::error::{Error, Result};
use crate::traits::{ModelResponse, ToolCall};
use reqwest::{Response, StatusCode};

pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}

pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Turns a non-2xx response into a transport error carrying the body text.
pub(crate) async fn check_status(response: Response, vendor: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::transport(
        format!("{} API error {}: {}", vendor, status, body.trim()),
        is_retryable_status(status),
    ))
}

/// Keeps the first requested call; the loop answers one call per round trip.
/// Without calls, whatever text came back (possibly empty) is the answer.
pub(crate) fn into_model_response(
    vendor: &str,
    text: Option<String>,
    mut calls: Vec<ToolCall>,
) -> ModelResponse {
    if !calls.is_empty() {
        if calls.len() > 1 {
            tracing::warn!(
                vendor,
                dropped = calls.len() - 1,
                "Model requested several tool calls, dispatching only the first"
            );
        }
        return ModelResponse::ToolCall(calls.swap_remove(0));
    }

    let text = text.unwrap_or_default();
    if text.trim().is_empty() {
        tracing::debug!(vendor, "Model returned an empty answer");
    }
    ModelResponse::FinalAnswer(text)
}
