use thiserror::Error;

use crate::types::ApiErrorBody;

/// Failures talking to the panel API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed with status code {status}")]
    Status { status: u16, detail: Option<String> },
    #[error("Could not reach the panel: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response from the panel: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Builds a status error, pulling the first `errors[].detail` out of the body when it parses.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.errors.into_iter().next())
            .map(|e| e.detail);
        ApiError::Status { status, detail }
    }
}

/// Turns any error coming out of the client into the message shown to the operator.
pub fn http_error_to_human(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Status {
            detail: Some(detail),
            ..
        }) => detail.clone(),
        Some(api) => api.to_string(),
        None => err.to_string(),
    }
}
