use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single call to the Feishu open API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected http status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("api returned code {code}: {msg}")]
    Remote { code: i64, msg: String },
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
    #[error("failed to read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode message content: {0}")]
    Encode(#[from] serde_json::Error),
}
