use serde::{de::IgnoredAny, Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub tenant_access_token: Option<String>,
    /// Seconds until the token expires.
    pub expire: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub receive_id: &'a str,
    pub msg_type: &'a str,
    /// JSON document encoded as a string, as the messages endpoint expects.
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct TextContent<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MediaContent<'a> {
    pub file_key: &'a str,
}

/// Envelope shared by the `im/v1` endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

pub type SendMessageResponse = ApiResponse<IgnoredAny>;

#[derive(Debug, Deserialize)]
pub struct UploadData {
    pub file_key: Option<String>,
}

pub type UploadResponse = ApiResponse<UploadData>;

/// Access to the status fields every Feishu response carries.
pub trait RemoteStatus {
    fn code(&self) -> i64;
    fn msg(&self) -> &str;
}

impl RemoteStatus for TokenResponse {
    fn code(&self) -> i64 {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl<T> RemoteStatus for ApiResponse<T> {
    fn code(&self) -> i64 {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}
