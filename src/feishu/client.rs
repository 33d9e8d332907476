use std::{path::Path, time::Duration};

use reqwest::{
    multipart::{Form, Part},
    Body, Client, Response,
};
use serde::de::DeserializeOwned;

use crate::domain::{AccessToken, FileKey};

use super::{
    error::ApiError,
    types::{
        MediaContent, RemoteStatus, SendMessageRequest, SendMessageResponse, TextContent,
        TokenRequest, TokenResponse, UploadResponse,
    },
};

pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn/open-apis";
const TOKEN_PATH: &str = "/auth/v3/tenant_access_token/internal";
const MESSAGES_PATH: &str = "/im/v1/messages?receive_id_type=chat_id";
const FILES_PATH: &str = "/im/v1/files";
const UPLOAD_FILE_TYPE: &str = "mp4";
const UPLOAD_MIME: &str = "video/mp4";

/// Token as issued by the auth endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: AccessToken,
    pub expires_in: Option<Duration>,
}

#[derive(Clone)]
pub struct FeishuClient {
    http: Client,
    base_url: String,
}

impl FeishuClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn fetch_token(
        &self,
        app_id: &str,
        app_secret: &str,
    ) -> Result<IssuedToken, ApiError> {
        let response = self
            .http
            .post(self.endpoint(TOKEN_PATH))
            .json(&TokenRequest { app_id, app_secret })
            .send()
            .await?;

        let body: TokenResponse = decode(response).await?;
        let token = body
            .tenant_access_token
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::MissingField("tenant_access_token"))?;

        Ok(IssuedToken {
            token: AccessToken::new(token),
            expires_in: body.expire.map(Duration::from_secs),
        })
    }

    pub async fn post_text(
        &self,
        token: &AccessToken,
        chat_id: &str,
        text: &str,
    ) -> Result<(), ApiError> {
        let content = serde_json::to_string(&TextContent { text })?;
        self.send_message(token, chat_id, "text", content).await
    }

    pub async fn post_file(
        &self,
        token: &AccessToken,
        chat_id: &str,
        file_key: &FileKey,
    ) -> Result<(), ApiError> {
        let content = serde_json::to_string(&MediaContent {
            file_key: file_key.as_str(),
        })?;
        self.send_message(token, chat_id, "media", content).await
    }

    async fn send_message(
        &self,
        token: &AccessToken,
        chat_id: &str,
        msg_type: &str,
        content: String,
    ) -> Result<(), ApiError> {
        let request = SendMessageRequest {
            receive_id: chat_id,
            msg_type,
            content,
        };
        let response = self
            .http
            .post(self.endpoint(MESSAGES_PATH))
            .bearer_auth(token.as_str())
            .json(&request)
            .send()
            .await?;

        let _: SendMessageResponse = decode(response).await?;
        tracing::debug!(target: "feishu", chat_id, msg_type, "message posted");
        Ok(())
    }

    /// Streams `path` to the file endpoint and returns its `file_key`.
    pub async fn upload_file(&self, token: &AccessToken, path: &Path) -> Result<FileKey, ApiError> {
        let file_error = |source| ApiError::File {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(file_error)?;
        let length = file.metadata().await.map_err(file_error)?.len();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("download.mp4")
            .to_string();

        let part = Part::stream_with_length(Body::from(file), length)
            .file_name(file_name.clone())
            .mime_str(UPLOAD_MIME)?;
        let form = Form::new()
            .text("file_type", UPLOAD_FILE_TYPE)
            .text("file_name", file_name)
            .part("file", part);

        let response = self
            .http
            .post(self.endpoint(FILES_PATH))
            .bearer_auth(token.as_str())
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = decode(response).await?;
        let file_key = body
            .data
            .and_then(|data| data.file_key)
            .filter(|key| !key.is_empty())
            .ok_or(ApiError::MissingField("data.file_key"))?;

        tracing::debug!(target: "feishu", size = length, file_key = %file_key, "file uploaded");
        Ok(FileKey::new(file_key))
    }
}

/// Checks the transport status first, then the code embedded in the body.
async fn decode<T>(response: Response) -> Result<T, ApiError>
where
    T: DeserializeOwned + RemoteStatus,
{
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }

    let payload: T = response.json().await?;
    if payload.code() != 0 {
        return Err(ApiError::Remote {
            code: payload.code(),
            msg: payload.msg().to_string(),
        });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;

    fn client_for(server: &Server) -> FeishuClient {
        FeishuClient::new(Client::new(), server.url())
    }

    #[tokio::test]
    async fn fetch_token_returns_token_and_expiry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_body(Matcher::Json(json!({"app_id": "cli_a", "app_secret": "s3cret"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":0,"msg":"ok","tenant_access_token":"T1","expire":7200}"#)
            .create_async()
            .await;

        let issued = client_for(&server)
            .fetch_token("cli_a", "s3cret")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(issued.token.as_str(), "T1");
        assert_eq!(issued.expires_in, Some(Duration::from_secs(7200)));
    }

    #[tokio::test]
    async fn fetch_token_rejects_nonzero_code() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":10003,"msg":"invalid param"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .fetch_token("cli_a", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Remote { code: 10003, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn fetch_token_rejects_http_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", TOKEN_PATH)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client_for(&server)
            .fetch_token("cli_a", "s3cret")
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_token_requires_token_field() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":0,"msg":"ok"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .fetch_token("cli_a", "s3cret")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingField("tenant_access_token")));
    }

    #[tokio::test]
    async fn post_text_encodes_content_as_json_string() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/im/v1/messages")
            .match_query(Matcher::UrlEncoded("receive_id_type".into(), "chat_id".into()))
            .match_header("authorization", "Bearer T1")
            .match_body(Matcher::Json(json!({
                "receive_id": "oc_123",
                "msg_type": "text",
                "content": "{\"text\":\"say \\\"hi\\\"\"}",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":0,"msg":"success","data":{"message_id":"om_1"}}"#)
            .create_async()
            .await;

        client_for(&server)
            .post_text(&AccessToken::new("T1"), "oc_123", "say \"hi\"")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_file_sends_media_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/im/v1/messages")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "msg_type": "media",
                "content": "{\"file_key\":\"file_key_456\"}",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":0,"msg":"success"}"#)
            .create_async()
            .await;

        client_for(&server)
            .post_file(
                &AccessToken::new("T1"),
                "oc_123",
                &FileKey::new("file_key_456"),
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_text_surfaces_remote_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/im/v1/messages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":230002,"msg":"bot not in chat"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .post_text(&AccessToken::new("T1"), "oc_123", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Remote { code: 230002, .. }));
    }

    #[tokio::test]
    async fn upload_file_returns_file_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("download.mp4");
        std::fs::write(&path, b"fake video bytes").unwrap();

        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", FILES_PATH)
            .match_header("authorization", "Bearer T1")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data; boundary=.*".into()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file_type"\r\n\r\nmp4"#.into()),
                Matcher::Regex(r#"name="file_name"\r\n\r\ndownload.mp4"#.into()),
                Matcher::Regex("(?i)content-type: video/mp4".into()),
                Matcher::Regex("fake video bytes".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":0,"msg":"success","data":{"file_key":"file_key_456"}}"#)
            .create_async()
            .await;

        let key = client_for(&server)
            .upload_file(&AccessToken::new("T1"), &path)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(key, FileKey::new("file_key_456"));
    }

    #[tokio::test]
    async fn upload_file_requires_file_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("download.mp4");
        std::fs::write(&path, b"x").unwrap();

        let mut server = Server::new_async().await;
        server
            .mock("POST", FILES_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":0,"msg":"success","data":{}}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .upload_file(&AccessToken::new("T1"), &path)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingField("data.file_key")));
    }

    #[tokio::test]
    async fn upload_file_reports_missing_artifact() {
        let server = Server::new_async().await;
        let err = client_for(&server)
            .upload_file(&AccessToken::new("T1"), Path::new("/nonexistent/download.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::File { .. }));
    }
}
