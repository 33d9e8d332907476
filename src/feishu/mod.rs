//! Feishu open API: tenant auth, chat messages and file uploads.

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{AccessToken, FileKey};

pub use auth::FeishuAuth;
pub use client::{FeishuClient, DEFAULT_BASE_URL};
pub use error::ApiError;

/// Supplies a valid access token for the next batch of API calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, ApiError>;
}

/// The chat operations the worker needs.
#[async_trait]
pub trait ChatMessenger: Send + Sync {
    async fn post_text(&self, token: &AccessToken, chat_id: &str, text: &str)
        -> Result<(), ApiError>;

    async fn upload_file(&self, token: &AccessToken, path: &Path) -> Result<FileKey, ApiError>;

    async fn post_file(
        &self,
        token: &AccessToken,
        chat_id: &str,
        file_key: &FileKey,
    ) -> Result<(), ApiError>;
}

#[async_trait]
impl ChatMessenger for FeishuClient {
    async fn post_text(
        &self,
        token: &AccessToken,
        chat_id: &str,
        text: &str,
    ) -> Result<(), ApiError> {
        FeishuClient::post_text(self, token, chat_id, text).await
    }

    async fn upload_file(&self, token: &AccessToken, path: &Path) -> Result<FileKey, ApiError> {
        FeishuClient::upload_file(self, token, path).await
    }

    async fn post_file(
        &self,
        token: &AccessToken,
        chat_id: &str,
        file_key: &FileKey,
    ) -> Result<(), ApiError> {
        FeishuClient::post_file(self, token, chat_id, file_key).await
    }
}
