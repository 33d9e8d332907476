use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::domain::AccessToken;

use super::{client::FeishuClient, error::ApiError, TokenSource};

/// Tokens are refreshed this long before the server says they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

struct CachedToken {
    token: AccessToken,
    refresh_at: Instant,
}

/// Exchanges the app credentials for a tenant access token.
///
/// Without a cache every call hits the auth endpoint. With one, a token is
/// reused until it gets within [`REFRESH_MARGIN`] of its expiry.
pub struct FeishuAuth {
    client: FeishuClient,
    app_id: String,
    app_secret: String,
    cache: Option<Mutex<Option<CachedToken>>>,
}

impl FeishuAuth {
    pub fn new(client: FeishuClient, app_id: String, app_secret: String) -> Self {
        Self {
            client,
            app_id,
            app_secret,
            cache: None,
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(|| Mutex::new(None));
        self
    }

    fn cached(&self) -> Option<AccessToken> {
        let cache = self.cache.as_ref()?.lock();
        let token = cache
            .as_ref()
            .filter(|entry| Instant::now() < entry.refresh_at)
            .map(|entry| entry.token.clone());
        token
    }

    fn remember(&self, token: &AccessToken, expires_in: Option<Duration>) {
        let (Some(cache), Some(ttl)) = (self.cache.as_ref(), expires_in) else {
            return;
        };
        let mut slot = cache.lock();
        *slot = (ttl > REFRESH_MARGIN).then(|| CachedToken {
            token: token.clone(),
            refresh_at: Instant::now() + (ttl - REFRESH_MARGIN),
        });
    }
}

#[async_trait]
impl TokenSource for FeishuAuth {
    async fn access_token(&self) -> Result<AccessToken, ApiError> {
        if let Some(token) = self.cached() {
            tracing::debug!(target: "feishu", "reusing cached tenant access token");
            return Ok(token);
        }

        let issued = self
            .client
            .fetch_token(&self.app_id, &self.app_secret)
            .await?;
        tracing::debug!(
            target: "feishu",
            expires_in_secs = issued.expires_in.map(|ttl| ttl.as_secs()),
            "tenant access token issued"
        );
        self.remember(&issued.token, issued.expires_in);
        Ok(issued.token)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Server;
    use reqwest::Client;

    use super::*;

    const TOKEN_PATH: &str = "/auth/v3/tenant_access_token/internal";

    fn token_body(token: &str, expire: u64) -> String {
        format!(r#"{{"code":0,"msg":"ok","tenant_access_token":"{token}","expire":{expire}}}"#)
    }

    fn auth_for(server: &Server) -> FeishuAuth {
        let client = FeishuClient::new(Client::new(), server.url());
        FeishuAuth::new(client, "cli_a".into(), "s3cret".into())
    }

    #[tokio::test]
    async fn fetches_fresh_token_every_time_by_default() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("T1", 7200))
            .expect(2)
            .create_async()
            .await;

        let auth = auth_for(&server);
        assert_eq!(auth.access_token().await.unwrap().as_str(), "T1");
        assert_eq!(auth.access_token().await.unwrap().as_str(), "T1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cache_reuses_long_lived_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("T1", 7200))
            .expect(1)
            .create_async()
            .await;

        let auth = auth_for(&server).with_cache(true);
        auth.access_token().await.unwrap();
        auth.access_token().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cache_skips_token_inside_refresh_margin() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("T1", 60))
            .expect(2)
            .create_async()
            .await;

        let auth = auth_for(&server).with_cache(true);
        auth.access_token().await.unwrap();
        auth.access_token().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":99991663,"msg":"app not found"}"#)
            .create_async()
            .await;

        let auth = auth_for(&server).with_cache(true);
        assert!(auth.access_token().await.is_err());
        assert!(auth.cached().is_none());
    }
}
