use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One request to download `url` and deliver the result back to `chat_id`.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub id: Uuid,
    pub chat_id: String,
    pub url: String,
    pub received_at: DateTime<Utc>,
}

impl DownloadJob {
    pub fn new(chat_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id: chat_id.into(),
            url: url.into(),
            received_at: Utc::now(),
        }
    }
}
