use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    domain::{DownloadJob, QueueSnapshot},
    tasks::queue::JobQueue,
};

use super::{
    events::{ChallengeResponse, EventEnvelope, ReceivedMessage},
    utils::extract_video_url,
};

pub struct WebhookState {
    pub queue: Arc<JobQueue<DownloadJob>>,
    pub verification_token: Option<String>,
}

impl WebhookState {
    fn token_matches(&self, envelope: &EventEnvelope) -> bool {
        match &self.verification_token {
            Some(expected) => envelope.verification_token() == Some(expected.as_str()),
            None => true,
        }
    }

    /// Queues a job if the message text carries a supported video link.
    fn accept(&self, message: ReceivedMessage, event_id: Option<&str>) {
        let Some(text) = message.text() else {
            tracing::warn!(
                target: "webhook",
                chat_id = %message.chat_id,
                message_type = ?message.message_type,
                "ignored message without text content"
            );
            return;
        };

        let Some(url) = extract_video_url(&text) else {
            tracing::warn!(
                target: "webhook",
                chat_id = %message.chat_id,
                message_id = ?message.message_id,
                "ignored message without a supported video link"
            );
            return;
        };

        let job = DownloadJob::new(message.chat_id, url);
        tracing::info!(
            target: "webhook",
            job_id = %job.id,
            event_id,
            chat_id = %job.chat_id,
            url = %job.url,
            "download job queued"
        );
        self.queue.push(job);
    }
}

pub async fn receive_event(State(state): State<Arc<WebhookState>>, body: Bytes) -> Response {
    let mut envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(target: "webhook", error = %err, "rejected malformed callback body");
            return (StatusCode::BAD_REQUEST, Json(json!({}))).into_response();
        }
    };

    if !state.token_matches(&envelope) {
        tracing::warn!(target: "webhook", "rejected callback with wrong verification token");
        return (StatusCode::UNAUTHORIZED, Json(json!({}))).into_response();
    }

    if let Some(challenge) = envelope.challenge.take() {
        tracing::info!(target: "webhook", "answered url verification challenge");
        return Json(ChallengeResponse { challenge }).into_response();
    }

    let event_type = envelope.event_type().map(str::to_string);
    let event_id = envelope
        .header
        .as_ref()
        .and_then(|header| header.event_id.clone());
    match envelope.event.and_then(|event| event.message) {
        Some(message) => state.accept(message, event_id.as_deref()),
        None => tracing::error!(
            target: "webhook",
            kind = ?envelope.kind,
            event_type = ?event_type,
            "received callback without a message"
        ),
    }
    Json(json!({})).into_response()
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub queue: QueueSnapshot,
}

pub async fn health(State(state): State<Arc<WebhookState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        queue: state.queue.snapshot(),
    })
}
