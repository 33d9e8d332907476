use std::fmt;

use serde::Serialize;

/// Tenant access token for the Feishu open API. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Handle returned by the file upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileKey(String);

impl FileKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Progress of a job through the worker. A failed job reports the last
/// stage it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Received,
    Authenticated,
    NotifiedStart,
    Downloaded,
    Uploaded,
    NotifiedDone,
}

impl JobStage {
    pub fn label(&self) -> &'static str {
        match self {
            JobStage::Received => "received",
            JobStage::Authenticated => "authenticated",
            JobStage::NotifiedStart => "notified_start",
            JobStage::Downloaded => "downloaded",
            JobStage::Uploaded => "uploaded",
            JobStage::NotifiedDone => "notified_done",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueSnapshot {
    pub pending: usize,
}
