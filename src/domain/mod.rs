pub mod job;
pub mod types;

pub use job::DownloadJob;
pub use types::{AccessToken, FileKey, JobStage, QueueSnapshot};
