use serde::{Deserialize, Serialize};

/// Event pushed to the subscribers of one session room.
///
/// On the wire each event is `{"event": <name>, "data": {...}}`, mirroring the
/// event names browser clients listen for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress(ProgressPayload),
    VideoReady(ReadyPayload),
    VideoProcessingStatus(ProcessingStatusPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPayload {
    /// Whole percent, "0" through "100"
    pub percentage: String,
}

/// Terminal outcome of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadyPayload {
    Delivered {
        video_url: String,
        video_filesize: u64,
    },
    Failed {
        error_message: String,
        /// Always the literal "error"
        video_url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStatusPayload {
    pub video_processing: bool,
}

impl ProgressEvent {
    pub fn progress(percent: u8) -> Self {
        Self::Progress(ProgressPayload {
            percentage: percent.to_string(),
        })
    }

    pub fn delivered(video_url: impl Into<String>, video_filesize: u64) -> Self {
        Self::VideoReady(ReadyPayload::Delivered {
            video_url: video_url.into(),
            video_filesize,
        })
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::VideoReady(ReadyPayload::Failed {
            error_message: format!("Error: {}", error),
            video_url: "error".to_string(),
        })
    }

    pub fn processing(video_processing: bool) -> Self {
        Self::VideoProcessingStatus(ProcessingStatusPayload { video_processing })
    }

    /// Event name as seen by clients
    pub fn name(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::VideoReady(_) => "video_ready",
            Self::VideoProcessingStatus(_) => "video_processing_status",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::VideoReady(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::VideoReady(ReadyPayload::Failed { .. }))
    }
}
