pub mod youtube;

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::BotResult;

pub use youtube::YtDlp;

/// Phase reported by the downloader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Downloading,
    Finished,
    Error,
}

/// One progress sample. Not retained past the next edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub status: ProgressStatus,
    pub percent: Option<f32>,
    /// Bytes per second
    pub speed: Option<f64>,
    pub eta: Option<Duration>,
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressSnapshot>;

/// Metadata returned by a probe
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub title: String,
    /// `None` for live streams and anything else without a known length
    pub duration_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    /// Sanitized stem chosen by the user, `None` keeps the source title
    pub filename: Option<String>,
    /// Directory owned by the job; everything written here is temporary
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAudio {
    pub path: PathBuf,
    pub title: String,
    pub duration_seconds: u32,
}

/// Resolves links to media and produces transcoded audio.
///
/// Errors are opaque: callers show them to the user as they are.
#[async_trait]
pub trait MediaFetcher: Send + Sync + 'static {
    async fn probe(&self, url: &str) -> BotResult<MediaInfo>;

    /// Downloads and transcodes. `progress` receives zero or more snapshots,
    /// a `Finished` one before the transcode starts. Sending never blocks.
    async fn fetch_audio(
        &self,
        request: FetchRequest,
        progress: ProgressSender,
    ) -> BotResult<FetchedAudio>;
}
