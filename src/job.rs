use std::{fmt, path::PathBuf, sync::Arc, time::Duration};

use teloxide::{
    types::{ChatId, MessageId},
    utils::html,
};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

use crate::{
    channel::{AudioUpload, DeliveryChannel},
    errors::{BotError, BotResult},
    progress::ProgressReporter,
    temp_dir::TempDir,
    utils::{sanitize_filename, truncate_chars},
    video::{FetchRequest, MediaFetcher},
};

pub const PREPARING_TEXT: &str = "🔄 Preparing to download...";
pub const UPLOADING_TEXT: &str = "⬆️ Uploading to Telegram...";

/// Room left for the template around the error text
const MAX_ERROR_CHARS: usize = 3500;

/// Unique job identifier, also the name of the job's scratch directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One download-and-deliver request
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub chat_id: ChatId,
    pub url: String,
    /// Sanitized name chosen by the user
    pub filename: Option<String>,
}

impl Job {
    pub fn new(chat_id: ChatId, url: impl Into<String>, filename: Option<String>) -> Self {
        Self {
            id: JobId::new(),
            chat_id,
            url: url.into(),
            filename,
        }
    }
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Delivered,
    /// The error text the user was shown
    Failed(String),
    /// The status message could not even be created
    Aborted,
}

/// Runs jobs against a delivery channel and a media fetcher
pub struct JobRunner<C, F> {
    channel: Arc<C>,
    fetcher: Arc<F>,
    work_dir: PathBuf,
    progress_interval: Duration,
    completion_text: String,
}

impl<C, F> Clone for JobRunner<C, F> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            fetcher: self.fetcher.clone(),
            work_dir: self.work_dir.clone(),
            progress_interval: self.progress_interval,
            completion_text: self.completion_text.clone(),
        }
    }
}

impl<C: DeliveryChannel, F: MediaFetcher> JobRunner<C, F> {
    pub fn new(
        channel: Arc<C>,
        fetcher: Arc<F>,
        work_dir: impl Into<PathBuf>,
        progress_interval: Duration,
        creator_name: &str,
        connect_link: &str,
    ) -> Self {
        Self {
            channel,
            fetcher,
            work_dir: work_dir.into(),
            progress_interval,
            completion_text: completion_text(creator_name, connect_link),
        }
    }

    /// Starts the job in the background. The caller does not have to await
    /// the handle.
    pub fn spawn(&self, job: Job) -> JoinHandle<JobOutcome> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(job).await })
    }

    /// Runs the job to completion. Never returns an error: failures end up in
    /// the status message.
    pub async fn run(&self, job: Job) -> JobOutcome {
        log::info!(
            "Starting job {} for chat {}: {} (filename: {:?})",
            job.id,
            job.chat_id,
            job.url,
            job.filename
        );

        let status = match self.channel.send_text(job.chat_id, PREPARING_TEXT).await {
            Ok(id) => id,
            Err(e) => {
                log::error!("Job {}: could not send status message: {}", job.id, e);
                return JobOutcome::Aborted;
            }
        };

        match self.download_and_deliver(&job, status).await {
            Ok(()) => {
                log::info!("Job {} delivered", job.id);
                JobOutcome::Delivered
            }
            Err(e) => {
                log::error!("Job {} failed: {}", job.id, e);
                if let Err(edit_err) = self
                    .channel
                    .edit_text(job.chat_id, status, &error_text(&e))
                    .await
                {
                    log::warn!("Job {}: could not show the error: {}", job.id, edit_err);
                }
                JobOutcome::Failed(e.to_string())
            }
        }
    }

    async fn download_and_deliver(&self, job: &Job, status: MessageId) -> BotResult<()> {
        let workspace = TempDir::create(self.work_dir.join(job.id.to_string()))?;

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(
            self.channel.clone(),
            job.chat_id,
            status,
            self.progress_interval,
        );
        let reporting = tokio::spawn(reporter.run(progress_rx));

        let request = FetchRequest {
            url: job.url.clone(),
            filename: job.filename.clone(),
            output_dir: workspace.path().to_path_buf(),
        };
        let fetched = self.fetcher.fetch_audio(request, progress_tx).await;

        // Progress edits must not land after the terminal text
        if let Err(e) = reporting.await {
            log::warn!("Job {}: progress reporter stopped abnormally: {}", job.id, e);
        }
        let fetched = fetched?;

        if let Err(e) = self
            .channel
            .edit_text(job.chat_id, status, UPLOADING_TEXT)
            .await
        {
            log::warn!("Job {}: could not show upload status: {}", job.id, e);
        }

        let title = job.filename.clone().unwrap_or(fetched.title);
        let stem = match sanitize_filename(&title) {
            stem if stem.is_empty() => "audio".to_string(),
            stem => stem,
        };
        let upload = AudioUpload {
            path: fetched.path,
            file_name: format!("{}.mp3", stem),
            caption: audio_caption(&title),
            title,
            duration_seconds: fetched.duration_seconds,
        };
        self.channel.send_audio(job.chat_id, &upload).await?;

        if let Err(e) = self
            .channel
            .send_text(job.chat_id, &self.completion_text)
            .await
        {
            log::warn!("Job {}: could not send completion message: {}", job.id, e);
        }
        if let Err(e) = self.channel.delete_message(job.chat_id, status).await {
            log::warn!("Job {}: could not delete status message: {}", job.id, e);
        }
        Ok(())
    }
}

pub fn audio_caption(title: &str) -> String {
    format!(
        "🎵 <b>{}</b>\n\n⚠️ Remember to respect copyright laws.",
        html::escape(title)
    )
}

pub fn completion_text(creator_name: &str, connect_link: &str) -> String {
    format!(
        "✅ Task complete! Connect with <b>{}</b> here: {}",
        html::escape(creator_name),
        html::escape(connect_link)
    )
}

pub fn error_text(error: &BotError) -> String {
    format!(
        "❌ <b>An error occurred</b>\n\n<code>{}</code>",
        html::escape(&truncate_chars(&error.to_string(), MAX_ERROR_CHARS))
    )
}
