//! In-memory collaborators for unit tests.

use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId};
use url::Url;

use crate::{
    channel::{AudioUpload, DeliveryChannel},
    errors::{BotError, BotResult, EditError},
    video::{
        FetchRequest, FetchedAudio, MediaFetcher, MediaInfo, ProgressSender, ProgressSnapshot,
        ProgressStatus,
    },
};

pub fn downloading(percent: f32) -> ProgressSnapshot {
    ProgressSnapshot {
        status: ProgressStatus::Downloading,
        percent: Some(percent),
        speed: Some(512.0 * 1024.0),
        eta: Some(Duration::from_secs(30)),
    }
}

pub fn finished() -> ProgressSnapshot {
    ProgressSnapshot {
        status: ProgressStatus::Finished,
        percent: Some(100.0),
        speed: None,
        eta: None,
    }
}

/// Everything the channel was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(ChatId, MessageId, String),
    Menu(ChatId, MessageId, String),
    Edit(ChatId, MessageId, String),
    Delete(ChatId, MessageId),
    Photo(ChatId, Url, String),
    Audio(ChatId, AudioUpload),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditFailure {
    NotModified,
    Failed,
}

#[derive(Default)]
struct ChannelState {
    next_id: i32,
    log: Vec<Outbound>,
    edit_failure: Option<EditFailure>,
    fail_photo: bool,
    fail_audio: bool,
    /// Whether the audio file existed when the upload was requested
    audio_file_present: Vec<bool>,
}

/// Records outbound traffic and hands out increasing message ids
#[derive(Default)]
pub struct RecordingChannel {
    state: Mutex<ChannelState>,
}

impl RecordingChannel {
    pub fn fail_edits_with_not_modified(&self) {
        self.state.lock().unwrap().edit_failure = Some(EditFailure::NotModified);
    }

    pub fn fail_edits(&self) {
        self.state.lock().unwrap().edit_failure = Some(EditFailure::Failed);
    }

    pub fn fail_photo(&self) {
        self.state.lock().unwrap().fail_photo = true;
    }

    pub fn fail_audio(&self) {
        self.state.lock().unwrap().fail_audio = true;
    }

    pub fn log(&self) -> Vec<Outbound> {
        self.state.lock().unwrap().log.clone()
    }

    /// Plain texts and menus, in order
    pub fn texts(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                Outbound::Text(_, _, text) | Outbound::Menu(_, _, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn menus(&self) -> Vec<MessageId> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                Outbound::Menu(_, id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<(MessageId, String)> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                Outbound::Edit(_, id, text) => Some((id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<MessageId> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                Outbound::Delete(_, id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn audios(&self) -> Vec<AudioUpload> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                Outbound::Audio(_, audio) => Some(audio),
                _ => None,
            })
            .collect()
    }

    pub fn audio_file_present(&self) -> Vec<bool> {
        self.state.lock().unwrap().audio_file_present.clone()
    }

    fn allocate(state: &mut ChannelState) -> MessageId {
        state.next_id += 1;
        MessageId(state.next_id)
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> BotResult<MessageId> {
        let mut state = self.state.lock().unwrap();
        let id = Self::allocate(&mut state);
        state.log.push(Outbound::Text(chat_id, id, text.to_string()));
        Ok(id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), EditError> {
        let mut state = self.state.lock().unwrap();
        state
            .log
            .push(Outbound::Edit(chat_id, message_id, text.to_string()));
        match state.edit_failure {
            None => Ok(()),
            Some(EditFailure::NotModified) => Err(EditError::NotModified),
            Some(EditFailure::Failed) => Err(EditError::Failed(BotError::general("edit failed"))),
        }
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> BotResult<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(Outbound::Delete(chat_id, message_id));
        Ok(())
    }

    async fn send_rename_menu(&self, chat_id: ChatId, text: &str) -> BotResult<MessageId> {
        let mut state = self.state.lock().unwrap();
        let id = Self::allocate(&mut state);
        state.log.push(Outbound::Menu(chat_id, id, text.to_string()));
        Ok(id)
    }

    async fn send_photo(&self, chat_id: ChatId, photo: &Url, caption: &str) -> BotResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_photo {
            return Err(BotError::general("photo rejected"));
        }
        state
            .log
            .push(Outbound::Photo(chat_id, photo.clone(), caption.to_string()));
        Ok(())
    }

    async fn send_audio(&self, chat_id: ChatId, audio: &AudioUpload) -> BotResult<()> {
        let mut state = self.state.lock().unwrap();
        state.audio_file_present.push(audio.path.exists());
        if state.fail_audio {
            return Err(BotError::general("upload rejected"));
        }
        state.log.push(Outbound::Audio(chat_id, audio.clone()));
        Ok(())
    }
}

/// Scripted fetcher that writes small files into the job directory
pub struct StubFetcher {
    info: MediaInfo,
    probe_error: Option<String>,
    fetch_error: Option<String>,
    /// Whether a failing fetch writes a partial download first
    leaves_partial_file: bool,
    snapshots: Vec<ProgressSnapshot>,
    probes: AtomicUsize,
    fetches: AtomicUsize,
    requests: Mutex<Vec<FetchRequest>>,
}

impl StubFetcher {
    pub fn new(title: &str, duration_seconds: u32) -> Self {
        Self {
            info: MediaInfo {
                title: title.to_string(),
                duration_seconds: Some(duration_seconds),
            },
            probe_error: None,
            fetch_error: None,
            leaves_partial_file: true,
            snapshots: vec![downloading(25.0), downloading(75.0), finished()],
            probes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_probe_error(mut self, message: &str) -> Self {
        self.probe_error = Some(message.to_string());
        self
    }

    pub fn with_fetch_error(mut self, message: &str) -> Self {
        self.fetch_error = Some(message.to_string());
        self
    }

    /// Fails the fetch without writing anything to the job directory
    pub fn with_fetch_error_before_output(mut self, message: &str) -> Self {
        self.fetch_error = Some(message.to_string());
        self.leaves_partial_file = false;
        self
    }

    /// Probe reports no length, like a live stream
    pub fn with_unknown_duration(mut self) -> Self {
        self.info.duration_seconds = None;
        self
    }

    pub fn with_snapshots(mut self, snapshots: Vec<ProgressSnapshot>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn probe_calls(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for StubFetcher {
    async fn probe(&self, _url: &str) -> BotResult<MediaInfo> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match &self.probe_error {
            Some(message) => Err(BotError::fetch_error(message.clone())),
            None => Ok(self.info.clone()),
        }
    }

    async fn fetch_audio(
        &self,
        request: FetchRequest,
        progress: ProgressSender,
    ) -> BotResult<FetchedAudio> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        for snapshot in &self.snapshots {
            let _ = progress.send(snapshot.clone());
        }

        let stem = request
            .filename
            .clone()
            .unwrap_or_else(|| self.info.title.clone());

        if let Some(message) = &self.fetch_error {
            if self.leaves_partial_file {
                std::fs::write(
                    request.output_dir.join(format!("{}.webm.part", stem)),
                    b"partial",
                )?;
            }
            return Err(BotError::fetch_error(message.clone()));
        }

        let path = request.output_dir.join(format!("{}.mp3", stem));
        std::fs::write(&path, b"ID3")?;
        Ok(FetchedAudio {
            path,
            title: self.info.title.clone(),
            duration_seconds: self.info.duration_seconds.unwrap_or(0),
        })
    }
}
