use std::{str::FromStr, sync::Arc};

use teloxide::{
    types::{ChatId, MessageId},
    utils::html,
};
use tokio::task::JoinHandle;
use url::Url;

use crate::{
    channel::DeliveryChannel,
    config::Settings,
    errors::{BotError, BotResult, HandlerResult},
    job::{Job, JobOutcome, JobRunner},
    session::{ConversationState, Session, SessionKey, SessionStore},
    utils::{RenameChoice, sanitize_filename, truncate_chars, validate_link},
    video::{
        MediaFetcher,
        youtube::{check_duration, format_duration},
    },
};

pub const CHECKING_TEXT: &str = "🔍 Checking video details...";
pub const MENU_TEXT: &str = "Video is valid! What would you like to name the file?";
pub const KEEP_ORIGINAL_TEXT: &str = "Great! Using the original title.";
pub const ASK_NAME_TEXT: &str = "Okay, please send me the new name for your MP3 file.";
pub const LOST_LINK_TEXT: &str = "Sorry, I lost the link. Please send it again.";
pub const CANCELLED_TEXT: &str = "Operation cancelled.";
pub const CHOICE_HINT_TEXT: &str =
    "Please pick one of the options above, or send /cancel to start over.";
pub const EMPTY_NAME_TEXT: &str =
    "⚠️ That name has no usable characters left. Please send another name.";
pub const TIMED_OUT_TEXT: &str =
    "⌛ The conversation timed out. Send the link again to start over.";

const MAX_PROBE_ERROR_CHARS: usize = 3500;

/// The rename-or-keep state machine. One instance serves every chat; state
/// lives in the session store keyed by chat and user.
pub struct ConversationController<C, F> {
    channel: Arc<C>,
    fetcher: Arc<F>,
    sessions: SessionStore,
    jobs: JobRunner<C, F>,
    max_duration_seconds: Option<u32>,
    welcome_image: Option<Url>,
    creator_name: String,
}

impl<C: DeliveryChannel, F: MediaFetcher> ConversationController<C, F> {
    pub fn new(channel: Arc<C>, fetcher: Arc<F>, settings: &Settings) -> Self {
        let jobs = JobRunner::new(
            channel.clone(),
            fetcher.clone(),
            &settings.work_dir,
            settings.progress_interval,
            &settings.creator_name,
            &settings.connect_link,
        );
        Self {
            channel,
            fetcher,
            sessions: SessionStore::new(settings.conversation_timeout),
            jobs,
            max_duration_seconds: settings.max_duration_seconds,
            welcome_image: settings.welcome_image.clone(),
            creator_name: settings.creator_name.clone(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Greets the user with the welcome photo, or plain text if the photo
    /// cannot be sent
    pub async fn start(&self, chat_id: ChatId, first_name: &str) -> HandlerResult {
        let caption = welcome_text(first_name, &self.creator_name);
        if let Some(image) = &self.welcome_image {
            match self.channel.send_photo(chat_id, image, &caption).await {
                Ok(()) => return Ok(()),
                Err(e) => log::warn!("Failed to send welcome photo to {}: {}", chat_id, e),
            }
        }
        self.channel.send_text(chat_id, &caption).await?;
        Ok(())
    }

    /// Drops whatever the user was doing. Running jobs are not affected.
    pub async fn cancel(&self, key: SessionKey) -> HandlerResult {
        if let Some(session) = self.sessions.remove(key).await {
            log::info!("Conversation {:?} cancelled in state {:?}", key, session.state);
        }
        self.channel.send_text(key.chat_id, CANCELLED_TEXT).await?;
        Ok(())
    }

    /// Free text from the user: a link, or a file name when one was asked for.
    /// Returns the handle of a job if the text launched one.
    pub async fn text_received(
        &self,
        key: SessionKey,
        text: &str,
    ) -> BotResult<Option<JoinHandle<JobOutcome>>> {
        let state = self.sessions.state(key).await;

        match (validate_link(text), state) {
            (Ok(url), _) => {
                self.link_received(key, url).await?;
                Ok(None)
            }
            (Err(_), ConversationState::AwaitingNewName) => self.name_received(key, text).await,
            (Err(_), ConversationState::AwaitingRenameChoice) => {
                self.sessions.update(key, |_| {}).await;
                self.channel.send_text(key.chat_id, CHOICE_HINT_TEXT).await?;
                Ok(None)
            }
            // Unknown commands only mean something as a file name
            (Err(_), ConversationState::Idle) if text.trim_start().starts_with('/') => {
                log::debug!("Ignoring unknown command from {:?}: {}", key, text);
                Ok(None)
            }
            (Err(rejection), ConversationState::Idle) => {
                log::debug!("Rejected text from {:?}: {:?}", key, rejection);
                self.channel
                    .send_text(key.chat_id, &rejection.to_string())
                    .await?;
                Ok(None)
            }
        }
    }

    /// A button on a rename menu was pressed. `menu_message` is the message
    /// carrying the button, when Telegram still has it.
    pub async fn choice_received(
        &self,
        key: SessionKey,
        menu_message: Option<MessageId>,
        data: &str,
    ) -> BotResult<Option<JoinHandle<JobOutcome>>> {
        let choice = match RenameChoice::from_str(data) {
            Ok(choice) => choice,
            Err(_) => {
                log::warn!("Unknown callback data from {:?}: {}", key, data);
                return Ok(None);
            }
        };

        let session = self
            .sessions
            .get(key)
            .await
            .filter(|session| menu_message.is_none() || session.menu_message == menu_message);
        let Some(session) = session else {
            self.reply_on_menu(key.chat_id, menu_message, LOST_LINK_TEXT)
                .await?;
            return Ok(None);
        };

        if session.state != ConversationState::AwaitingRenameChoice {
            log::debug!("Ignoring {} from {:?} in state {:?}", choice, key, session.state);
            return Ok(None);
        }

        match choice {
            RenameChoice::KeepOriginal => {
                let Some(job) = self.take_job(key).await else {
                    self.reply_on_menu(key.chat_id, menu_message, LOST_LINK_TEXT)
                        .await?;
                    return Ok(None);
                };
                self.reply_on_menu(key.chat_id, menu_message, KEEP_ORIGINAL_TEXT)
                    .await?;
                Ok(Some(self.jobs.spawn(job)))
            }
            RenameChoice::Rename => {
                self.sessions
                    .update(key, |s| s.state = ConversationState::AwaitingNewName)
                    .await;
                self.reply_on_menu(key.chat_id, menu_message, ASK_NAME_TEXT)
                    .await?;
                Ok(None)
            }
        }
    }

    /// Drops timed-out sessions and tells their users. Returns how many were
    /// dropped.
    pub async fn expire_idle(&self) -> usize {
        let expired = self.sessions.purge_expired().await;
        for (key, session) in &expired {
            log::info!("Conversation {:?} timed out in state {:?}", key, session.state);
            if let Err(e) = self.channel.send_text(key.chat_id, TIMED_OUT_TEXT).await {
                log::warn!("Failed to send timeout notice to {}: {}", key.chat_id, e);
            }
        }
        expired.len()
    }

    async fn link_received(&self, key: SessionKey, url: &str) -> HandlerResult {
        log::info!("Link from {:?}: {}", key, url);
        let check = self.channel.send_text(key.chat_id, CHECKING_TEXT).await?;

        let refusal = match self.fetcher.probe(url).await {
            Ok(info) => match check_duration(info.duration_seconds, self.max_duration_seconds) {
                Ok(()) => None,
                Err(e) => {
                    log::info!("Refusing {}: {}", url, e);
                    Some(too_long_text(&e))
                }
            },
            Err(e) => {
                log::error!("Pre-check failed for {}: {}", url, e);
                Some(probe_failed_text(&e))
            }
        };

        if let Some(text) = refusal {
            self.sessions.remove(key).await;
            if let Err(e) = self.channel.edit_text(key.chat_id, check, &text).await {
                log::warn!("Failed to show probe result: {}", e);
            }
            return Ok(());
        }

        if let Err(e) = self.channel.delete_message(key.chat_id, check).await {
            log::warn!("Failed to delete check message: {}", e);
        }
        let menu = self.channel.send_rename_menu(key.chat_id, MENU_TEXT).await?;
        self.sessions
            .insert(key, Session::awaiting_choice(url, menu))
            .await;
        Ok(())
    }

    async fn name_received(
        &self,
        key: SessionKey,
        text: &str,
    ) -> BotResult<Option<JoinHandle<JobOutcome>>> {
        let name = sanitize_filename(text);
        if name.is_empty() {
            self.sessions.update(key, |_| {}).await;
            self.channel.send_text(key.chat_id, EMPTY_NAME_TEXT).await?;
            return Ok(None);
        }

        let chosen = name.clone();
        self.sessions
            .update(key, move |s| s.filename_choice = Some(chosen))
            .await;
        let Some(job) = self.take_job(key).await else {
            self.channel.send_text(key.chat_id, LOST_LINK_TEXT).await?;
            return Ok(None);
        };

        self.channel
            .send_text(
                key.chat_id,
                &format!("Got it! I'll name the file: <code>{}</code>", html::escape(&name)),
            )
            .await?;
        Ok(Some(self.jobs.spawn(job)))
    }

    /// Ends the conversation and turns what it collected into a job
    async fn take_job(&self, key: SessionKey) -> Option<Job> {
        let session = self.sessions.take(key).await?;
        let url = session.pending_url?;
        Some(Job::new(key.chat_id, url, session.filename_choice))
    }

    /// Replaces the menu text when the menu message is known, otherwise
    /// answers with a new message
    async fn reply_on_menu(
        &self,
        chat_id: ChatId,
        menu_message: Option<MessageId>,
        text: &str,
    ) -> HandlerResult {
        if let Some(message_id) = menu_message {
            match self.channel.edit_text(chat_id, message_id, text).await {
                Ok(()) => return Ok(()),
                Err(e) => log::warn!("Failed to edit menu message: {}", e),
            }
        }
        self.channel.send_text(chat_id, text).await?;
        Ok(())
    }
}

pub fn welcome_text(first_name: &str, creator_name: &str) -> String {
    format!(
        "👋 Hello, {}!\n\nI am a YouTube to MP3 converter bot, created by <b>{}</b>.\n\n\
         Send me a YouTube video link to begin.\n\n\
         ⚠️ <b>Disclaimer</b>: This tool is for personal use only.",
        html::escape(first_name),
        html::escape(creator_name)
    )
}

fn too_long_text(error: &BotError) -> String {
    match error {
        BotError::DurationExceeded { duration, max } => format!(
            "❌ <b>Video is too long!</b> It runs {}, this bot can only process videos under {} minutes to avoid errors and long waits.",
            format_duration(*duration),
            max / 60
        ),
        other => probe_failed_text(other),
    }
}

fn probe_failed_text(error: &BotError) -> String {
    format!(
        "❌ Could not check the video. It might be private or invalid.\n\n<code>{}</code>",
        html::escape(&truncate_chars(&error.to_string(), MAX_PROBE_ERROR_CHARS))
    )
}
