mod telegram;

use std::path::PathBuf;

use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId};
use url::Url;

use crate::errors::{BotResult, EditError};

pub use telegram::TelegramChannel;

/// Finished audio ready to be uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct AudioUpload {
    pub path: PathBuf,
    /// Name the user sees for the file, extension included
    pub file_name: String,
    pub title: String,
    pub duration_seconds: u32,
    pub caption: String,
}

/// Outbound side of the chat. Every text is Telegram HTML.
#[async_trait]
pub trait DeliveryChannel: Send + Sync + 'static {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> BotResult<MessageId>;

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), EditError>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> BotResult<()>;

    /// Sends `text` with the keep/rename buttons attached
    async fn send_rename_menu(&self, chat_id: ChatId, text: &str) -> BotResult<MessageId>;

    async fn send_photo(&self, chat_id: ChatId, photo: &Url, caption: &str) -> BotResult<()>;

    async fn send_audio(&self, chat_id: ChatId, audio: &AudioUpload) -> BotResult<()>;
}
