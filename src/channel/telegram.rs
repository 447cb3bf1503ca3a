use async_trait::async_trait;
use strum::IntoEnumIterator;
use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, ParseMode},
};
use url::Url;

use super::{AudioUpload, DeliveryChannel};
use crate::{
    errors::{BotResult, EditError},
    utils::RenameChoice,
};

/// Delivery over the Telegram Bot API
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn rename_keyboard() -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = RenameChoice::iter()
        .map(|choice| vec![InlineKeyboardButton::callback(choice.label(), choice.to_string())])
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> BotResult<MessageId> {
        let message = self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(message.id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), EditError> {
        self.bot
            .edit_message_text(chat_id, message_id, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> BotResult<()> {
        self.bot.delete_message(chat_id, message_id).await?;
        Ok(())
    }

    async fn send_rename_menu(&self, chat_id: ChatId, text: &str) -> BotResult<MessageId> {
        let message = self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(rename_keyboard())
            .await?;
        Ok(message.id)
    }

    async fn send_photo(&self, chat_id: ChatId, photo: &Url, caption: &str) -> BotResult<()> {
        self.bot
            .send_photo(chat_id, InputFile::url(photo.clone()))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    async fn send_audio(&self, chat_id: ChatId, audio: &AudioUpload) -> BotResult<()> {
        self.bot
            .send_audio(
                chat_id,
                InputFile::file(&audio.path).file_name(audio.file_name.clone()),
            )
            .title(audio.title.clone())
            .duration(audio.duration_seconds)
            .caption(audio.caption.clone())
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}
