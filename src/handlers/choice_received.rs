use std::sync::Arc;

use teloxide::{prelude::*, types::MaybeInaccessibleMessage};

use crate::{errors::HandlerResult, schema::BotController, session::SessionKey};

pub async fn choice_received(
    bot: Bot,
    query: CallbackQuery,
    controller: Arc<BotController>,
) -> HandlerResult {
    bot.answer_callback_query(&query.id).await?;

    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };
    let Some(message) = &query.message else {
        log::warn!("Callback {} from {} has no message", data, query.from.id);
        return Ok(());
    };
    let (chat_id, menu_message) = match message {
        MaybeInaccessibleMessage::Inaccessible(m) => (m.chat.id, m.message_id),
        MaybeInaccessibleMessage::Regular(m) => (m.chat.id, m.id),
    };

    controller
        .choice_received(
            SessionKey::new(chat_id, query.from.id),
            Some(menu_message),
            data,
        )
        .await?;
    Ok(())
}
