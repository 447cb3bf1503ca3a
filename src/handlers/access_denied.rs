use teloxide::{prelude::*, types::UpdateKind};

use crate::{access::ACCESS_DENIED_TEXT, errors::HandlerResult};

/// Endpoint for every update from a user outside the allow-list
pub async fn access_denied(bot: Bot, update: Update) -> HandlerResult {
    let Some(user) = update.from() else {
        return Ok(());
    };
    log::warn!(
        "Unauthorized access attempt by {} (@{})",
        user.id,
        user.username.as_deref().unwrap_or("-")
    );

    if let UpdateKind::CallbackQuery(query) = &update.kind {
        bot.answer_callback_query(&query.id).await?;
    }
    if let Some(chat) = update.chat() {
        bot.send_message(chat.id, ACCESS_DENIED_TEXT).await?;
    }
    Ok(())
}
