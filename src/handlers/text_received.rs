use std::sync::Arc;

use teloxide::prelude::*;

use crate::{errors::HandlerResult, schema::BotController, session::SessionKey};

pub async fn text_received(
    msg: Message,
    text: String,
    controller: Arc<BotController>,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        log::debug!("Ignoring text without a sender in chat {}", msg.chat.id);
        return Ok(());
    };

    // The job, if any, runs detached from the dispatcher
    controller
        .text_received(SessionKey::new(msg.chat.id, user.id), &text)
        .await?;
    Ok(())
}
