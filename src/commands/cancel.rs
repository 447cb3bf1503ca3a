use std::sync::Arc;

use teloxide::prelude::*;

use crate::{errors::HandlerResult, schema::BotController, session::SessionKey};

pub async fn cancel(msg: Message, controller: Arc<BotController>) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    controller
        .cancel(SessionKey::new(msg.chat.id, user.id))
        .await
}
