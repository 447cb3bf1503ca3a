use std::sync::Arc;

use teloxide::prelude::*;

use crate::{errors::HandlerResult, schema::BotController};

pub async fn start(msg: Message, controller: Arc<BotController>) -> HandlerResult {
    let first_name = msg
        .from
        .as_ref()
        .map(|user| user.first_name.as_str())
        .unwrap_or("there");
    controller.start(msg.chat.id, first_name).await
}
