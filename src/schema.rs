use teloxide::{dispatching::UpdateHandler, prelude::*, utils::command::BotCommands};

use crate::{
    access::AccessList,
    channel::TelegramChannel,
    commands::*,
    conversation::ConversationController,
    errors::BotError,
    handlers::{access_denied, choice_received, text_received},
    video::YtDlp,
};

pub type BotController = ConversationController<TelegramChannel, YtDlp>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Show the welcome message
    Start,
    /// Cancel the current operation
    Cancel,
}

pub fn schema() -> UpdateHandler<BotError> {
    use dptree::case;

    let commands = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Cancel].endpoint(cancel));

    dptree::entry()
        // Authorization runs before anything else sees the update
        .branch(
            dptree::filter(|update: Update, access: AccessList| {
                !access.allows(update.from().map(|user| user.id))
            })
            .endpoint(access_denied),
        )
        .branch(
            Update::filter_message()
                .branch(commands)
                // Unknown commands land here too; a pending rename may use them
                .branch(Message::filter_text().endpoint(text_received)),
        )
        .branch(Update::filter_callback_query().endpoint(choice_received))
}
