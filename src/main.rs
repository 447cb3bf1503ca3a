mod access;
mod channel;
mod commands;
mod config;
mod conversation;
mod errors;
mod handlers;
mod job;
mod progress;
mod schema;
mod session;
mod temp_dir;
#[cfg(test)]
mod testing;
mod utils;
mod video;

use std::sync::Arc;

use teloxide::prelude::*;

use crate::{
    access::AccessList,
    channel::TelegramChannel,
    config::{SESSION_SWEEP_INTERVAL, Settings},
    conversation::ConversationController,
    schema::{BotController, schema},
    utils::clear_dir,
    video::YtDlp,
};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    pretty_env_logger::init();
    log::info!("Starting yt-audio-bot...");

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::fs::create_dir_all(&settings.work_dir).await {
        log::error!(
            "Cannot create work directory {}: {}",
            settings.work_dir.display(),
            e
        );
        std::process::exit(1);
    }

    let bot = Bot::new(&settings.bot_token);
    let channel = Arc::new(TelegramChannel::new(bot.clone()));
    let fetcher = Arc::new(YtDlp::new(&settings.ytdlp_path, settings.audio_bitrate_kbps));
    let controller: Arc<BotController> =
        Arc::new(ConversationController::new(channel, fetcher, &settings));
    let access = AccessList::new(settings.allowed_users.clone());
    log::info!(
        "Max duration: {:?}s, conversation timeout: {:?}",
        settings.max_duration_seconds,
        settings.conversation_timeout
    );

    tokio::spawn(sweep_sessions(controller.clone()));

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![controller, access])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    if let Err(e) = clear_dir(&settings.work_dir).await {
        log::warn!("Failed to clear {}: {}", settings.work_dir.display(), e);
    }
}

/// Periodically drops conversations nobody touched within the timeout
async fn sweep_sessions(controller: Arc<BotController>) {
    let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let expired = controller.expire_idle().await;
        if expired > 0 {
            log::debug!(
                "Expired {} idle conversations, {} still open",
                expired,
                controller.sessions().len().await
            );
        }
    }
}
