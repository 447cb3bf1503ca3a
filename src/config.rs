use std::{collections::HashSet, path::PathBuf, time::Duration};

use teloxide::types::UserId;
use url::Url;

use crate::errors::{BotError, BotResult};

const DEFAULT_MAX_DURATION_SECONDS: u32 = 900;
const DEFAULT_CONVERSATION_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 320;
const DEFAULT_WORK_DIR: &str = "downloads";
const DEFAULT_YTDLP_PATH: &str = "yt-dlp";
const DEFAULT_CREATOR_NAME: &str = "shadow maniya";
const DEFAULT_CONNECT_LINK: &str = "https://dhruvmaniyaportfolio.vercel.app/";
const DEFAULT_WELCOME_IMAGE_URL: &str = "https://i.ibb.co/bMNj87bT/download.jpg";

/// Minimum spacing between two progress edits of the same status message
pub const PROGRESS_EDIT_INTERVAL: Duration = Duration::from_secs(2);

/// How often timed-out conversations are swept
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Runtime settings, read once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: String,
    /// `None` means everybody may use the bot
    pub allowed_users: Option<HashSet<UserId>>,
    /// `None` disables the duration limit
    pub max_duration_seconds: Option<u32>,
    pub conversation_timeout: Duration,
    pub progress_interval: Duration,
    pub work_dir: PathBuf,
    pub ytdlp_path: String,
    pub audio_bitrate_kbps: u32,
    pub welcome_image: Option<Url>,
    pub creator_name: String,
    pub connect_link: String,
}

impl Settings {
    pub fn from_env() -> BotResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup, environment variables in production
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BotResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or_else(|| BotError::config_error("BOT_TOKEN environment variable not found"))?;

        let allowed_users = get("ALLOWED_USERS")
            .map(|raw| parse_user_list(&raw))
            .transpose()?;

        let max_duration_seconds = match get("MAX_DURATION") {
            Some(raw) => match parse_number::<u32>("MAX_DURATION", &raw)? {
                0 => None,
                limit => Some(limit),
            },
            None => Some(DEFAULT_MAX_DURATION_SECONDS),
        };

        let conversation_timeout = match get("CONVERSATION_TIMEOUT") {
            Some(raw) => Duration::from_secs(parse_number("CONVERSATION_TIMEOUT", &raw)?),
            None => Duration::from_secs(DEFAULT_CONVERSATION_TIMEOUT_SECONDS),
        };

        let audio_bitrate_kbps = match get("AUDIO_BITRATE") {
            Some(raw) => parse_number("AUDIO_BITRATE", &raw)?,
            None => DEFAULT_AUDIO_BITRATE_KBPS,
        };

        let welcome_image = match get("WELCOME_IMAGE_URL") {
            Some(raw) if raw.eq_ignore_ascii_case("none") => None,
            Some(raw) => Some(parse_url(&raw)?),
            None => Some(parse_url(DEFAULT_WELCOME_IMAGE_URL)?),
        };

        Ok(Self {
            bot_token,
            allowed_users,
            max_duration_seconds,
            conversation_timeout,
            progress_interval: PROGRESS_EDIT_INTERVAL,
            work_dir: get("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR)),
            ytdlp_path: get("YTDLP_PATH").unwrap_or_else(|| DEFAULT_YTDLP_PATH.to_string()),
            audio_bitrate_kbps,
            welcome_image,
            creator_name: get("CREATOR_NAME").unwrap_or_else(|| DEFAULT_CREATOR_NAME.to_string()),
            connect_link: get("CONNECT_LINK").unwrap_or_else(|| DEFAULT_CONNECT_LINK.to_string()),
        })
    }
}

fn parse_user_list(raw: &str) -> BotResult<HashSet<UserId>> {
    raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<u64>().map(UserId).map_err(|_| {
                BotError::config_error(format!("ALLOWED_USERS contains an invalid id: {}", token))
            })
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> BotResult<T> {
    raw.parse()
        .map_err(|_| BotError::config_error(format!("{} must be a non-negative number, got {}", key, raw)))
}

fn parse_url(raw: &str) -> BotResult<Url> {
    Url::parse(raw).map_err(|e| BotError::config_error(format!("invalid url {}: {}", raw, e)))
}
