use std::fmt;

/// Centralised error type for the bot
#[derive(Debug)]
pub enum BotError {
    /// Probe or download failure reported by the media fetcher
    FetchError(String),
    /// Media is longer than the configured limit
    DurationExceeded { duration: u32, max: u32 },
    /// Filesystem errors
    FileSystemError(std::io::Error),
    /// Telegram API errors
    TelegramError(teloxide::RequestError),
    /// Malformed data from an external tool
    ParseError(String),
    /// Invalid or missing configuration
    ConfigError(String),
    /// External command exited with an error
    ExternalCommandError { command: String, stderr: String },
    /// General error with a description
    General(String),
}

/// Outcome of a failed message edit
#[derive(Debug)]
pub enum EditError {
    /// The new content is identical to the current one
    NotModified,
    Failed(BotError),
}

impl fmt::Display for BotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotError::FetchError(msg) => write!(f, "{}", msg),
            BotError::DurationExceeded { duration, max } => {
                write!(f, "Media is {}s long, the limit is {}s", duration, max)
            }
            BotError::FileSystemError(e) => write!(f, "Filesystem error: {}", e),
            BotError::TelegramError(e) => write!(f, "Telegram API error: {}", e),
            BotError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            BotError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            BotError::ExternalCommandError { command, stderr } => {
                write!(f, "Command {} failed: {}", command, stderr)
            }
            BotError::General(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::NotModified => write!(f, "message is not modified"),
            EditError::Failed(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for BotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BotError::FileSystemError(e) => Some(e),
            BotError::TelegramError(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for EditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EditError::NotModified => None,
            EditError::Failed(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::FileSystemError(err)
    }
}

impl From<teloxide::RequestError> for BotError {
    fn from(err: teloxide::RequestError) -> Self {
        BotError::TelegramError(err)
    }
}

impl From<teloxide::RequestError> for EditError {
    fn from(err: teloxide::RequestError) -> Self {
        match err {
            teloxide::RequestError::Api(teloxide::ApiError::MessageNotModified) => {
                EditError::NotModified
            }
            other => EditError::Failed(other.into()),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::ParseError(format!("JSON parsing error: {}", err))
    }
}

impl From<strum::ParseError> for BotError {
    fn from(err: strum::ParseError) -> Self {
        BotError::ParseError(format!("Enum parsing error: {}", err))
    }
}

impl BotError {
    pub fn fetch_error(msg: impl Into<String>) -> Self {
        Self::FetchError(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn external_command_error(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::ExternalCommandError {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}

/// Result of bot operations
pub type BotResult<T> = Result<T, BotError>;

/// Result for dispatcher endpoints
pub type HandlerResult = BotResult<()>;
