use std::collections::HashSet;

use teloxide::types::UserId;

pub const ACCESS_DENIED_TEXT: &str = "⛔ Sorry, you are not authorized to use this bot.";

/// Allow-list of Telegram users; an absent list lets everybody in
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    allowed: Option<HashSet<UserId>>,
}

impl AccessList {
    pub fn new(allowed: Option<HashSet<UserId>>) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, user: Option<UserId>) -> bool {
        match (&self.allowed, user) {
            (None, _) => true,
            (Some(allowed), Some(user)) => allowed.contains(&user),
            (Some(_), None) => false,
        }
    }
}
