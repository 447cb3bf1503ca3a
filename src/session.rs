use std::{collections::HashMap, time::Duration};

use teloxide::types::{ChatId, MessageId, UserId};
use tokio::{sync::Mutex, time::Instant};

/// Conversation identity: one session per user per chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

impl SessionKey {
    pub fn new(chat_id: ChatId, user_id: UserId) -> Self {
        Self { chat_id, user_id }
    }
}

/// `Idle` is never stored; it is what an absent session means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingRenameChoice,
    AwaitingNewName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub state: ConversationState,
    pub pending_url: Option<String>,
    pub filename_choice: Option<String>,
    /// Menu that belongs to this session, buttons on any other menu are stale
    pub menu_message: Option<MessageId>,
    pub last_activity: Instant,
}

impl Session {
    pub fn awaiting_choice(url: impl Into<String>, menu_message: MessageId) -> Self {
        Self {
            state: ConversationState::AwaitingRenameChoice,
            pending_url: Some(url.into()),
            filename_choice: None,
            menu_message: Some(menu_message),
            last_activity: Instant::now(),
        }
    }

    fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.duration_since(self.last_activity) >= timeout
    }
}

/// In-memory sessions with inactivity expiry.
///
/// Expiry is applied lazily by every accessor and eagerly by
/// [`SessionStore::purge_expired`].
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionKey, Session>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Live session for `key`, dropping it first if it has expired
    pub async fn get(&self, key: SessionKey) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        self.live_entry(&mut sessions, key).cloned()
    }

    pub async fn state(&self, key: SessionKey) -> ConversationState {
        self.get(key)
            .await
            .map(|session| session.state)
            .unwrap_or_default()
    }

    /// Stores `session`, replacing whatever the key held
    pub async fn insert(&self, key: SessionKey, session: Session) {
        let mut sessions = self.sessions.lock().await;
        if sessions.insert(key, session).is_some() {
            log::debug!("Replaced pending session for {:?}", key);
        }
    }

    /// Applies `update` to a live session and refreshes its activity instant.
    /// Returns `false` when there is no live session.
    pub async fn update<F>(&self, key: SessionKey, update: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.lock().await;
        match self.live_entry(&mut sessions, key) {
            Some(session) => {
                update(session);
                session.last_activity = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Removes and returns the live session, if any
    pub async fn take(&self, key: SessionKey) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        self.live_entry(&mut sessions, key)?;
        sessions.remove(&key)
    }

    /// Removes the session whether or not it has expired
    pub async fn remove(&self, key: SessionKey) -> Option<Session> {
        self.sessions.lock().await.remove(&key)
    }

    /// Drops every expired session and returns them
    pub async fn purge_expired(&self) -> Vec<(SessionKey, Session)> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<SessionKey> = sessions
            .iter()
            .filter(|(_, session)| session.is_expired(now, self.timeout))
            .map(|(key, _)| *key)
            .collect();

        expired
            .into_iter()
            .filter_map(|key| sessions.remove(&key).map(|session| (key, session)))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn live_entry<'a>(
        &self,
        sessions: &'a mut HashMap<SessionKey, Session>,
        key: SessionKey,
    ) -> Option<&'a mut Session> {
        let expired = sessions
            .get(&key)
            .is_some_and(|session| session.is_expired(Instant::now(), self.timeout));
        if expired {
            log::debug!("Session for {:?} timed out", key);
            sessions.remove(&key);
            return None;
        }
        sessions.get_mut(&key)
    }
}
