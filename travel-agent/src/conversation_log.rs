/// Conversation log storage
/// Every user message and agent reply is appended here, best effort.
/// `HttpConversationLog` posts to a REST store; `InMemoryConversationLog`
/// keeps entries for the lifetime of the process

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{check_status, CollaboratorError};
use crate::sentiment::Sentiment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One logged message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    pub user_id: String,
    pub role: Role,
    pub message: String,
    pub sentiment: Option<Sentiment>,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(user_id: &str, role: Role, message: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            role,
            message: message.to_string(),
            sentiment: None,
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_sentiment(mut self, sentiment: Option<Sentiment>) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[async_trait]
pub trait ConversationLog: Send + Sync {
    async fn append(&self, entry: LogEntry) -> Result<(), CollaboratorError>;

    /// Last `limit` entries for `user_id`, oldest first
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<LogEntry>, CollaboratorError>;
}

/// Entries kept per user by the in-memory log.
pub const DEFAULT_HISTORY_PER_USER: usize = 200;

/// Users kept by the in-memory log before the least recently active is dropped.
pub const DEFAULT_MAX_USERS: usize = 10_000;

/// In-memory conversation log, bounded per user and in number of users
pub struct InMemoryConversationLog {
    entries: Arc<RwLock<HashMap<String, VecDeque<LogEntry>>>>, // user_id -> entries
    per_user: usize,
    max_users: usize,
}

impl InMemoryConversationLog {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_HISTORY_PER_USER, DEFAULT_MAX_USERS)
    }

    pub fn with_limits(per_user: usize, max_users: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            per_user: per_user.max(1),
            max_users: max_users.max(1),
        }
    }
}

impl Default for InMemoryConversationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryConversationLog {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            per_user: self.per_user,
            max_users: self.max_users,
        }
    }
}

#[async_trait]
impl ConversationLog for InMemoryConversationLog {
    async fn append(&self, entry: LogEntry) -> Result<(), CollaboratorError> {
        let mut db = self.entries.write().await;

        if !db.contains_key(&entry.user_id) && db.len() >= self.max_users {
            let quietest = db
                .iter()
                .min_by_key(|(_, history)| history.back().map(|e| e.timestamp))
                .map(|(user_id, _)| user_id.clone());
            if let Some(user_id) = quietest {
                db.remove(&user_id);
                tracing::debug!("Conversation log full, dropped history of {}", user_id);
            }
        }

        let history = db.entry(entry.user_id.clone()).or_default();
        history.push_back(entry);
        while history.len() > self.per_user {
            history.pop_front();
        }
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<LogEntry>, CollaboratorError> {
        let db = self.entries.read().await;
        let mut entries: Vec<LogEntry> = db
            .get(user_id)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default();

        // Chronological order; entries appended in the same instant keep insertion order
        entries.sort_by_key(|e| e.timestamp);
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }
}

/// Posts entries as JSON to a REST conversation store
pub struct HttpConversationLog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConversationLog {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ConversationLog for HttpConversationLog {
    async fn append(&self, entry: LogEntry) -> Result<(), CollaboratorError> {
        let response = self.client.post(&self.base_url).json(&entry).send().await?;
        check_status("conversation log", response).await?;
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<LogEntry>, CollaboratorError> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("userId", user_id), ("limit", limit.as_str())])
            .send()
            .await?;

        let mut entries: Vec<LogEntry> = check_status("conversation log", response)
            .await?
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode {
                service: "conversation log",
                message: e.to_string(),
            })?;
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}
