//! Conversation history persisted as one JSON file per conversation
//!
//! The core pipeline neither reads nor depends on this; the query
//! endpoint appends turns when asked to.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::types::StructuredAnswer;

/// A single turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// The user's query
    pub query: String,
    /// The answer that was returned
    pub answer: StructuredAnswer,
    /// When the turn happened
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// A stored conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation ID
    pub id: Uuid,
    /// Turns in order
    pub turns: Vec<ConversationTurn>,
    /// Creation timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last update timestamp
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Summary of a conversation for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation ID
    pub id: Uuid,
    /// Creation timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last update timestamp
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Number of turns
    pub turn_count: usize,
    /// The most recent query, empty for a fresh conversation
    pub last_query: String,
}

/// Filesystem-backed conversation store
pub struct HistoryStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on conversation files
    write_lock: Mutex<()>,
}

impl HistoryStore {
    /// Create a new history store
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn conversation_path(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Create a new empty conversation
    pub fn create(&self) -> Result<Conversation> {
        let now = chrono::Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.save(&conversation)?;
        Ok(conversation)
    }

    /// Append a turn, creating the conversation if it does not exist
    pub fn add_turn(&self, id: &Uuid, query: &str, answer: &StructuredAnswer) -> Result<()> {
        let _guard = self.write_lock.lock();
        let now = chrono::Utc::now();

        let mut conversation = self.read(id)?.unwrap_or(Conversation {
            id: *id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        });

        conversation.turns.push(ConversationTurn {
            query: query.to_string(),
            answer: answer.clone(),
            timestamp: now,
        });
        conversation.updated_at = now;

        self.save(&conversation)
    }

    /// Get a conversation by ID
    pub fn get(&self, id: &Uuid) -> Result<Option<Conversation>> {
        self.read(id)
    }

    /// List recent conversations, newest first
    pub fn list(&self, limit: usize) -> Result<Vec<ConversationSummary>> {
        let mut summaries = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Skipping conversation {}: {}", path.display(), e);
                    continue;
                }
            };
            let conversation: Conversation = match serde_json::from_str(&raw) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("Skipping malformed conversation {}: {}", path.display(), e);
                    continue;
                }
            };
            summaries.push(ConversationSummary {
                id: conversation.id,
                created_at: conversation.created_at,
                updated_at: conversation.updated_at,
                turn_count: conversation.turns.len(),
                last_query: conversation
                    .turns
                    .last()
                    .map(|t| t.query.clone())
                    .unwrap_or_default(),
            });
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries.truncate(limit);
        Ok(summaries)
    }

    /// Delete a conversation. Returns whether it existed.
    pub fn delete(&self, id: &Uuid) -> Result<bool> {
        let path = self.conversation_path(id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        Ok(true)
    }

    fn read(&self, id: &Uuid) -> Result<Option<Conversation>> {
        let path = self.conversation_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, conversation: &Conversation) -> Result<()> {
        let raw = serde_json::to_string_pretty(conversation)?;
        std::fs::write(self.conversation_path(&conversation.id), raw)?;
        Ok(())
    }
}
