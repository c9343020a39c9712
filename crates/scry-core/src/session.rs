//! Session persistence: save and reload a dataset's conversations
//!
//! One JSONL file per dataset under the platform data dir: a metadata
//! line, then one line per conversation. Streaming state is never
//! persisted — a buffer is not a Message until finalized.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use crate::conversation::Conversation;
use crate::store::ConversationStore;

/// Session entry types for the JSONL format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEntry {
    /// Session metadata
    Metadata { dataset_id: String, saved_at: i64 },
    /// One persisted conversation
    Conversation { conversation: Conversation },
}

/// Manager for persisting a dataset session's conversations
pub struct SessionManager {
    dir: PathBuf,
}

impl SessionManager {
    /// Default sessions directory
    pub fn sessions_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scry")
            .join("sessions")
    }

    pub fn new() -> Self {
        Self {
            dir: Self::sessions_dir(),
        }
    }

    /// Use a specific directory instead of the platform default
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, dataset_id: &str) -> PathBuf {
        // Dataset ids come from user uploads; keep filenames tame.
        let safe: String = dataset_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        self.dir.join(format!("{}.jsonl", safe))
    }

    /// Write the store's conversations for one dataset, replacing any
    /// previous snapshot of that dataset.
    pub fn save(&self, store: &ConversationStore, dataset_id: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let file = File::create(self.path_for(dataset_id))?;
        let mut writer = BufWriter::new(file);

        let metadata = SessionEntry::Metadata {
            dataset_id: dataset_id.to_string(),
            saved_at: chrono::Utc::now().timestamp_millis(),
        };
        writeln!(writer, "{}", serde_json::to_string(&metadata)?)?;

        for conversation in store
            .conversations()
            .iter()
            .filter(|c| c.dataset_id == dataset_id)
        {
            let entry = SessionEntry::Conversation {
                conversation: conversation.clone(),
            };
            writeln!(writer, "{}", serde_json::to_string(&entry)?)?;
        }
        writer.flush()
    }

    /// Load a dataset's conversations. A dataset that was never saved
    /// yields an empty list rather than an error.
    pub fn load(&self, dataset_id: &str) -> std::io::Result<Vec<Conversation>> {
        let path = self.path_for(dataset_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);

        let mut conversations = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionEntry>(&line) {
                Ok(SessionEntry::Conversation { conversation }) => {
                    conversations.push(conversation)
                }
                Ok(SessionEntry::Metadata { .. }) => {}
                Err(e) => tracing::debug!("skipping malformed session line: {}", e),
            }
        }
        Ok(conversations)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
