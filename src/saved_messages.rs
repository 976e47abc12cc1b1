//! File-backed `saved_messages` table.
//!
//! Writes take an exclusive lock on the JSON file and rewrite the whole table;
//! reads take a shared lock and never touch the file. Committed changes are
//! published to subscribers through a broadcast channel.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMessage {
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSavedMessage {
    pub content: String,
    pub role: MessageRole,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ChangeEvent {
    Inserted(SavedMessage),
    Deleted { id: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("message content must not be empty")]
pub struct EmptyContent;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    next_seq: u64,
    #[serde(default)]
    messages: Vec<SavedMessage>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: 1,
            next_seq: 0,
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SavedMessageStore {
    path: PathBuf,
    events: broadcast::Sender<ChangeEvent>,
}

impl SavedMessageStore {
    pub fn new(path: PathBuf) -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { path, events }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn compute_id(seq: u64, msg: &NewSavedMessage, created_at: &DateTime<Utc>) -> String {
        let mut h = Sha256::new();
        h.update(seq.to_le_bytes());
        h.update(b"\n");
        h.update(created_at.to_rfc3339().as_bytes());
        h.update(b"\n");
        h.update(msg.role.as_str().as_bytes());
        h.update(b"\n");
        h.update(msg.content.as_bytes());
        hex::encode(&h.finalize()[..16])
    }

    pub fn insert(&self, msg: NewSavedMessage) -> Result<SavedMessage> {
        if msg.content.trim().is_empty() {
            return Err(EmptyContent.into());
        }
        let created_at = msg.created_at.unwrap_or_else(Utc::now);

        let saved = self.mutate(|sf| {
            let id = Self::compute_id(sf.next_seq, &msg, &created_at);
            sf.next_seq += 1;
            let saved = SavedMessage {
                id,
                content: msg.content.clone(),
                role: msg.role,
                created_at,
            };
            sf.messages.push(saved.clone());
            Ok(saved)
        })?;

        // No receivers is fine.
        let _ = self.events.send(ChangeEvent::Inserted(saved.clone()));
        Ok(saved)
    }

    /// All messages ordered by `created_at`. Ties keep insertion order.
    pub fn query(&self, direction: SortDirection) -> Result<Vec<SavedMessage>> {
        let mut messages = self.snapshot()?.messages;
        match direction {
            SortDirection::Asc => messages.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortDirection::Desc => messages.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        Ok(messages)
    }

    /// Returns false when no message has this id.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.mutate(|sf| {
            let before = sf.messages.len();
            sf.messages.retain(|m| m.id != id);
            Ok(sf.messages.len() != before)
        })?;
        if removed {
            let _ = self.events.send(ChangeEvent::Deleted { id: id.to_string() });
        }
        Ok(removed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Current table under a shared lock. A missing file reads as empty.
    fn snapshot(&self) -> Result<StoreFile> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreFile::default())
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to open message store: {}", self.path.display())
                })
            }
        };
        file.lock_shared()
            .with_context(|| format!("failed to lock message store: {}", self.path.display()))?;
        let table = read_table(&mut file);
        file.unlock().ok();
        table
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut StoreFile) -> Result<T>) -> Result<T> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store dir: {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("failed to open message store: {}", self.path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("failed to lock message store: {}", self.path.display()))?;

        let result = read_table(&mut file).and_then(|mut table| {
            let out = f(&mut table)?;
            write_table(&mut file, &table)?;
            Ok(out)
        });
        file.unlock().ok();
        result
    }
}

fn read_table(file: &mut File) -> Result<StoreFile> {
    let mut raw = String::new();
    file.read_to_string(&mut raw)
        .context("failed to read message store")?;
    if raw.trim().is_empty() {
        return Ok(StoreFile::default());
    }
    serde_json::from_str(&raw).context("failed to parse message store JSON")
}

fn write_table(file: &mut File, table: &StoreFile) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(table).context("failed to serialize message store")?;
    bytes.push(b'\n');
    file.set_len(0)
        .context("failed to truncate message store")?;
    file.seek(SeekFrom::Start(0))
        .context("failed to seek before write")?;
    file.write_all(&bytes)
        .context("failed to write message store")?;
    file.flush().context("failed to flush message store")
}
