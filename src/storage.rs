use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::conversation::{Conversation, ConversationStore};

const CONVERSATIONS_FILE: &str = "conversations.json";
const ACTIVE_INDEX_FILE: &str = "active_index";

/// Durable storage for the conversation store.
///
/// Two files in one directory: the conversation collection as pretty
/// JSON and the active index as plain text. Both are rewritten together
/// after every mutation so a crash at any point leaves a loadable state.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    /// Storage rooted at the platform data directory.
    pub fn new() -> Result<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("could not determine data directory"))?
            .join("gptsim");
        Self::at(dir)
    }

    /// Storage rooted at an explicit directory (config override, tests).
    pub fn at(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Restore the persisted store. Absent or malformed content loads as
    /// the default state instead of failing.
    pub fn load(&self) -> ConversationStore {
        ConversationStore::restore(self.load_conversations(), self.load_active_index())
    }

    fn load_conversations(&self) -> Vec<Conversation> {
        let path = self.conversations_path();
        if !path.exists() {
            return Vec::new();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read conversation history");
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(conversations) => conversations,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "discarding malformed conversation history");
                Vec::new()
            }
        }
    }

    fn load_active_index(&self) -> Option<usize> {
        let content = fs::read_to_string(self.active_index_path()).ok()?;
        content.trim().parse().ok()
    }

    /// Write the collection and the active index as one unit.
    pub fn save(&self, store: &ConversationStore) -> Result<()> {
        let (conversations, active) = store.as_parts();

        let json = serde_json::to_string_pretty(conversations)
            .context("failed to serialize conversations")?;
        let path = self.conversations_path();
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;

        let index = active.map(|i| i.to_string()).unwrap_or_default();
        let path = self.active_index_path();
        fs::write(&path, index).with_context(|| format!("failed to write {}", path.display()))?;

        Ok(())
    }

    fn conversations_path(&self) -> PathBuf {
        self.dir.join(CONVERSATIONS_FILE)
    }

    fn active_index_path(&self) -> PathBuf {
        self.dir.join(ACTIVE_INDEX_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_without_files_gives_default_store() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::at(dir.path()).unwrap();

        let store = storage.load();
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_index(), Some(0));
        assert!(store.active().unwrap().visible_messages().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::at(dir.path()).unwrap();

        let mut store = ConversationStore::new();
        store.push_user("What is psychology?");
        store.push_assistant("The study of the mind.");
        store.start_new();
        store.push_user("And CBT?");
        storage.save(&store).unwrap();

        let loaded = storage.load();
        assert_eq!(loaded.conversations(), store.conversations());
        assert_eq!(loaded.active_index(), Some(1));
    }

    #[test]
    fn test_save_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::at(dir.path()).unwrap();
        storage.save(&ConversationStore::new()).unwrap();

        let index = fs::read_to_string(dir.path().join(ACTIVE_INDEX_FILE)).unwrap();
        assert_eq!(index, "0");

        let json = fs::read_to_string(dir.path().join(CONVERSATIONS_FILE)).unwrap();
        assert!(json.contains("\"role\": \"system\""));
    }

    #[test]
    fn test_malformed_history_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONVERSATIONS_FILE), "{ not json").unwrap();
        let storage = Storage::at(dir.path()).unwrap();

        let store = storage.load();
        assert_eq!(store.len(), 1);
        assert!(store.active().unwrap().visible_messages().is_empty());
    }

    #[test]
    fn test_malformed_index_falls_back_to_first() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::at(dir.path()).unwrap();

        let mut store = ConversationStore::new();
        store.start_new();
        storage.save(&store).unwrap();
        fs::write(dir.path().join(ACTIVE_INDEX_FILE), "banana").unwrap();

        let loaded = storage.load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.active_index(), Some(0));
    }

    #[test]
    fn test_out_of_range_index_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::at(dir.path()).unwrap();

        storage.save(&ConversationStore::new()).unwrap();
        fs::write(dir.path().join(ACTIVE_INDEX_FILE), "42").unwrap();

        assert_eq!(storage.load().active_index(), Some(0));
    }
}
