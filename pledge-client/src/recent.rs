//! Recent campaign searches, kept across sessions.
//!
//! The list lives in whatever `SearchStorage` the caller hands over; nothing
//! here is global. It is read once when loaded and written through on every
//! change.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Context;

pub const CAPACITY: usize = 5;

pub trait SearchStorage {
    /// `Ok(None)` if nothing was ever saved
    fn load(&self) -> anyhow::Result<Option<Vec<String>>>;
    fn save(&mut self, entries: &[String]) -> anyhow::Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(pub Option<Vec<String>>);

impl SearchStorage for MemoryStorage {
    fn load(&self) -> anyhow::Result<Option<Vec<String>>> {
        Ok(self.0.clone())
    }

    fn save(&mut self, entries: &[String]) -> anyhow::Result<()> {
        self.0 = Some(entries.to_vec());
        Ok(())
    }
}

/// Stores the list as a JSON array in a file
#[derive(Clone, Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> JsonFileStorage {
        JsonFileStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SearchStorage for JsonFileStorage {
    fn load(&self) -> anyhow::Result<Option<Vec<String>>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        let entries = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(entries))
    }

    fn save(&mut self, entries: &[String]) -> anyhow::Result<()> {
        let data = serde_json::to_vec(entries).context("serializing recent searches")?;
        fs::write(&self.path, data).with_context(|| format!("writing {}", self.path.display()))
    }
}

#[derive(Debug)]
pub struct RecentSearches<S> {
    storage: S,
    entries: Vec<String>,
}

impl<S: SearchStorage> RecentSearches<S> {
    /// Unreadable storage is treated as empty: losing history is better than
    /// refusing to search
    pub fn load(storage: S) -> RecentSearches<S> {
        let mut entries = match storage.load() {
            Ok(entries) => entries.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(?err, "failed loading recent searches, starting afresh");
                Vec::new()
            }
        };
        entries.truncate(CAPACITY);
        RecentSearches { storage, entries }
    }

    /// Most recent first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Moves `query` to the front of the list. Blank queries are ignored.
    pub fn record(&mut self, query: &str) -> anyhow::Result<()> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        self.entries.retain(|e| e != query);
        self.entries.insert(0, String::from(query));
        self.entries.truncate(CAPACITY);
        self.storage.save(&self.entries)
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        self.storage.save(&self.entries)
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}
