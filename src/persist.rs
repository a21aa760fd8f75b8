use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::state::{CachedState, CanonicalMatch, CanonicalSeries};

pub const CACHE_KEY: &str = "cricscanner_data";
const CACHE_DIR: &str = "cricscanner";
const CACHE_VERSION: u32 = 1;

/// Key/value storage for serialized cache blobs.
pub trait CacheStore: Send {
    fn read(&self, key: &str) -> Result<Option<String>, SyncError>;
    fn write(&mut self, key: &str, serialized: &str) -> Result<(), SyncError>;
}

/// One JSON file per key, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$CRICSCANNER_CACHE_DIR`, else `$XDG_CACHE_HOME/cricscanner`, else
    /// `~/.cache/cricscanner`.
    pub fn default_location(override_dir: Option<&Path>) -> Option<Self> {
        if let Some(dir) = override_dir {
            return Some(Self::new(dir));
        }
        cache_dir().map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CacheStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, SyncError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SyncError::Persistence(format!("read {key}: {err}"))),
        }
    }

    fn write(&mut self, key: &str, serialized: &str) -> Result<(), SyncError> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            SyncError::Persistence(format!("create {}: {err}", self.dir.display()))
        })?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serialized)
            .map_err(|err| SyncError::Persistence(format!("write {key}: {err}")))?;
        fs::rename(&tmp, &path)
            .map_err(|err| SyncError::Persistence(format!("swap {key}: {err}")))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, serialized: impl Into<String>) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), serialized.into());
        store
    }
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, SyncError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, serialized: &str) -> Result<(), SyncError> {
        self.entries.insert(key.to_string(), serialized.to_string());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    tournaments: Vec<CanonicalSeries>,
    #[serde(default)]
    matches: Vec<CanonicalMatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dismissed: Vec<String>,
}

pub fn encode_state(state: &CachedState) -> Result<String, SyncError> {
    let file = CacheFile {
        version: CACHE_VERSION,
        tournaments: state.tournaments.clone(),
        matches: state.matches.clone(),
        dismissed: state.dismissed.clone(),
    };
    serde_json::to_string(&file)
        .map_err(|err| SyncError::Persistence(format!("serialize cache: {err}")))
}

/// `None` for unparseable blobs and blobs written by another cache version.
pub fn decode_state(raw: &str) -> Option<CachedState> {
    let cache = serde_json::from_str::<CacheFile>(raw).ok()?;
    if cache.version != CACHE_VERSION {
        return None;
    }
    Some(CachedState {
        tournaments: cache.tournaments,
        matches: cache.matches,
        dismissed: cache.dismissed,
    })
}

pub fn load_state(store: &dyn CacheStore, key: &str) -> Result<Option<CachedState>, SyncError> {
    Ok(store.read(key)?.as_deref().and_then(decode_state))
}

pub fn save_state(store: &mut dyn CacheStore, key: &str, state: &CachedState) -> Result<(), SyncError> {
    let json = encode_state(state)?;
    store.write(key, &json)
}

fn cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}
