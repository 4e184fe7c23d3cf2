//! Save/load of user progress through an injected key-value store.
//!
//! Progress is a `{node id: status}` map serialized with bincode under a
//! single fixed key. The store itself is a seam: tests and the harness
//! use [`MemoryStore`], native hosts can use [`FileStore`], and anything
//! else (browser storage, a database row) implements [`ProgressStore`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use crate::constants::progress::SAVE_VERSION;
use crate::status::SkillStatus;

/// Minimal key-value storage the engine persists through.
pub trait ProgressStore {
    /// Bytes stored under `key`, or `None` if nothing was saved.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ProgressError>;
    /// Replace the bytes stored under `key`.
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), ProgressError>;
}

/// In-process store backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ProgressError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), ProgressError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Store that keeps one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.bin", file))
    }
}

impl ProgressStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ProgressError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), ProgressError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// Serialized form of user progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Save format version.
    pub version: u32,
    /// Status per node id. Ordered so identical progress encodes identically.
    pub statuses: BTreeMap<String, SkillStatus>,
}

impl ProgressSnapshot {
    pub fn new(statuses: BTreeMap<String, SkillStatus>) -> Self {
        Self {
            version: SAVE_VERSION,
            statuses,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProgressError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode bytes written by [`ProgressSnapshot::encode`], rejecting other
    /// format versions.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProgressError> {
        let snapshot: ProgressSnapshot = bincode::deserialize(bytes)?;
        if snapshot.version != SAVE_VERSION {
            return Err(ProgressError::VersionMismatch {
                expected: SAVE_VERSION,
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum ProgressError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
}

impl From<std::io::Error> for ProgressError {
    fn from(e: std::io::Error) -> Self {
        ProgressError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for ProgressError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        ProgressError::Bincode(e)
    }
}

impl std::fmt::Display for ProgressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressError::Io(e) => write!(f, "IO error: {}", e),
            ProgressError::Bincode(e) => write!(f, "Serialization error: {}", e),
            ProgressError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Progress version mismatch: expected {}, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for ProgressError {}
