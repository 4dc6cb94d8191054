//! Flat JSON file backend.
//!
//! A data folder holds four files:
//!
//! | File | Content |
//! |---|---|
//! | `database` | array of [`PackageRecord`] |
//! | `stable` | object, atom -> stable vote count |
//! | `unstable` | object, atom -> unstable vote count |
//! | `priority` | array of [`PriorityRecord`] |
//!
//! Each file is written to a temporary sibling, synced, then renamed over
//! the old one, so a crash mid-save leaves either the old or the new file.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::snapshot::{PackageRecord, PriorityRecord, Snapshot};
use crate::traits::GraphStore;

const DATABASE: &str = "database";
const STABLE: &str = "stable";
const UNSTABLE: &str = "unstable";
const PRIORITY: &str = "priority";

/// Folder-of-JSON-files implementation of [`GraphStore`].
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Uses `dir` as the data folder. It is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    /// The data folder.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads one file; `None` if it is missing, blank, or the JSON `null`
    /// that older deployments wrote for empty maps and lists.
    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        let path = self.dir.join(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(serde_json::from_slice::<Option<T>>(&bytes)?)
    }

    /// Atomically replaces one file.
    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, value)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.dir.join(name)).map_err(|e| e.error)?;
        Ok(())
    }
}

impl GraphStore for JsonFileStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        let Some(packages) = self.read::<Vec<PackageRecord>>(DATABASE)? else {
            return Ok(None);
        };
        Ok(Some(Snapshot {
            packages,
            stable: self.read::<BTreeMap<String, u32>>(STABLE)?.unwrap_or_default(),
            unstable: self.read::<BTreeMap<String, u32>>(UNSTABLE)?.unwrap_or_default(),
            priority: self.read::<Vec<PriorityRecord>>(PRIORITY)?.unwrap_or_default(),
        }))
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        self.write(DATABASE, &snapshot.packages)?;
        self.write(STABLE, &snapshot.stable)?;
        self.write(UNSTABLE, &snapshot.unstable)?;
        self.write(PRIORITY, &snapshot.priority)?;
        Ok(())
    }
}
