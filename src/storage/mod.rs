//! Flat-file storage
//!
//! Templates and accounts each live in a small JSON document on disk
//! (`{"templates": [...]}`, `{"accounts": [...]}`). [`JsonFile`] owns the
//! read-modify-write cycle for one such document.

pub mod timestamp;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One JSON document on disk, read and rewritten as a whole
#[derive(Debug)]
pub struct JsonFile {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; a missing or blank file is the default document
    pub fn read<T, E>(&self) -> Result<T, E>
    where
        T: DeserializeOwned + Default,
        E: From<std::io::Error> + From<serde_json::Error>,
    {
        let _guard = self.lock.lock();
        self.load()
    }

    /// Apply `op` to the document and write it back when `changed` says so
    pub fn modify<T, R, E>(
        &self,
        op: impl FnOnce(&mut T) -> Result<R, E>,
        changed: impl Fn(&R) -> bool,
    ) -> Result<R, E>
    where
        T: DeserializeOwned + Serialize + Default,
        E: From<std::io::Error> + From<serde_json::Error>,
    {
        let _guard = self.lock.lock();
        let mut doc = self.load::<T, E>()?;
        let out = op(&mut doc)?;
        if changed(&out) {
            self.persist(&doc)?;
        }
        Ok(out)
    }

    fn load<T, E>(&self) -> Result<T, E>
    where
        T: DeserializeOwned + Default,
        E: From<std::io::Error> + From<serde_json::Error>,
    {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(T::default()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write atomically (temp file, then rename)
    fn persist<T: Serialize>(&self, doc: &T) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(doc).map_err(std::io::Error::other)?;
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)
    }
}
