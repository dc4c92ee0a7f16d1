// Persists extracted events as pretty-printed UTF-8 JSON.
//
// Reads and writes hold an advisory lock on a sibling `.lock` file. Writes
// go through a temp file plus rename.
use crate::client::RawRecord;
use crate::context::AppContext;
use crate::model::EventRecord;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs;
use std::path::{Path, PathBuf};

pub struct LocalStorage;

impl LocalStorage {
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` while holding an exclusive lock for `file_path`.
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {:?}", lock_path))?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    pub fn save_events(path: &Path, events: &[EventRecord]) -> Result<()> {
        Self::with_lock(path, || {
            let json = serde_json::to_string_pretty(events)?;
            Self::atomic_write(path, json)
                .with_context(|| format!("Failed to write {:?}", path))
        })
    }

    /// Loads validated records. A missing file is an empty list.
    pub fn load_events(path: &Path) -> Result<Vec<EventRecord>> {
        Self::read_json(path)
    }

    /// Loads records without assuming the canonical field names, for files
    /// written by other tools or edited by hand.
    pub fn load_raw(path: &Path) -> Result<Vec<RawRecord>> {
        Self::read_json(path)
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(vec![]);
        }
        Self::with_lock(path, || {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            if json.trim().is_empty() {
                return Ok(vec![]);
            }
            serde_json::from_str(&json).with_context(|| format!("Failed to parse {:?}", path))
        })
    }

    pub fn save_local_events(ctx: &dyn AppContext, events: &[EventRecord]) -> Result<PathBuf> {
        let path = ctx.get_local_events_path()?;
        Self::save_events(&path, events)?;
        Ok(path)
    }

    pub fn save_remote_events(ctx: &dyn AppContext, events: &[EventRecord]) -> Result<PathBuf> {
        let path = ctx.get_remote_events_path()?;
        Self::save_events(&path, events)?;
        Ok(path)
    }
}
