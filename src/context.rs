// File: ./src/context.rs
//! Where quizscout keeps its files.
//!
//! Everything that touches the filesystem takes a `&dyn AppContext`, so a
//! run can be pointed at the platform directories, at an explicit
//! `--root`, or at a throwaway directory in tests.

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "config.toml";
pub const LOCAL_EVENTS_FILENAME: &str = "local_events.json";
pub const REMOTE_EVENTS_FILENAME: &str = "remote_events.json";

pub trait AppContext: Send + Sync + std::fmt::Debug {
    /// Directory for saved events. Created on demand.
    fn get_data_dir(&self) -> Result<PathBuf>;
    /// Directory holding `config.toml`. Created on demand.
    fn get_config_dir(&self) -> Result<PathBuf>;

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.get_config_dir()?.join(CONFIG_FILENAME))
    }

    /// Events found by the local extractor in the last run.
    fn get_local_events_path(&self) -> Result<PathBuf> {
        Ok(self.get_data_dir()?.join(LOCAL_EVENTS_FILENAME))
    }

    /// Events returned by the remote extractor in the last run.
    fn get_remote_events_path(&self) -> Result<PathBuf> {
        Ok(self.get_data_dir()?.join(REMOTE_EVENTS_FILENAME))
    }
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create directory: {:?}", path))?;
    Ok(path)
}

#[derive(Debug, Clone, Copy)]
enum DirKind {
    Data,
    Config,
}

impl DirKind {
    fn subdir(self) -> &'static str {
        match self {
            DirKind::Data => "data",
            DirKind::Config => "config",
        }
    }

    fn platform(self, dirs: &ProjectDirs) -> &Path {
        match self {
            DirKind::Data => dirs.data_dir(),
            DirKind::Config => dirs.config_dir(),
        }
    }
}

/// Platform directories (`directories::ProjectDirs`), or `data/` and
/// `config/` under an explicit root.
#[derive(Clone, Debug, Default)]
pub struct StandardContext {
    override_root: Option<PathBuf>,
}

impl StandardContext {
    pub fn new(override_root: Option<PathBuf>) -> Self {
        Self { override_root }
    }

    fn resolve(&self, kind: DirKind) -> Result<PathBuf> {
        let dir = match &self.override_root {
            Some(root) => root.join(kind.subdir()),
            None => {
                let proj = ProjectDirs::from("com", "quizscout", "quizscout")
                    .ok_or_else(|| anyhow!("No home directory"))?;
                kind.platform(&proj).to_path_buf()
            }
        };
        ensure_dir(dir)
    }
}

impl AppContext for StandardContext {
    fn get_data_dir(&self) -> Result<PathBuf> {
        self.resolve(DirKind::Data)
    }

    fn get_config_dir(&self) -> Result<PathBuf> {
        self.resolve(DirKind::Config)
    }
}

/// A unique directory under the system temp dir, removed on drop.
#[derive(Debug)]
pub struct TestContext {
    pub root: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!("quizscout_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&root).expect("failed to create TestContext temp dir");
        Self { root }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn get_data_dir(&self) -> Result<PathBuf> {
        ensure_dir(self.root.join(DirKind::Data.subdir()))
    }

    fn get_config_dir(&self) -> Result<PathBuf> {
        ensure_dir(self.root.join(DirKind::Config.subdir()))
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
