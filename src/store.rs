use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::config::ResolverConfig;
use crate::error::ResolverError;

#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, ResolverError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("taxon-resolver"))
                    .ok()
            })
            .ok_or_else(|| {
                ResolverError::Filesystem("unable to resolve cache directory".to_string())
            })?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolverError> {
        match &config.data_dir {
            Some(dir) => Ok(Self::new_with_root(dir.clone())),
            None => Self::new(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn checklist_dir(&self) -> Utf8PathBuf {
        self.root.join("checklist")
    }

    pub fn checklist_path(&self, file_name: &str) -> Utf8PathBuf {
        self.checklist_dir().join(file_name)
    }

    pub fn checklist_metadata_path(&self) -> Utf8PathBuf {
        self.checklist_dir().join("checklist.meta.json")
    }

    pub fn cache_dir(&self) -> Utf8PathBuf {
        self.root.join("cache")
    }

    pub fn diagnostics_dir(&self) -> Utf8PathBuf {
        self.root.join("diagnostics")
    }

    pub fn ensure_dir(path: &Utf8Path) -> Result<(), ResolverError> {
        fs::create_dir_all(path.as_std_path())
            .map_err(|err| ResolverError::Filesystem(err.to_string()))
    }

    pub fn write_metadata(path: &Utf8Path, metadata: &ChecklistMetadata) -> Result<(), ResolverError> {
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }

    pub fn read_metadata(path: &Utf8Path) -> Result<Option<ChecklistMetadata>, ResolverError> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;
        let metadata = serde_json::from_str(&content)
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;
        Ok(Some(metadata))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ResolverError> {
        let parent = path
            .parent()
            .ok_or_else(|| ResolverError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("taxon-resolver")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;
        std::io::Write::write_all(&mut temp, content)
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistMetadata {
    pub source: String,
    pub file_name: String,
    pub downloaded_at: String,
    pub tool: String,
    pub records: usize,
}
