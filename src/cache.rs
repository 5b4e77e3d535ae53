use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::sync::{Mutex, PoisonError};

use camino::Utf8PathBuf;
use sha2::{Digest, Sha256};

use crate::error::ResolverError;
use crate::store::Store;

/// Address of a cached or diagnostic artifact: `<tag>_<sha256>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey {
    tag: String,
    digest: String,
}

impl ContentKey {
    pub fn for_bytes(tag: &str, content: &[u8]) -> Self {
        Self {
            tag: tag.to_string(),
            digest: format!("{:x}", Sha256::digest(content)),
        }
    }

    /// Key for a set of names; order and duplicates do not matter.
    pub fn for_names(tag: &str, names: &[String]) -> Self {
        let unique: BTreeSet<&str> = names.iter().map(String::as_str).collect();
        let joined = unique.into_iter().collect::<Vec<_>>().join("\n");
        Self::for_bytes(tag, joined.as_bytes())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}.csv", self.tag, self.digest)
    }
}

pub trait ContentStore: Send + Sync {
    fn get(&self, key: &ContentKey) -> Result<Option<Vec<u8>>, ResolverError>;

    fn put(&self, key: &ContentKey, content: &[u8]) -> Result<String, ResolverError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<ContentKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys_tagged(&self, tag: &str) -> Vec<ContentKey> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|key| key.tag == tag)
            .cloned()
            .collect()
    }
}

impl ContentStore for MemoryStore {
    fn get(&self, key: &ContentKey) -> Result<Option<Vec<u8>>, ResolverError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn put(&self, key: &ContentKey, content: &[u8]) -> Result<String, ResolverError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), content.to_vec());
        Ok(format!("memory:{}", key.file_name()))
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: Utf8PathBuf,
}

impl FileStore {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    pub fn path_for(&self, key: &ContentKey) -> Utf8PathBuf {
        self.dir.join(key.file_name())
    }
}

impl ContentStore for FileStore {
    fn get(&self, key: &ContentKey) -> Result<Option<Vec<u8>>, ResolverError> {
        let path = self.path_for(key);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        fs::read(path.as_std_path())
            .map(Some)
            .map_err(|err| ResolverError::Filesystem(err.to_string()))
    }

    fn put(&self, key: &ContentKey, content: &[u8]) -> Result<String, ResolverError> {
        let path = self.path_for(key);
        Store::write_bytes_atomic(&path, content)?;
        Ok(path.to_string())
    }
}
