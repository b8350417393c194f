use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::CacheError;

const FILE_PREFIX: &str = "html_cache_";
const FILE_SUFFIX: &str = ".html";
const KEY_LEN: usize = 10;

/// Fixed-width hex prefix of SHA-256 over the exact URL string.
pub fn cache_key(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    digest[..KEY_LEN].to_string()
}

/// Directory of raw article pages, one file per URL.
///
/// Only [`CacheStore::open`] can fail. Reads, writes and deletes log and carry on.
pub struct CacheStore {
    dir: PathBuf,
}

pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
}

impl CacheStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(CacheStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, cache_key(url), FILE_SUFFIX))
    }

    pub fn get(&self, url: &str) -> Option<String> {
        let path = self.path_for(url);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(html) => {
                debug!("Cache hit for {}", url);
                Some(html)
            }
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn put(&self, url: &str, html: &str) {
        let path = self.path_for(url);
        if let Err(e) = fs::write(&path, html) {
            warn!("Failed to write cache entry {}: {}", path.display(), e);
        }
    }

    /// Remove every entry following the store's naming convention.
    /// Returns how many files were deleted.
    pub fn clear_all(&self) -> usize {
        let entries = self.entries();
        if !entries.is_empty() {
            info!("Clearing cache: {} files", entries.len());
        }

        let mut removed = 0;
        for path in entries {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
            }
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries();
        let bytes = entries
            .iter()
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();
        CacheStats {
            entries: entries.len(),
            bytes,
        }
    }

    fn entries(&self) -> Vec<PathBuf> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) => {
                warn!("Failed to list cache directory {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
            })
            .collect()
    }
}
