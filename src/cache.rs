//! Memoized workbook loading.
//!
//! A workbook is immutable once read, so loads are shared as `Arc<Workbook>` and keyed by what
//! identifies their content: a file's canonical path together with its modification time and
//! size, or the SHA-256 of uploaded bytes. A file changed on disk gets a new key and is reloaded.
use crate::error::MetricSheetError;
use crate::spreadsheet::Criteria;
use crate::workbook::Workbook;
use sha2::Digest;
use sha2::Sha256;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    File {
        path: PathBuf,
        modified: Option<SystemTime>,
        len: u64,
    },
    Content {
        sha256: String,
    },
}

impl CacheKey {
    /// Stats the file; fails when it does not exist.
    pub fn for_file<P: AsRef<Path>>(path: P) -> Result<Self, MetricSheetError> {
        let path = fs::canonicalize(path)?;
        let metadata = fs::metadata(&path)?;
        Ok(CacheKey::File {
            path,
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }

    pub fn for_content(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        CacheKey::Content {
            sha256: hex::encode(hasher.finalize()),
        }
    }

    fn is_file(&self, file: &Path) -> bool {
        matches!(self, CacheKey::File { path, .. } if path == file)
    }
}

/// Loaded workbooks by content key, all read with the same criteria.
#[derive(Debug)]
pub struct WorkbookCache {
    criteria: Criteria,
    entries: HashMap<CacheKey, Arc<Workbook>>,
}

impl WorkbookCache {
    pub fn new(criteria: Criteria) -> Self {
        WorkbookCache {
            criteria,
            entries: HashMap::new(),
        }
    }

    /// Returns the cached workbook for `path`, loading it on first use or after the file changed.
    /// Stale entries of the same path are dropped on reload.
    pub fn get_or_open<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<Workbook>, MetricSheetError> {
        let key = CacheKey::for_file(&path)?;
        if let Some(workbook) = self.entries.get(&key) {
            debug!(path = %path.as_ref().display(), "workbook cache hit");
            return Ok(Arc::clone(workbook));
        }
        if let CacheKey::File { path: canonical, .. } = &key {
            self.entries.retain(|cached, _| !cached.is_file(canonical));
        }
        debug!(path = %path.as_ref().display(), "workbook cache miss");
        let workbook = Arc::new(Workbook::open(&path, &self.criteria)?);
        self.entries.insert(key, Arc::clone(&workbook));
        Ok(workbook)
    }

    /// Returns the cached workbook for uploaded content. `name` is only used when the content
    /// is loaded: the same bytes under another name hit the cache.
    pub fn get_or_load_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<Arc<Workbook>, MetricSheetError> {
        let key = CacheKey::for_content(bytes);
        if let Some(workbook) = self.entries.get(&key) {
            debug!(name, "workbook cache hit");
            return Ok(Arc::clone(workbook));
        }
        debug!(name, "workbook cache miss");
        let workbook = Arc::new(Workbook::from_bytes(name, bytes.to_vec(), &self.criteria)?);
        self.entries.insert(key, Arc::clone(&workbook));
        Ok(workbook)
    }

    /// Drops every entry loaded from `path`. Returns whether anything was removed.
    pub fn invalidate<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = fs::canonicalize(&path).unwrap_or_else(|_| path.as_ref().to_path_buf());
        let before = self.entries.len();
        self.entries.retain(|cached, _| !cached.is_file(&path));
        before != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for WorkbookCache {
    fn default() -> Self {
        WorkbookCache::new(Criteria::default())
    }
}
