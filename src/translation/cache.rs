/*!
 * Translation caching functionality.
 *
 * One JSON table per (document, backend) maps original text to translated
 * text. The whole table is loaded when the cache is opened and the whole
 * table is rewritten on every mutation, so entries for other keys are never
 * lost on a partial write.
 */

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::errors::CacheError;

/// Suffix of every cache file name
const CACHE_FILE_SUFFIX: &str = "_translations.json";

/// The active table and where it lives
#[derive(Debug)]
struct CacheState {
    /// Directory holding the cache files
    directory: PathBuf,

    /// Document name the table belongs to
    document: String,

    /// Backend the table belongs to
    backend: String,

    /// Original text -> translated text
    entries: BTreeMap<String, String>,
}

impl CacheState {
    fn path(&self) -> PathBuf {
        TranslationCache::cache_file_path(&self.directory, &self.document, &self.backend)
    }
}

/// Persistent translation cache for one document.
///
/// Clones share the same table.
#[derive(Debug, Clone)]
pub struct TranslationCache {
    /// Active table
    state: Arc<RwLock<CacheState>>,

    /// Cache hit counter
    hits: Arc<RwLock<usize>>,

    /// Cache miss counter
    misses: Arc<RwLock<usize>>,
}

impl TranslationCache {
    /// Open the table for `document_name` and `backend_id` stored under `directory`.
    ///
    /// A missing, unreadable or corrupt file yields an empty table.
    pub fn open(directory: impl Into<PathBuf>, document_name: &str, backend_id: &str) -> Self {
        let directory = directory.into();
        let path = Self::cache_file_path(&directory, document_name, backend_id);
        let entries = load_table(&path);

        Self {
            state: Arc::new(RwLock::new(CacheState {
                directory,
                document: document_name.to_string(),
                backend: backend_id.to_string(),
                entries,
            })),
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
        }
    }

    /// Path of the table for a document and backend
    pub fn cache_file_path(directory: &Path, document_name: &str, backend_id: &str) -> PathBuf {
        let stem = Path::new(document_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| document_name.to_string());
        directory.join(format!("{}_{}{}", stem, sanitize(backend_id), CACHE_FILE_SUFFIX))
    }

    /// Default cache directory under the platform data dir
    pub fn default_cache_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("yaetwai")
            .join("cache")
    }

    /// Get a translation from the cache
    pub fn get(&self, original: &str) -> Option<String> {
        let key = original.trim();
        let state = self.state.read();

        match state.entries.get(key) {
            Some(translation) => {
                *self.hits.write() += 1;
                debug!("Cache hit for '{}'", truncate_text(key, 30));
                Some(translation.clone())
            },
            None => {
                *self.misses.write() += 1;
                debug!("Cache miss for '{}'", truncate_text(key, 30));
                None
            }
        }
    }

    /// Store a translation and save the table.
    ///
    /// On a save failure the entry stays in memory and is written by the
    /// next successful save.
    pub fn put(&self, original: &str, translated: &str) -> Result<(), CacheError> {
        let key = original.trim();
        if key.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write();
        state.entries.insert(key.to_string(), translated.to_string());
        debug!("Cached translation for '{}'", truncate_text(key, 30));
        save_table(&state)
    }

    /// Remove a translation. Returns whether it was present.
    pub fn remove(&self, original: &str) -> Result<bool, CacheError> {
        let key = original.trim();
        let mut state = self.state.write();
        if state.entries.remove(key).is_none() {
            return Ok(false);
        }
        save_table(&state)?;
        Ok(true)
    }

    /// Remove several translations with a single save. Returns how many were present.
    pub fn remove_many<'a, I>(&self, originals: I) -> Result<usize, CacheError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut state = self.state.write();
        let removed = originals
            .into_iter()
            .filter(|original| state.entries.remove(original.trim()).is_some())
            .count();
        if removed > 0 {
            save_table(&state)?;
        }
        Ok(removed)
    }

    /// Make the table of `backend_id` the active one.
    ///
    /// The previous table is left as it is on disk.
    pub fn switch_backend(&self, backend_id: &str) {
        let mut state = self.state.write();
        if state.backend == backend_id {
            return;
        }

        state.backend = backend_id.to_string();
        let path = state.path();
        state.entries = load_table(&path);
        debug!("Switched translation cache to {:?} ({} entries)", path, state.entries.len());
    }

    /// Backend of the active table
    pub fn backend_id(&self) -> String {
        self.state.read().backend.clone()
    }

    /// File of the active table
    pub fn path(&self) -> PathBuf {
        self.state.read().path()
    }

    /// Get cache statistics: hits, misses and hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Empty the active table and save it
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut state = self.state.write();
        state.entries.clear();
        *self.hits.write() = 0;
        *self.misses.write() = 0;

        debug!("Translation cache cleared");
        save_table(&state)
    }

    /// Get the number of entries in the active table
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Check if the active table is empty
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }
}

fn load_table(path: &Path) -> BTreeMap<String, String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!("Failed to read translation cache {:?}, starting empty: {}", path, e);
            return BTreeMap::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Translation cache {:?} is corrupt, starting empty: {}", path, e);
            BTreeMap::new()
        }
    }
}

fn save_table(state: &CacheState) -> Result<(), CacheError> {
    let path = state.path();
    let json = serde_json::to_string_pretty(&state.entries)?;

    let io_error = |source| CacheError::Save {
        path: path.clone(),
        source,
    };
    fs::create_dir_all(&state.directory).map_err(io_error)?;
    let mut temp = tempfile::NamedTempFile::new_in(&state.directory).map_err(io_error)?;
    temp.write_all(json.as_bytes()).map_err(io_error)?;
    temp.persist(&path).map_err(|e| io_error(e.error))?;
    Ok(())
}

/// Keep backend ids usable as part of a file name
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

/// Truncate text to a maximum number of characters with ellipsis
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_length).collect::<String>())
    }
}
