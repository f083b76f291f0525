//! Dataset Cache
//! Read-through memo of load + clean results. Source files are static
//! snapshots, so entries are never invalidated.

use crate::config::SourceConfig;
use crate::data::{DataCleaner, DataLoader, Dataset};
use crate::error::Result;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct DatasetCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<Dataset>>>>>,
    loads: AtomicUsize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cleaned dataset for `source`, loading it on first access.
    ///
    /// The map lock is held only to find the entry; loading runs inside the
    /// entry's cell. A failed load leaves the cell empty.
    pub fn get_or_load(&self, data_dir: &Path, source: &SourceConfig) -> Result<Arc<Dataset>> {
        let key = source.cache_key(data_dir);
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.entry(key).or_default().clone()
        };

        let dataset = cell.get_or_try_init(|| {
            self.loads.fetch_add(1, Ordering::Relaxed);
            let path = source.resolve(data_dir);
            let raw = DataLoader::load(&source.id, &path, source.sheet.as_deref())?;
            DataCleaner::clean(&source.id, raw, source).map(Arc::new)
        })?;
        Ok(Arc::clone(dataset))
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|cell| cell.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times a file was actually read.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}
