use std::path::PathBuf;

use tempfile::TempDir;

use crate::storage::storage_manager::StorageManager;

/// Scratch database directory plus a storage manager, shared by tests
/// and benches. Files live in a temp directory that is removed on drop.
pub struct TempStore {
    pub dir: TempDir,
    pub manager: StorageManager,
}

impl TempStore {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            manager: StorageManager::new(),
        }
    }

    pub fn with_pool_frames(frame_count: usize) -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            manager: StorageManager::with_pool_frames(frame_count),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Creates a heap file under the temp directory and returns its path.
    pub fn create_file(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        self.manager
            .create_heap_file(&path)
            .expect("failed to create heap file");
        path
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}
