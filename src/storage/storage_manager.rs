use std::path::Path;
use std::sync::Arc;

use crate::storage::buffer_pool::BufferPool;
use crate::storage::disk_manager::DiskManager;
use crate::storage::heap_file;
use crate::types::{error::Result, DEFAULT_POOL_FRAMES};

/// Bundles the disk manager and the buffer pool that every heap file in
/// a process shares.
pub struct StorageManager {
    disk: Arc<DiskManager>,
    pool: BufferPool,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::with_pool_frames(DEFAULT_POOL_FRAMES)
    }

    pub fn with_pool_frames(frame_count: usize) -> Self {
        Self {
            disk: Arc::new(DiskManager::new()),
            pool: BufferPool::new(frame_count),
        }
    }

    pub fn disk(&self) -> &Arc<DiskManager> {
        &self.disk
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn create_heap_file(&self, path: impl AsRef<Path>) -> Result<()> {
        heap_file::create_heap_file(&self.disk, &self.pool, path)
    }

    pub fn destroy_heap_file(&self, path: impl AsRef<Path>) -> Result<()> {
        heap_file::destroy_heap_file(&self.disk, &self.pool, path)
    }

    /// Forces every dirty cached page out to disk.
    pub fn flush(&self) -> Result<()> {
        self.pool.flush_all()
    }
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}
