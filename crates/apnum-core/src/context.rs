//! Runtime tunables and the process-wide shared-memory lock.
//!
//! A [`Context`] carries the cache/memory geometry the transform builder
//! consults; the process-global default can be replaced wholesale (e.g. after
//! loading a configuration file). Memory-heavy transforms serialize against
//! each other through [`Context::lock_shared_memory`], which hands back an
//! RAII guard so every exit path releases the lock.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, RwLock};

/// Cache and memory geometry consulted by the transform strategy builder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// L1 data cache size per core, in bytes.
    pub cache_l1_size: usize,
    /// Largest block the engine may allocate in main memory, in bytes.
    /// Transforms over this size go through disk-backed storage.
    pub max_memory_block_size: usize,
    /// Worker threads available to the transform kernels.
    pub num_processors: usize,
    /// Data size, in bytes, above which a transform must hold the
    /// shared-memory lock.
    pub shared_memory_threshold: usize,
}

impl Default for Context {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self {
            cache_l1_size: 64 * 1024,
            max_memory_block_size: 1 << 30,
            num_processors: cpus,
            shared_memory_threshold: 64 << 20,
        }
    }
}

static GLOBAL: Lazy<RwLock<Context>> = Lazy::new(|| RwLock::new(Context::default()));

static SHARED_MEMORY: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Guard for the process-wide shared-memory lock; released on drop.
#[must_use = "dropping the guard releases the shared-memory lock"]
pub struct SharedMemoryGuard {
    _inner: MutexGuard<'static, ()>,
}

impl Context {
    /// Snapshot of the process-global context.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Replace the process-global context.
    pub fn set_global(ctx: Self) {
        *GLOBAL
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = ctx;
    }

    /// Acquire the shared-memory lock when `data_size` (bytes) crosses the
    /// configured threshold; smaller transforms proceed unlocked.
    pub fn lock_shared_memory(&self, data_size: usize) -> Option<SharedMemoryGuard> {
        if data_size > self.shared_memory_threshold {
            tracing::debug!(data_size, "acquiring shared-memory lock");
            let inner = SHARED_MEMORY
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            Some(SharedMemoryGuard { _inner: inner })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_is_sane() {
        let ctx = Context::default();
        assert!(ctx.num_processors >= 1);
        assert!(ctx.cache_l1_size > 0);
        assert!(ctx.max_memory_block_size > ctx.cache_l1_size);
    }

    #[test]
    fn small_transforms_skip_the_lock() {
        let ctx = Context::default();
        assert!(ctx.lock_shared_memory(1024).is_none());
        let guard = ctx.lock_shared_memory(ctx.shared_memory_threshold + 1);
        assert!(guard.is_some());
    }
}
