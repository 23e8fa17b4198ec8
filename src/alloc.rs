//! Allocator facade — every list buffer is acquired and released through here.
//!
//! Providers and consumers share one heap: a process-wide [`SystemAllocator`]
//! created on first use by [`shared`]. Operations that allocate also come in
//! `*_in` flavors taking an explicit [`AllocatorRef`], which is how tests
//! inject budgets and how a [`Namespace`](crate::Namespace) keeps its own
//! handle.
//!
//! Allocators are `Send + Sync`: the shared instance may be used from any
//! thread without caller-side locking.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace, warn};

use crate::config::AllocatorConfig;
use crate::error::{IdListError, Result};

/// Shared handle to an allocator.
pub type AllocatorRef = Arc<dyn Allocator>;

/// Source of list buffers.
pub trait Allocator: Send + Sync + fmt::Debug {
    /// Obtain a zero-filled buffer of exactly `len` bytes.
    fn acquire(&self, len: usize) -> Result<Box<[u8]>>;

    /// Give back a buffer previously obtained from [`acquire`](Self::acquire).
    fn release(&self, buffer: Box<[u8]>);

    /// Current bookkeeping counters.
    fn stats(&self) -> AllocatorStats;
}

/// Snapshot of allocator bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    pub live_blocks: usize,
    pub live_bytes: usize,
    pub total_acquired: usize,
    pub total_released: usize,
}

/// Allocator backed by the global Rust heap with fallible reservation and an
/// optional live-byte budget.
#[derive(Debug, Default)]
pub struct SystemAllocator {
    limit: Option<usize>,
    live_blocks: AtomicUsize,
    live_bytes: AtomicUsize,
    total_acquired: AtomicUsize,
    total_released: AtomicUsize,
}

impl SystemAllocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self {
            limit: config.limit_bytes,
            ..Self::default()
        }
    }

    /// Wrap into a shareable handle.
    pub fn into_ref(self) -> AllocatorRef {
        Arc::new(self)
    }

    /// Charge `len` bytes against the budget; `false` if it would be exceeded.
    fn charge(&self, len: usize) -> bool {
        self.live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                let next = live.checked_add(len)?;
                match self.limit {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            })
            .is_ok()
    }
}

impl Allocator for SystemAllocator {
    fn acquire(&self, len: usize) -> Result<Box<[u8]>> {
        if !self.charge(len) {
            warn!(requested = len, limit = ?self.limit, "allocation budget exhausted");
            return Err(IdListError::OutOfMemory { requested: len });
        }

        let mut buffer = Vec::new();
        if buffer.try_reserve_exact(len).is_err() {
            self.live_bytes.fetch_sub(len, Ordering::AcqRel);
            warn!(requested = len, "system heap refused allocation");
            return Err(IdListError::OutOfMemory { requested: len });
        }
        buffer.resize(len, 0);

        self.live_blocks.fetch_add(1, Ordering::AcqRel);
        self.total_acquired.fetch_add(1, Ordering::Relaxed);
        trace!(len, "acquired block");
        Ok(buffer.into_boxed_slice())
    }

    fn release(&self, buffer: Box<[u8]>) {
        let len = buffer.len();
        self.live_bytes.fetch_sub(len, Ordering::AcqRel);
        self.live_blocks.fetch_sub(1, Ordering::AcqRel);
        self.total_released.fetch_add(1, Ordering::Relaxed);
        trace!(len, "released block");
    }

    fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            live_blocks: self.live_blocks.load(Ordering::Acquire),
            live_bytes: self.live_bytes.load(Ordering::Acquire),
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
        }
    }
}

static SHARED: OnceLock<AllocatorRef> = OnceLock::new();

/// The process-wide allocator, created with default settings on first use.
pub fn shared() -> AllocatorRef {
    SHARED
        .get_or_init(|| {
            debug!("initializing shared allocator");
            SystemAllocator::default().into_ref()
        })
        .clone()
}

/// Configure the process-wide allocator. Must run before anything calls
/// [`shared`]; afterwards it fails with [`IdListError::AlreadyInitialized`].
pub fn install_shared(config: AllocatorConfig) -> Result<()> {
    SHARED
        .set(SystemAllocator::new(config).into_ref())
        .map_err(|_| IdListError::AlreadyInitialized)
}

/// A buffer paired with the allocator that produced it. Dropping the block
/// releases the buffer exactly once.
pub struct Block {
    bytes: Box<[u8]>,
    allocator: AllocatorRef,
}

impl Block {
    pub fn acquire(allocator: &AllocatorRef, len: usize) -> Result<Self> {
        let bytes = allocator.acquire(len)?;
        Ok(Self {
            bytes,
            allocator: Arc::clone(allocator),
        })
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn allocator(&self) -> &AllocatorRef {
        &self.allocator
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        let bytes = mem::take(&mut self.bytes);
        self.allocator.release(bytes);
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block").field("len", &self.bytes.len()).finish()
    }
}
