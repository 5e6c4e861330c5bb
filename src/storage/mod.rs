//! Backend index storage.
//!
//! The translation layer never talks to a graphics API directly. It drives
//! raw index storage objects through [`IndexStorage`] and creates them through
//! an [`IndexBackend`]:
//! - host.rs: storage in host memory (software paths, tests)
//! - gpu.rs: `wgpu::Buffer` storage with a host shadow copy

mod gpu;
mod host;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::Result;
use crate::format::{BackendClass, ElementWidth};

pub use gpu::{WgpuBackend, WgpuIndexStorage};
pub use host::{HostBackend, HostIndexStorage};

// ============================================================================
// Serial
// ============================================================================

/// Global serial generator
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a backing allocation.
///
/// A new serial is issued whenever a storage object replaces its allocation,
/// and whenever a source buffer's content changes. Consumers compare serials
/// for dependency tracking and never interpret them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Serial(u64);

impl Serial {
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SERIAL.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A raw backend index buffer.
///
/// Map/unmap pairs are strictly nested: callers write into the slice returned
/// by [`map_buffer`](Self::map_buffer) and then call
/// [`unmap_buffer`](Self::unmap_buffer) before the next map.
pub trait IndexStorage {
    /// (Re)allocates to hold `bytes` bytes of `width` indices when the
    /// current allocation is smaller or typed differently. Never shrinks.
    fn set_buffer_size(&mut self, bytes: u32, width: ElementWidth) -> Result<()>;

    /// Orphans the current contents so the whole buffer can be rewritten
    /// without stalling on draws that still read it.
    fn discard(&mut self) -> Result<()>;

    fn map_buffer(&mut self, offset: u32, bytes: u32) -> Result<&mut [u8]>;

    fn unmap_buffer(&mut self) -> Result<()>;

    fn buffer_size(&self) -> u32;

    /// `None` until the first allocation.
    fn index_width(&self) -> Option<ElementWidth>;

    fn serial(&self) -> Serial;
}

/// Factory for [`IndexStorage`] objects of one backend.
pub trait IndexBackend {
    type Storage: IndexStorage;

    fn class(&self) -> BackendClass;

    fn create_index_storage(&self, label: &str) -> Result<Self::Storage>;
}
