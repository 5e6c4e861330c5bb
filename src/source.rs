//! Source index buffers.
//!
//! [`SourceIndexBuffer`] is what the translator needs from an application
//! buffer: its bytes, whether the backend can bind it as-is, and its static
//! translation cache. Deciding *when* a cache is worth materializing belongs
//! to the buffer; the translator only reports usage through
//! [`promote_static_usage`](SourceIndexBuffer::promote_static_usage).
//!
//! [`HostIndexBuffer`] is the reference implementation, keeping the
//! application's data in host memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::errors::{IndexError, Result};
use crate::settings::IndexSettings;
use crate::static_cache::StaticIndexBuffer;
use crate::storage::{IndexBackend, IndexStorage, Serial};

// Global buffer ID generator
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

pub trait SourceIndexBuffer {
    type Storage: IndexStorage;

    /// Stable identity, used as the backing handle of translated indices.
    fn id(&self) -> u64;

    fn size(&self) -> u32;

    /// Changes whenever the buffer's content changes.
    fn serial(&self) -> Serial;

    fn supports_direct_binding(&self) -> bool;

    /// A view of the current content, valid until the next mutation.
    fn data(&self) -> Result<Arc<Vec<u8>>>;

    /// The static cache slot, if one has been allocated (it may still be empty).
    fn static_index_buffer(&self) -> Option<&StaticIndexBuffer<Self::Storage>>;

    fn static_index_buffer_mut(&mut self) -> Option<&mut StaticIndexBuffer<Self::Storage>>;

    /// Discards translated static content.
    fn invalidate_static_data(&mut self) -> Result<()>;

    /// Records that `bytes` of unmodified content were streamed for a draw.
    fn promote_static_usage(&mut self, bytes: u32) -> Result<()>;
}

/// How the application intends to update a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferUsageHint {
    /// Written once, drawn many times. A cache slot is kept allocated at all times.
    Static,
    /// Rewritten regularly. A cache slot is allocated only after enough
    /// unmodified reuse.
    #[default]
    Dynamic,
}

/// Default multiple of the buffer size that must be streamed unmodified
/// before a dynamic buffer allocates a cache slot.
pub const DEFAULT_STATIC_PROMOTION_FACTOR: u32 = 3;

/// Application index data held in host memory.
pub struct HostIndexBuffer<B: IndexBackend> {
    id: u64,
    label: String,
    backend: B,
    data: Arc<Vec<u8>>,
    serial: Serial,
    usage: BufferUsageHint,
    direct_binding: bool,

    static_buffer: Option<StaticIndexBuffer<B::Storage>>,
    unmodified_data_use: u64,
    promotion_factor: u32,
}

impl<B: IndexBackend> HostIndexBuffer<B> {
    pub fn new(backend: B, data: &[u8], usage: BufferUsageHint, label: Option<&str>) -> Result<Self> {
        let mut buffer = Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            label: label.unwrap_or("IndexBuffer").to_string(),
            backend,
            data: Arc::new(data.to_vec()),
            serial: Serial::next(),
            usage,
            direct_binding: true,
            static_buffer: None,
            unmodified_data_use: 0,
            promotion_factor: DEFAULT_STATIC_PROMOTION_FACTOR,
        };

        if usage == BufferUsageHint::Static {
            buffer.initialize_static_data()?;
        }
        Ok(buffer)
    }

    /// Typed convenience over [`new`](Self::new).
    pub fn from_indices<T: bytemuck::Pod>(
        backend: B,
        indices: &[T],
        usage: BufferUsageHint,
        label: Option<&str>,
    ) -> Result<Self> {
        Self::new(backend, bytemuck::cast_slice(indices), usage, label)
    }

    #[must_use]
    pub fn with_direct_binding(mut self, supported: bool) -> Self {
        self.direct_binding = supported;
        self
    }

    #[must_use]
    pub fn with_promotion_factor(mut self, factor: u32) -> Self {
        self.promotion_factor = factor;
        self
    }

    /// Applies the buffer-side fields of `settings`.
    #[must_use]
    pub fn with_settings(self, settings: &IndexSettings) -> Self {
        self.with_promotion_factor(settings.static_promotion_factor)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn usage(&self) -> BufferUsageHint {
        self.usage
    }

    /// Replaces the whole content.
    pub fn set_data(&mut self, data: &[u8]) -> Result<()> {
        self.data = Arc::new(data.to_vec());
        self.content_changed()
    }

    /// Overwrites `data.len()` bytes at `offset`.
    pub fn set_sub_data(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + data.len();
        if end > self.data.len() {
            return Err(IndexError::RangeOutOfBounds {
                offset,
                bytes: data.len() as u64,
                buffer_size: self.size(),
            });
        }

        // Copy-on-write: views handed out by `data()` keep the old content.
        Arc::make_mut(&mut self.data)[start..end].copy_from_slice(data);
        self.content_changed()
    }

    fn content_changed(&mut self) -> Result<()> {
        self.serial = Serial::next();
        self.invalidate_static_data()
    }

    fn initialize_static_data(&mut self) -> Result<()> {
        if self.static_buffer.is_none() {
            let storage = self.backend.create_index_storage(&format!("{} (static)", self.label))?;
            self.static_buffer = Some(StaticIndexBuffer::new(storage));
        }
        Ok(())
    }
}

impl<B: IndexBackend> SourceIndexBuffer for HostIndexBuffer<B> {
    type Storage = B::Storage;

    fn id(&self) -> u64 {
        self.id
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn serial(&self) -> Serial {
        self.serial
    }

    fn supports_direct_binding(&self) -> bool {
        self.direct_binding
    }

    fn data(&self) -> Result<Arc<Vec<u8>>> {
        Ok(Arc::clone(&self.data))
    }

    fn static_index_buffer(&self) -> Option<&StaticIndexBuffer<B::Storage>> {
        self.static_buffer.as_ref()
    }

    fn static_index_buffer_mut(&mut self) -> Option<&mut StaticIndexBuffer<B::Storage>> {
        self.static_buffer.as_mut()
    }

    fn invalidate_static_data(&mut self) -> Result<()> {
        if self.static_buffer.as_ref().is_some_and(StaticIndexBuffer::is_initialized) {
            log::info!("Invalidating static index cache of {:?}", self.label);
            self.static_buffer = None;
        }

        if self.usage == BufferUsageHint::Static {
            self.initialize_static_data()?;
        }
        self.unmodified_data_use = 0;
        Ok(())
    }

    fn promote_static_usage(&mut self, bytes: u32) -> Result<()> {
        if self.static_buffer.is_some() {
            return Ok(());
        }

        self.unmodified_data_use += u64::from(bytes);
        if self.unmodified_data_use > u64::from(self.promotion_factor) * u64::from(self.size()) {
            log::debug!("Promoting {:?} to a static index cache", self.label);
            self.initialize_static_data()?;
        }
        Ok(())
    }
}
