//! Translator Settings
//!
//! ```rust,ignore
//! use index_bridge::{IndexDataManager, IndexSettings, BackendClass};
//!
//! // Defaults: 16 KiB scratch buffers, backend decides its restart class
//! let settings = IndexSettings::default();
//!
//! // Force the basic class on a backend that would otherwise widen 16-bit
//! // indices around its reserved restart value
//! let settings = IndexSettings {
//!     backend_class: Some(BackendClass::Basic),
//!     ..Default::default()
//! };
//!
//! let manager = IndexDataManager::with_settings(backend, settings);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::format::BackendClass;
use crate::source::DEFAULT_STATIC_PROMOTION_FACTOR;

/// Initial size of each streaming scratch buffer: 4096 32-bit indices.
pub const INITIAL_INDEX_BUFFER_SIZE: u32 = 4096 * 4;

/// Configuration of an [`IndexDataManager`](crate::IndexDataManager).
///
/// | Field                     | Description                                  | Default          |
/// |---------------------------|----------------------------------------------|------------------|
/// | `initial_streaming_size`  | First allocation of each scratch buffer      | 16 KiB           |
/// | `backend_class`           | Override of the backend's restart class      | `None` (backend) |
/// | `static_promotion_factor` | Unmodified reuse (× size) before caching     | 3                |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Bytes reserved when a scratch buffer is first created.
    pub initial_streaming_size: u32,

    /// `None` uses [`IndexBackend::class`](crate::storage::IndexBackend::class).
    pub backend_class: Option<BackendClass>,

    /// How many times a dynamic buffer's size must be streamed unmodified
    /// before it allocates a static cache slot. Read by
    /// [`HostIndexBuffer::with_settings`](crate::source::HostIndexBuffer::with_settings).
    pub static_promotion_factor: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            initial_streaming_size: INITIAL_INDEX_BUFFER_SIZE,
            backend_class: None,
            static_promotion_factor: DEFAULT_STATIC_PROMOTION_FACTOR,
        }
    }
}

impl IndexSettings {
    /// Parses settings from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
