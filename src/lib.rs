#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Index buffer translation and caching.
//!
//! Sits between an application API that accepts 8-, 16- and 32-bit indices
//! (from client memory or from buffers at arbitrary offsets) and a backend
//! that only binds 16- and 32-bit indices at aligned offsets and reserves its
//! own restart value. Per draw, [`IndexDataManager`] binds the application's
//! buffer directly, streams a converted slice through a scratch buffer, or
//! serves a static translated copy cached on the source buffer.
//!
//! ```rust,ignore
//! use index_bridge::{HostBackend, HostIndexBuffer, BufferUsageHint, IndexDataManager};
//! use index_bridge::{ElementWidth, IndexRange, IndexRequest};
//!
//! let backend = HostBackend::default();
//! let mut manager = IndexDataManager::new(backend);
//! let mut buffer = HostIndexBuffer::from_indices(backend, &[0u16, 1, 2], BufferUsageHint::Static, None)?;
//!
//! let range = IndexRange::compute(ElementWidth::U16, &buffer.data()?, 3, false);
//! let request = IndexRequest::buffer(ElementWidth::U16, 3, &mut buffer, 0, range);
//! let translated = manager.prepare_index_data(request, false)?;
//! ```

pub mod classify;
pub mod convert;
pub mod errors;
pub mod format;
pub mod manager;
pub mod range;
pub mod settings;
pub mod source;
pub mod static_cache;
pub mod storage;
pub mod streaming;

pub use classify::{BufferState, CacheState, IndexPath};
pub use convert::{convert_indices, convert_to_vec};
pub use errors::{IndexError, Result};
pub use format::{BackendClass, ElementWidth, IndexFormatDecision, resolve_index_format};
pub use manager::{IndexBinding, IndexData, IndexDataManager, IndexRequest, SourceIndexInfo, TranslatedIndexData};
pub use range::IndexRange;
pub use settings::IndexSettings;
pub use source::{BufferUsageHint, HostIndexBuffer, SourceIndexBuffer};
pub use static_cache::StaticIndexBuffer;
pub use storage::{HostBackend, HostIndexStorage, IndexBackend, IndexStorage, Serial, WgpuBackend, WgpuIndexStorage};
pub use streaming::StreamingIndexBuffer;
