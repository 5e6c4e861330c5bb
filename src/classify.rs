//! Per-draw path selection.
//!
//! ```text
//!  no buffer ───────────────────────────────────────────────► Immediate (stream)
//!  buffer ─┬─ aligned ∧ direct binding ∧ same width ────────► Direct
//!          └─ otherwise ─┬─ built cache, unusable ──► drop ─► Stream (+ promote)
//!                        ├─ no cache slot ∨ unaligned ──────► Stream (+ promote)
//!                        └─ slot, aligned ─┬─ empty ────────► Cached (build first)
//!                                          └─ width match ──► Cached
//! ```
//!
//! Nothing here is remembered between draws; the buffer's state is sampled
//! again on every call.

use crate::format::ElementWidth;
use crate::source::SourceIndexBuffer;

/// Snapshot of a static cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheState {
    pub initialized: bool,
    pub width: Option<ElementWidth>,
    /// Restart sentinels were rewritten during the build.
    pub restart_remapped: bool,
}

/// Snapshot of what classification needs from a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferState {
    pub size: u32,
    pub supports_direct_binding: bool,
    pub static_cache: Option<CacheState>,
}

impl BufferState {
    pub fn of<S: SourceIndexBuffer>(buffer: &S) -> Self {
        Self {
            size: buffer.size(),
            supports_direct_binding: buffer.supports_direct_binding(),
            static_cache: buffer.static_index_buffer().map(|cache| CacheState {
                initialized: cache.is_initialized(),
                width: cache.index_width(),
                restart_remapped: cache.restart_remapped(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPath {
    /// Client-side indices; always streamed.
    Immediate,
    /// Bind the source buffer itself.
    Direct,
    /// Convert this draw's slice into the scratch buffer, then report usage
    /// to the source buffer.
    Stream {
        /// A built cache of the wrong width (or at an unusable offset) must
        /// be dropped first.
        invalidate_stale_cache: bool,
    },
    /// Bind the static cache at the rescaled offset.
    Cached {
        /// The slot is empty and has to be built from the whole buffer first.
        build: bool,
    },
}

/// Chooses how a draw's indices reach the backend.
///
/// A built cache is usable only at an aligned offset, at the required
/// `destination` width, and with the same `remap_restart` setting it was
/// built with.
#[must_use]
pub fn classify(
    source: ElementWidth,
    destination: ElementWidth,
    remap_restart: bool,
    offset: u32,
    buffer: Option<&BufferState>,
) -> IndexPath {
    let Some(buffer) = buffer else {
        return IndexPath::Immediate;
    };

    let aligned = source.is_aligned(offset);
    if aligned && buffer.supports_direct_binding && destination == source {
        return IndexPath::Direct;
    }

    let Some(cache) = buffer.static_cache else {
        return IndexPath::Stream {
            invalidate_stale_cache: false,
        };
    };

    let usable = aligned && cache.width == Some(destination) && cache.restart_remapped == remap_restart;
    if cache.initialized && !usable {
        return IndexPath::Stream {
            invalidate_stale_cache: true,
        };
    }
    if !aligned {
        return IndexPath::Stream {
            invalidate_stale_cache: false,
        };
    }

    IndexPath::Cached {
        build: !cache.initialized,
    }
}

/// Whether a draw from `buffer` will stream, without building anything.
///
/// Unlike [`classify`], an empty cache slot counts as streaming here: the
/// question is whether translated data is ready to bind right now.
#[must_use]
pub fn is_streaming(source: ElementWidth, destination: ElementWidth, buffer: Option<&BufferState>) -> bool {
    let Some(buffer) = buffer else {
        return true;
    };

    if buffer.supports_direct_binding && destination == source {
        return false;
    }

    match buffer.static_cache {
        Some(cache) => !cache.initialized || cache.width != Some(destination),
        None => true,
    }
}
