//! Index Data Manager
//!
//! Entry point of the translation layer. For every indexed draw it turns the
//! application's index description into something the backend can bind:
//!
//! 1. Infer restart-sentinel presence from the caller's range metadata.
//! 2. Pick the destination width ([`resolve_index_format`]).
//! 3. Client-side indices are always streamed.
//! 4. Buffer-backed indices are bound directly, streamed, or served from the
//!    buffer's static translation cache ([`classify`]).
//!
//! The manager owns one streaming scratch buffer per destination width,
//! created on first use and released by [`IndexDataManager::deinitialize`].
//! Calls against the same source buffer must be serialized by the caller.

use crate::classify::{BufferState, IndexPath, classify, is_streaming};
use crate::errors::{IndexError, Result};
use crate::format::{
    BackendClass, ElementWidth, IndexFormatDecision, resolve_index_format, use_primitive_restart_workaround,
};
use crate::range::IndexRange;
use crate::settings::IndexSettings;
use crate::source::SourceIndexBuffer;
use crate::storage::{IndexBackend, Serial};
use crate::streaming::StreamingIndexBuffer;

// ============================================================================
// Request / result types
// ============================================================================

/// Where a draw's indices live.
pub enum IndexData<'a, S> {
    /// Client memory, no backing buffer.
    Immediate(&'a [u8]),
    /// A source buffer, starting `offset` bytes in.
    Buffer { buffer: &'a mut S, offset: u32 },
}

/// One indexed draw, as issued by the application.
pub struct IndexRequest<'a, S> {
    pub width: ElementWidth,
    pub count: u32,
    pub data: IndexData<'a, S>,
    /// Pre-scanned metadata of the drawn elements.
    pub range: IndexRange,
}

impl<'a, S> IndexRequest<'a, S> {
    #[must_use]
    pub fn buffer(width: ElementWidth, count: u32, buffer: &'a mut S, offset: u32, range: IndexRange) -> Self {
        Self {
            width,
            count,
            data: IndexData::Buffer { buffer, offset },
            range,
        }
    }
}

/// What backs a [`TranslatedIndexData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBinding {
    /// The application's buffer itself.
    Source { buffer_id: u64 },
    /// The manager's scratch buffer of the translated width, see
    /// [`IndexDataManager::streaming_buffer`].
    Streaming,
    /// The static cache owned by the application's buffer.
    Static { buffer_id: u64 },
}

/// The draw as the application described it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceIndexInfo {
    pub width: ElementWidth,
    pub count: u32,
    pub buffer_id: Option<u64>,
}

/// Backend-ready index description of one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatedIndexData {
    pub index_range: IndexRange,
    /// Width the backend must bind.
    pub index_width: ElementWidth,
    pub binding: IndexBinding,
    /// First element, in units of `index_width`.
    pub start_index: u32,
    /// Byte offset of the first element within the bound storage.
    pub start_offset: u32,
    /// Identity of the bound storage, for dependency tracking only.
    pub serial: Serial,
    pub source: SourceIndexInfo,
}

// ============================================================================
// IndexDataManager
// ============================================================================

pub struct IndexDataManager<B: IndexBackend> {
    backend: B,
    class: BackendClass,
    settings: IndexSettings,

    streaming_short: Option<StreamingIndexBuffer<B::Storage>>,
    streaming_int: Option<StreamingIndexBuffer<B::Storage>>,
}

impl<B: IndexBackend> IndexDataManager<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, IndexSettings::default())
    }

    #[must_use]
    pub fn with_settings(backend: B, settings: IndexSettings) -> Self {
        let class = settings.backend_class.unwrap_or_else(|| backend.class());
        Self {
            backend,
            class,
            settings,
            streaming_short: None,
            streaming_int: None,
        }
    }

    #[must_use]
    pub fn backend_class(&self) -> BackendClass {
        self.class
    }

    #[must_use]
    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Releases both scratch buffers. Safe to call any number of times; the
    /// buffers are re-created if the manager is used again.
    pub fn deinitialize(&mut self) {
        let short = self.streaming_short.take();
        let int = self.streaming_int.take();
        if short.is_some() || int.is_some() {
            log::debug!("Released streaming index buffers");
        }
    }

    /// The scratch buffer of `width`, if it has been created.
    #[must_use]
    pub fn streaming_buffer(&self, width: ElementWidth) -> Option<&StreamingIndexBuffer<B::Storage>> {
        match width {
            ElementWidth::U8 => None,
            ElementWidth::U16 => self.streaming_short.as_ref(),
            ElementWidth::U32 => self.streaming_int.as_ref(),
        }
    }

    /// Whether a draw of `width` indices from `buffer` would stream right
    /// now, assuming a restart sentinel might be present.
    #[must_use]
    pub fn is_streaming_index_data<S: SourceIndexBuffer>(
        &self,
        width: ElementWidth,
        buffer: Option<&S>,
        fixed_restart_enabled: bool,
    ) -> bool {
        let workaround = use_primitive_restart_workaround(fixed_restart_enabled, width, self.class);
        let destination = if width == ElementWidth::U32 || workaround {
            ElementWidth::U32
        } else {
            ElementWidth::U16
        };
        let state = buffer.map(BufferState::of);
        is_streaming(width, destination, state.as_ref())
    }

    /// Translates client-side indices. Shorthand for an immediate [`IndexRequest`].
    pub fn prepare_immediate(
        &mut self,
        width: ElementWidth,
        count: u32,
        data: &[u8],
        range: IndexRange,
        fixed_restart_enabled: bool,
    ) -> Result<TranslatedIndexData> {
        let decision = self.decide(width, count, &range, fixed_restart_enabled);
        self.prepare_client(width, count, data, range, decision, fixed_restart_enabled)
    }

    /// Translates one draw's indices.
    pub fn prepare_index_data<S: SourceIndexBuffer>(
        &mut self,
        request: IndexRequest<'_, S>,
        fixed_restart_enabled: bool,
    ) -> Result<TranslatedIndexData> {
        let IndexRequest {
            width,
            count,
            data,
            range,
        } = request;
        let decision = self.decide(width, count, &range, fixed_restart_enabled);

        match data {
            IndexData::Immediate(bytes) => {
                self.prepare_client(width, count, bytes, range, decision, fixed_restart_enabled)
            }
            IndexData::Buffer { buffer, offset } => {
                self.prepare_buffer(width, count, buffer, offset, range, decision, fixed_restart_enabled)
            }
        }
    }

    fn decide(
        &self,
        width: ElementWidth,
        count: u32,
        range: &IndexRange,
        fixed_restart_enabled: bool,
    ) -> IndexFormatDecision {
        let restart_present = range.has_primitive_restart_index(count, width);
        resolve_index_format(width, fixed_restart_enabled, self.class, restart_present)
    }

    // Case 1: client memory forces streaming.
    fn prepare_client(
        &mut self,
        width: ElementWidth,
        count: u32,
        data: &[u8],
        range: IndexRange,
        decision: IndexFormatDecision,
        fixed_restart_enabled: bool,
    ) -> Result<TranslatedIndexData> {
        let bytes = u64::from(count) << width.shift();
        if bytes > data.len() as u64 {
            return Err(IndexError::RangeOutOfBounds {
                offset: 0,
                bytes,
                buffer_size: data.len() as u32,
            });
        }

        let destination = decision.destination;
        let remap = decision.remaps_restart(width, fixed_restart_enabled);
        log::trace!("Streaming {count} client indices {width:?} -> {destination:?}");

        let (offset, serial) = self.stream_index_data(data, count, width, destination, remap)?;
        Ok(TranslatedIndexData {
            index_range: range,
            index_width: destination,
            binding: IndexBinding::Streaming,
            start_index: offset >> destination.shift(),
            start_offset: offset,
            serial,
            source: SourceIndexInfo {
                width,
                count,
                buffer_id: None,
            },
        })
    }

    // Case 2: indices already live in a buffer.
    fn prepare_buffer<S: SourceIndexBuffer>(
        &mut self,
        width: ElementWidth,
        count: u32,
        buffer: &mut S,
        offset: u32,
        range: IndexRange,
        decision: IndexFormatDecision,
        fixed_restart_enabled: bool,
    ) -> Result<TranslatedIndexData> {
        let bytes = u64::from(count) << width.shift();
        if bytes + u64::from(offset) > u64::from(buffer.size()) {
            return Err(IndexError::RangeOutOfBounds {
                offset,
                bytes,
                buffer_size: buffer.size(),
            });
        }

        let destination = decision.destination;
        let remap = decision.remaps_restart(width, fixed_restart_enabled);
        let state = BufferState::of(&*buffer);
        let path = classify(width, destination, remap, offset, Some(&state));
        log::trace!("Buffer {} draw of {count} {width:?} indices: {path:?}", buffer.id());

        let source = SourceIndexInfo {
            width,
            count,
            buffer_id: Some(buffer.id()),
        };

        match path {
            // Case 2a: bind the buffer as-is.
            IndexPath::Direct => Ok(TranslatedIndexData {
                index_range: range,
                index_width: destination,
                binding: IndexBinding::Source {
                    buffer_id: buffer.id(),
                },
                start_index: offset >> width.shift(),
                start_offset: offset,
                serial: buffer.serial(),
                source,
            }),

            // Case 2b: stream this draw, let the buffer decide about caching.
            IndexPath::Stream {
                invalidate_stale_cache,
            } => {
                if invalidate_stale_cache {
                    log::warn!(
                        "Static index cache of buffer {} no longer matches {destination:?}; discarding",
                        buffer.id()
                    );
                    buffer.invalidate_static_data()?;
                }

                let data = buffer.data()?;
                let (stream_offset, serial) =
                    self.stream_index_data(&data[offset as usize..], count, width, destination, remap)?;
                buffer.promote_static_usage(count << width.shift())?;

                Ok(TranslatedIndexData {
                    index_range: range,
                    index_width: destination,
                    binding: IndexBinding::Streaming,
                    start_index: stream_offset >> destination.shift(),
                    start_offset: stream_offset,
                    serial,
                    source,
                })
            }

            // Case 2b: serve from the static translation.
            IndexPath::Cached { build } => {
                if build {
                    let data = buffer.data()?;
                    let Some(cache) = buffer.static_index_buffer_mut() else {
                        return Err(IndexError::contract("static index buffer vanished during translation"));
                    };
                    cache.build(&data, width, destination, remap)?;
                }

                let Some(cache) = buffer.static_index_buffer() else {
                    return Err(IndexError::contract("static index buffer vanished during translation"));
                };
                if cache.index_width() != Some(destination) {
                    return Err(IndexError::contract("static index buffer built at the wrong width"));
                }

                let start_index = offset >> width.shift();
                Ok(TranslatedIndexData {
                    index_range: range,
                    index_width: destination,
                    binding: IndexBinding::Static {
                        buffer_id: buffer.id(),
                    },
                    start_index,
                    start_offset: start_index << destination.shift(),
                    serial: cache.serial(),
                    source,
                })
            }

            IndexPath::Immediate => Err(IndexError::contract("buffer-backed draw classified as immediate")),
        }
    }

    /// Streams `count` indices; returns the byte offset and the scratch buffer's serial.
    fn stream_index_data(
        &mut self,
        data: &[u8],
        count: u32,
        source: ElementWidth,
        destination: ElementWidth,
        remap_restart: bool,
    ) -> Result<(u32, Serial)> {
        let buffer = self.streaming_index_buffer(destination)?;
        let offset = buffer.stream_in(data, count, source, destination, remap_restart)?;
        Ok((offset, buffer.serial()))
    }

    fn streaming_index_buffer(&mut self, width: ElementWidth) -> Result<&mut StreamingIndexBuffer<B::Storage>> {
        let (slot, label) = match width {
            ElementWidth::U16 => (&mut self.streaming_short, "Streaming Index Buffer (u16)"),
            ElementWidth::U32 => (&mut self.streaming_int, "Streaming Index Buffer (u32)"),
            ElementWidth::U8 => return Err(IndexError::contract("no streaming buffer for 8-bit indices")),
        };

        if slot.is_none() {
            let mut buffer = StreamingIndexBuffer::new(self.backend.create_index_storage(label)?);
            buffer.reserve(self.settings.initial_streaming_size, width)?;
            *slot = Some(buffer);
        }

        slot.as_mut()
            .ok_or_else(|| IndexError::contract("streaming index buffer missing after creation"))
    }
}
