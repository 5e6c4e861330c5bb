//! Streaming scratch buffer for per-draw index data.
//!
//! # Memory Strategy
//!
//! - One buffer per destination width, created on first use.
//! - Writes are appended at a cursor. When the next write does not fit in
//!   the remaining space the buffer is discarded and the cursor wraps to 0.
//! - When a single write is larger than the whole buffer, the buffer grows
//!   to `max(request, 2 × capacity)`. Capacity never shrinks.

use crate::convert::{checked_byte_size, convert_indices};
use crate::errors::{IndexError, Result};
use crate::format::ElementWidth;
use crate::storage::{IndexStorage, Serial};

pub struct StreamingIndexBuffer<S> {
    storage: S,
    write_position: u32,
}

impl<S: IndexStorage> StreamingIndexBuffer<S> {
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_position: 0,
        }
    }

    /// Makes room for a `bytes`-sized write at the cursor.
    pub fn reserve(&mut self, bytes: u32, width: ElementWidth) -> Result<()> {
        let capacity = self.storage.buffer_size();
        let needs_retype = self.storage.index_width().is_some_and(|w| w != width);

        if bytes > capacity || needs_retype {
            let new_size = bytes.max(capacity.saturating_mul(2));
            log::debug!("Streaming index buffer growing: {capacity} -> {new_size} bytes ({width:?})");
            self.storage.set_buffer_size(new_size, width)?;
            self.write_position = 0;
        } else if self
            .write_position
            .checked_add(bytes)
            .is_none_or(|end| end > capacity)
        {
            self.storage.discard()?;
            self.write_position = 0;
        }

        Ok(())
    }

    /// Maps `bytes` at the cursor and advances it. Returns the region and its byte offset.
    pub fn map(&mut self, bytes: u32) -> Result<(&mut [u8], u32)> {
        let offset = self.write_position;
        let Some(end) = offset.checked_add(bytes) else {
            return Err(IndexError::CapacityExceeded {
                count: bytes,
                element_size: 1,
            });
        };

        let region = self.storage.map_buffer(offset, bytes)?;
        self.write_position = end;
        Ok((region, offset))
    }

    pub fn unmap(&mut self) -> Result<()> {
        self.storage.unmap_buffer()
    }

    /// Converts `count` indices into a fresh region. Returns the region's byte offset.
    pub fn stream_in(
        &mut self,
        data: &[u8],
        count: u32,
        source: ElementWidth,
        destination: ElementWidth,
        remap_restart: bool,
    ) -> Result<u32> {
        let bytes = checked_byte_size(count, destination)?;
        self.reserve(bytes, destination)?;

        let (region, offset) = self.map(bytes)?;
        let converted = convert_indices(source, destination, data, count, region, remap_restart);
        self.unmap()?;
        converted?;

        Ok(offset)
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.storage.buffer_size()
    }

    #[must_use]
    pub fn write_position(&self) -> u32 {
        self.write_position
    }

    #[must_use]
    pub fn index_width(&self) -> Option<ElementWidth> {
        self.storage.index_width()
    }

    #[must_use]
    pub fn serial(&self) -> Serial {
        self.storage.serial()
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::HostIndexStorage;

    fn buffer() -> StreamingIndexBuffer<HostIndexStorage> {
        StreamingIndexBuffer::new(HostIndexStorage::new("streaming"))
    }

    #[test]
    fn first_reserve_allocates_request() {
        let mut buf = buffer();
        buf.reserve(64, ElementWidth::U16).unwrap();
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.index_width(), Some(ElementWidth::U16));
    }

    #[test]
    fn smaller_reserve_does_not_reallocate() {
        let mut buf = buffer();
        buf.reserve(64, ElementWidth::U16).unwrap();
        buf.reserve(16, ElementWidth::U16).unwrap();
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.storage().allocation_count(), 1);
    }

    #[test]
    fn growth_doubles() {
        let mut buf = buffer();
        buf.reserve(64, ElementWidth::U32).unwrap();
        buf.reserve(80, ElementWidth::U32).unwrap();
        assert_eq!(buf.capacity(), 128);
        buf.reserve(1000, ElementWidth::U32).unwrap();
        assert_eq!(buf.capacity(), 1000);
    }

    #[test]
    fn cursor_advances_then_wraps() {
        let mut buf = buffer();
        buf.reserve(16, ElementWidth::U16).unwrap();

        let (_, first) = buf.map(10).unwrap();
        buf.unmap().unwrap();
        assert_eq!(first, 0);

        buf.reserve(4, ElementWidth::U16).unwrap();
        let (_, second) = buf.map(4).unwrap();
        buf.unmap().unwrap();
        assert_eq!(second, 10);

        buf.reserve(4, ElementWidth::U16).unwrap();
        let (_, third) = buf.map(4).unwrap();
        buf.unmap().unwrap();
        assert_eq!(third, 0);
        assert_eq!(buf.storage().discard_count(), 1);
        assert_eq!(buf.capacity(), 16);
    }

    #[test]
    fn stream_in_converts_at_offset() {
        let mut buf = buffer();
        buf.reserve(16, ElementWidth::U16).unwrap();
        let first = buf.stream_in(&[1, 2], 2, ElementWidth::U8, ElementWidth::U16, false).unwrap();
        let second = buf.stream_in(&[3, 255], 2, ElementWidth::U8, ElementWidth::U16, true).unwrap();
        assert_eq!((first, second), (0, 4));

        let values: Vec<u16> = bytemuck::pod_collect_to_vec(&buf.storage().contents()[..8]);
        assert_eq!(values, [1, 2, 3, 65535]);
    }

    #[test]
    fn stream_in_rejects_overflowing_count() {
        let mut buf = buffer();
        let err = buf
            .stream_in(&[], u32::MAX, ElementWidth::U16, ElementWidth::U32, false)
            .unwrap_err();
        assert!(matches!(err, IndexError::CapacityExceeded { .. }));
        assert_eq!(buf.capacity(), 0);
    }
}
