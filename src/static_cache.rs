//! Static translation cache.
//!
//! A full destination-format copy of a source buffer, built once and then
//! bound at rescaled offsets by every later draw that needs the same width.
//! The cache is all-or-nothing: it is built from the whole buffer in one go,
//! and invalidation drops it entirely (the owning source buffer replaces it
//! with an empty slot or nothing, see
//! [`SourceIndexBuffer::invalidate_static_data`](crate::source::SourceIndexBuffer::invalidate_static_data)).

use crate::convert::{checked_byte_size, convert_indices};
use crate::errors::{IndexError, Result};
use crate::format::ElementWidth;
use crate::storage::{IndexStorage, Serial};

pub struct StaticIndexBuffer<S> {
    storage: S,
    built: bool,
    restart_remapped: bool,
    build_count: u32,
}

impl<S: IndexStorage> StaticIndexBuffer<S> {
    /// An empty slot, populated by the first qualifying draw.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            built: false,
            restart_remapped: false,
            build_count: 0,
        }
    }

    /// Whether translated content is present. A buffer too small to hold a
    /// single source element still counts once built.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.built
    }

    /// Width of the translated content. `None` while empty.
    #[must_use]
    pub fn index_width(&self) -> Option<ElementWidth> {
        if self.is_initialized() {
            self.storage.index_width()
        } else {
            None
        }
    }

    /// Translates the entire `source_bytes` content into `destination` width.
    ///
    /// Trailing bytes that do not form a whole source element are ignored.
    pub fn build(
        &mut self,
        source_bytes: &[u8],
        source: ElementWidth,
        destination: ElementWidth,
        remap_restart: bool,
    ) -> Result<()> {
        if self.is_initialized() {
            return Err(IndexError::contract("static index buffer rebuilt without invalidation"));
        }

        let Ok(count) = u32::try_from(source_bytes.len() >> source.shift()) else {
            return Err(IndexError::CapacityExceeded {
                count: u32::MAX,
                element_size: destination.bytes(),
            });
        };
        let bytes = checked_byte_size(count, destination)?;

        self.storage.set_buffer_size(bytes, destination)?;
        let region = self.storage.map_buffer(0, bytes)?;
        let converted = convert_indices(source, destination, source_bytes, count, region, remap_restart);
        self.storage.unmap_buffer()?;
        converted?;

        self.built = true;
        self.restart_remapped = remap_restart;
        self.build_count += 1;
        log::info!("Built static index cache: {count} indices {source:?} -> {destination:?}");
        Ok(())
    }

    /// Whether restart sentinels were rewritten when the content was built.
    /// Content built with a different remap setting is not interchangeable.
    #[must_use]
    pub fn restart_remapped(&self) -> bool {
        self.restart_remapped
    }

    /// Number of times content was translated into this slot.
    #[must_use]
    pub fn build_count(&self) -> u32 {
        self.build_count
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

    #[test]
    fn new_slot_is_empty() {
        let cache = StaticIndexBuffer::new(HostIndexStorage::new("static"));
        assert!(!cache.is_initialized());
        assert_eq!(cache.index_width(), None);
    }

    #[test]
    fn build_translates_whole_buffer() {
        let mut cache = StaticIndexBuffer::new(HostIndexStorage::new("static"));
        let source: Vec<u8> = bytemuck::cast_slice(&[1u16, 65535, 3, 4]).to_vec();

        cache.build(&source, ElementWidth::U16, ElementWidth::U32, true).unwrap();

        assert!(cache.is_initialized());
        assert_eq!(cache.index_width(), Some(ElementWidth::U32));
        assert_eq!(cache.build_count(), 1);
        assert!(cache.restart_remapped());
        let values: Vec<u32> = bytemuck::pod_collect_to_vec(cache.storage().contents());
        assert_eq!(values, [1, u32::MAX, 3, 4]);
    }

    #[test]
    fn partial_trailing_element_ignored() {
        let mut cache = StaticIndexBuffer::new(HostIndexStorage::new("static"));
        cache.build(&[7, 0, 9], ElementWidth::U16, ElementWidth::U32, false).unwrap();
        assert_eq!(cache.storage().buffer_size(), 4);
    }

    #[test]
    fn empty_source_builds_empty_cache() {
        let mut cache = StaticIndexBuffer::new(HostIndexStorage::new("static"));
        cache.build(&[1], ElementWidth::U16, ElementWidth::U16, false).unwrap();

        assert!(cache.is_initialized());
        assert_eq!(cache.index_width(), Some(ElementWidth::U16));
        assert_eq!(cache.storage().buffer_size(), 0);
    }
}
