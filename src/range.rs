//! Pre-scanned index range metadata.

use crate::convert::read_index;
use crate::format::ElementWidth;

/// Smallest and largest index referenced by a draw, plus how many elements
/// actually address a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRange {
    pub start: u32,
    pub end: u32,
    /// Elements that are not restart sentinels. Equals the draw count when
    /// the range was scanned with restart disabled.
    pub vertex_index_count: usize,
}

impl IndexRange {
    #[must_use]
    pub fn new(start: u32, end: u32, vertex_index_count: usize) -> Self {
        Self {
            start,
            end,
            vertex_index_count,
        }
    }

    /// Scans the first `count` elements of `data`.
    ///
    /// With `primitive_restart_enabled`, sentinel elements are skipped and
    /// excluded from `vertex_index_count`. A range with no vertex indices is
    /// all zeros.
    #[must_use]
    pub fn compute(
        width: ElementWidth,
        data: &[u8],
        count: usize,
        primitive_restart_enabled: bool,
    ) -> Self {
        let restart = width.restart_index();
        let stride = width.bytes() as usize;
        let mut start = u32::MAX;
        let mut end = 0;
        let mut vertex_index_count = 0;

        for element in data.chunks_exact(stride).take(count) {
            let value = read_index(width, element);
            if primitive_restart_enabled && value == restart {
                continue;
            }
            start = start.min(value);
            end = end.max(value);
            vertex_index_count += 1;
        }

        if vertex_index_count == 0 {
            return Self::default();
        }

        Self {
            start,
            end,
            vertex_index_count,
        }
    }

    /// Infers whether a restart sentinel is present among `count` elements.
    ///
    /// The check is `vertex_index_count < count || end == sentinel`. It can
    /// miss a sentinel that sits inside the draw when the supplied range does
    /// not account for it (for example a range scanned over a different
    /// slice). Callers rely on exactly this behaviour, so it is kept as is.
    #[must_use]
    pub fn has_primitive_restart_index(&self, count: u32, width: ElementWidth) -> bool {
        self.vertex_index_count < count as usize || self.end == width.restart_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_bytes(values: &[u16]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    #[test]
    fn compute_without_restart() {
        let data = u16_bytes(&[4, 9, 2, 65535]);
        let range = IndexRange::compute(ElementWidth::U16, &data, 4, false);
        assert_eq!(range, IndexRange::new(2, 65535, 4));
        assert!(range.has_primitive_restart_index(4, ElementWidth::U16));
    }

    #[test]
    fn compute_with_restart_skips_sentinels() {
        let data = u16_bytes(&[4, 65535, 2]);
        let range = IndexRange::compute(ElementWidth::U16, &data, 3, true);
        assert_eq!(range, IndexRange::new(2, 4, 2));
        assert!(range.has_primitive_restart_index(3, ElementWidth::U16));
    }

    #[test]
    fn compute_respects_count() {
        let data = [3u8, 1, 255];
        let range = IndexRange::compute(ElementWidth::U8, &data, 2, false);
        assert_eq!(range, IndexRange::new(1, 3, 2));
        assert!(!range.has_primitive_restart_index(2, ElementWidth::U8));
    }

    #[test]
    fn all_sentinels_yield_empty_range() {
        let data = [255u8, 255];
        let range = IndexRange::compute(ElementWidth::U8, &data, 2, true);
        assert_eq!(range, IndexRange::default());
        assert!(range.has_primitive_restart_index(2, ElementWidth::U8));
    }

    #[test]
    fn interior_sentinel_missed_by_stale_range() {
        // Range metadata that does not reflect the sentinel is taken at face value.
        let range = IndexRange::new(0, 10, 3);
        assert!(!range.has_primitive_restart_index(3, ElementWidth::U16));
    }
}
