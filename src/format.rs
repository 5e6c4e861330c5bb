//! Index element widths and the destination format policy.
//!
//! The source API accepts 8-, 16- and 32-bit unsigned indices. The backend
//! only consumes 16- and 32-bit ones, and some backends treat the all-ones
//! value of the bound width as a strip cut no matter what the application
//! asked for. [`resolve_index_format`] decides, per draw, which width the
//! backend must see.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ElementWidth
// ---------------------------------------------------------------------------

/// Width of a single index element.
///
/// Ordering follows the numeric width, so `U8 < U16 < U32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementWidth {
    U8,
    U16,
    U32,
}

/// `(bytes, shift)` per width, indexed by discriminant.
const WIDTH_TABLE: [(u32, u32); 3] = [(1, 0), (2, 1), (4, 2)];

impl ElementWidth {
    pub const ALL: [ElementWidth; 3] = [Self::U8, Self::U16, Self::U32];

    /// Size of one element in bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> u32 {
        WIDTH_TABLE[self as usize].0
    }

    /// `log2(bytes)`, for scaling element counts to byte sizes with a shift.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        WIDTH_TABLE[self as usize].1
    }

    /// The primitive restart sentinel: the largest value representable at this width.
    #[inline]
    #[must_use]
    pub const fn restart_index(self) -> u32 {
        match self {
            Self::U8 => u8::MAX as u32,
            Self::U16 => u16::MAX as u32,
            Self::U32 => u32::MAX,
        }
    }

    /// Largest element count whose byte size still fits in a `u32`.
    #[inline]
    #[must_use]
    pub const fn max_count(self) -> u32 {
        u32::MAX >> self.shift()
    }

    /// Whether `offset` is a multiple of the element size.
    #[inline]
    #[must_use]
    pub const fn is_aligned(self, offset: u32) -> bool {
        offset & (self.bytes() - 1) == 0
    }

    #[must_use]
    pub fn from_bytes(bytes: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.bytes() == bytes)
    }

    /// The matching wgpu index format. `U8` has none.
    #[must_use]
    pub fn to_wgpu(self) -> Option<wgpu::IndexFormat> {
        match self {
            Self::U8 => None,
            Self::U16 => Some(wgpu::IndexFormat::Uint16),
            Self::U32 => Some(wgpu::IndexFormat::Uint32),
        }
    }

    #[must_use]
    pub fn from_wgpu(format: wgpu::IndexFormat) -> Self {
        match format {
            wgpu::IndexFormat::Uint16 => Self::U16,
            wgpu::IndexFormat::Uint32 => Self::U32,
        }
    }
}

// ---------------------------------------------------------------------------
// BackendClass
// ---------------------------------------------------------------------------

/// Restart behaviour of the destination backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BackendClass {
    /// Restart only happens when the application enables it.
    Basic,

    /// The all-ones index of the bound width always cuts strips, so a real
    /// 16-bit `0xFFFF` vertex index would be misread as a restart.
    #[default]
    ReservedRestart,
}

impl BackendClass {
    #[inline]
    #[must_use]
    pub fn requires_restart_workaround(self) -> bool {
        matches!(self, Self::ReservedRestart)
    }
}

// ---------------------------------------------------------------------------
// Format policy
// ---------------------------------------------------------------------------

/// Outcome of [`resolve_index_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexFormatDecision {
    pub destination: ElementWidth,
    /// Indices are widened so application data no longer aliases the
    /// backend's reserved restart value.
    pub restart_workaround: bool,
}

impl IndexFormatDecision {
    /// Whether conversion must rewrite source sentinels to the destination sentinel.
    ///
    /// True under the restart workaround, and when fixed-index restart is
    /// enabled across a width change (an 8-bit `0xFF` cut must stay a cut at 16 bits).
    #[inline]
    #[must_use]
    pub fn remaps_restart(&self, source: ElementWidth, fixed_restart_enabled: bool) -> bool {
        self.restart_workaround || (fixed_restart_enabled && self.destination != source)
    }
}

/// The restart workaround condition without the per-draw sentinel scan.
///
/// 32-bit sources never need it: the largest usable element index is capped
/// below `u32::MAX`.
#[inline]
#[must_use]
pub fn use_primitive_restart_workaround(
    fixed_restart_enabled: bool,
    source: ElementWidth,
    backend: BackendClass,
) -> bool {
    !fixed_restart_enabled && source == ElementWidth::U16 && backend.requires_restart_workaround()
}

/// Decides the destination width for a draw.
///
/// `restart_present` comes from the caller's pre-scan of the index range
/// (see [`IndexRange::has_primitive_restart_index`](crate::range::IndexRange::has_primitive_restart_index)).
#[must_use]
pub fn resolve_index_format(
    source: ElementWidth,
    fixed_restart_enabled: bool,
    backend: BackendClass,
    restart_present: bool,
) -> IndexFormatDecision {
    if source == ElementWidth::U8 {
        return IndexFormatDecision {
            destination: ElementWidth::U16,
            restart_workaround: false,
        };
    }

    let restart_workaround =
        use_primitive_restart_workaround(fixed_restart_enabled, source, backend) && restart_present;

    let destination = if source == ElementWidth::U32 || restart_workaround {
        ElementWidth::U32
    } else {
        ElementWidth::U16
    };

    IndexFormatDecision {
        destination,
        restart_workaround,
    }
}
