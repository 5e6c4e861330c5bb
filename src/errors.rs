//! Error Types
//!
//! This module defines the error types used throughout the index translation layer.
//!
//! # Overview
//!
//! The main error type [`IndexError`] covers all failure modes including:
//! - Capacity overflow when sizing a translated index allocation
//! - Source buffers whose content cannot be read back
//! - Backend storage objects that fail to allocate, map or unmap
//! - Caller contract violations (unsupported widths, narrowing requests)
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, IndexError>`.
//!
//! ```rust,ignore
//! use index_bridge::errors::{IndexError, Result};
//!
//! fn translate() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```
//!
//! Nothing in this crate retries. Every error surfaces synchronously on the
//! call that caused it.

use thiserror::Error;

/// The main error type for index translation.
#[derive(Error, Debug)]
pub enum IndexError {
    // ========================================================================
    // Sizing Errors
    // ========================================================================
    /// `count` elements of `element_size` bytes do not fit the addressable
    /// byte range of an index buffer.
    #[error("Reserving {count} indices of {element_size} bytes each exceeds the maximum buffer size")]
    CapacityExceeded {
        /// Requested element count
        count: u32,
        /// Destination element size in bytes
        element_size: u32,
    },

    /// A buffer-backed draw references bytes past the end of its buffer.
    #[error("Index range [{offset}, {offset} + {bytes}) exceeds buffer size {buffer_size}")]
    RangeOutOfBounds {
        /// Byte offset of the first index
        offset: u32,
        /// Byte length of the referenced range
        bytes: u64,
        /// Size of the source buffer in bytes
        buffer_size: u32,
    },

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// The source buffer could not produce a readable byte view.
    #[error("Failed to read source index data: {0}")]
    SourceReadFailure(String),

    /// A backend storage object failed an allocation, map or unmap.
    #[error("Index storage error: {0}")]
    StorageFailure(String),

    // ========================================================================
    // Caller Bugs
    // ========================================================================
    /// An unreachable width combination or a malformed request reached the
    /// translator. Indicates a bug in the caller, not a runtime condition.
    #[error("Contract violation: {0}")]
    ContractViolation(&'static str),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings could not be parsed.
    #[error("Settings parse error: {0}")]
    Config(#[from] serde_json::Error),
}

impl IndexError {
    /// Builds a [`ContractViolation`](Self::ContractViolation).
    ///
    /// Debug builds abort here; release builds hand the typed error back to
    /// the caller.
    #[track_caller]
    pub(crate) fn contract(message: &'static str) -> Self {
        if cfg!(debug_assertions) {
            panic!("contract violation: {message}");
        }
        IndexError::ContractViolation(message)
    }
}

/// Alias for `Result<T, IndexError>`.
pub type Result<T> = std::result::Result<T, IndexError>;
