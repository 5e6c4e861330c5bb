//! Host-memory index storage.

use crate::errors::{IndexError, Result};
use crate::format::{BackendClass, ElementWidth};

use super::{IndexBackend, IndexStorage, Serial};

/// Creates [`HostIndexStorage`] objects that report the configured class.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostBackend {
    class: BackendClass,
}

impl HostBackend {
    #[must_use]
    pub fn new(class: BackendClass) -> Self {
        Self { class }
    }
}

impl IndexBackend for HostBackend {
    type Storage = HostIndexStorage;

    fn class(&self) -> BackendClass {
        self.class
    }

    fn create_index_storage(&self, label: &str) -> Result<HostIndexStorage> {
        Ok(HostIndexStorage::new(label))
    }
}

/// Index storage held in a `Vec<u8>`.
///
/// Keeps counters of allocations, discards and maps so callers can observe
/// how much work a translation did.
#[derive(Debug)]
pub struct HostIndexStorage {
    label: String,
    data: Vec<u8>,
    width: Option<ElementWidth>,
    serial: Serial,
    mapped: bool,

    allocation_count: u32,
    discard_count: u32,
    map_count: u32,
}

impl HostIndexStorage {
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            data: Vec::new(),
            width: None,
            serial: Serial::next(),
            mapped: false,
            allocation_count: 0,
            discard_count: 0,
            map_count: 0,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current contents.
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn allocation_count(&self) -> u32 {
        self.allocation_count
    }

    #[must_use]
    pub fn discard_count(&self) -> u32 {
        self.discard_count
    }

    #[must_use]
    pub fn map_count(&self) -> u32 {
        self.map_count
    }
}

impl IndexStorage for HostIndexStorage {
    fn set_buffer_size(&mut self, bytes: u32, width: ElementWidth) -> Result<()> {
        let current = self.data.len() as u32;
        if bytes <= current && self.width == Some(width) {
            return Ok(());
        }

        let size = bytes.max(current) as usize;
        log::debug!("Allocating index storage {:?}: {} -> {} bytes ({:?})", self.label, current, size, width);

        self.data = vec![0u8; size];
        self.width = Some(width);
        self.serial = Serial::next();
        self.allocation_count += 1;
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        if self.mapped {
            return Err(IndexError::StorageFailure(format!("{} discarded while mapped", self.label)));
        }
        self.discard_count += 1;
        Ok(())
    }

    fn map_buffer(&mut self, offset: u32, bytes: u32) -> Result<&mut [u8]> {
        if self.mapped {
            return Err(IndexError::StorageFailure(format!("{} is already mapped", self.label)));
        }

        let start = offset as usize;
        let end = start + bytes as usize;
        if end > self.data.len() {
            return Err(IndexError::StorageFailure(format!(
                "{}: mapping [{start}, {end}) exceeds {} bytes",
                self.label,
                self.data.len()
            )));
        }

        self.mapped = true;
        self.map_count += 1;
        Ok(&mut self.data[start..end])
    }

    fn unmap_buffer(&mut self) -> Result<()> {
        if !self.mapped {
            return Err(IndexError::StorageFailure(format!("{} is not mapped", self.label)));
        }
        self.mapped = false;
        Ok(())
    }

    fn buffer_size(&self) -> u32 {
        self.data.len() as u32
    }

    fn index_width(&self) -> Option<ElementWidth> {
        self.width
    }

    fn serial(&self) -> Serial {
        self.serial
    }
}
