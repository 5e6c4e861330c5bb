//! wgpu-backed index storage.
//!
//! wgpu has no persistent mapping for index buffers that are written every
//! frame, so mapped regions are staged in a host shadow copy and uploaded
//! with `Queue::write_buffer` on unmap. Uploads are widened to the 4-byte
//! copy alignment wgpu requires, which is why the shadow mirrors the whole
//! buffer rather than only the mapped region.

use std::ops::Range;

use crate::errors::{IndexError, Result};
use crate::format::{BackendClass, ElementWidth};

use super::{IndexBackend, IndexStorage, Serial};

const COPY_ALIGNMENT: u32 = wgpu::COPY_BUFFER_ALIGNMENT as u32;

#[inline]
fn align_up(value: u32) -> u32 {
    value.div_ceil(COPY_ALIGNMENT) * COPY_ALIGNMENT
}

/// The wgpu format `width` binds as. 8-bit indices never reach the backend.
fn bindable_format(width: ElementWidth) -> Result<wgpu::IndexFormat> {
    width
        .to_wgpu()
        .ok_or_else(|| IndexError::contract("wgpu has no 8-bit index format"))
}

/// Byte range of the shadow to upload after writing `bytes` at `offset`,
/// widened to copy alignment on both ends. `None` when nothing was written.
fn upload_range(offset: u32, bytes: u32) -> Option<Range<u32>> {
    if bytes == 0 {
        return None;
    }
    let start = offset & !(COPY_ALIGNMENT - 1);
    Some(start..align_up(offset + bytes))
}

/// Creates [`WgpuIndexStorage`] objects on one device.
#[derive(Debug, Clone)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuBackend {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

impl IndexBackend for WgpuBackend {
    type Storage = WgpuIndexStorage;

    /// wgpu always treats the all-ones index of the bound format as a strip cut.
    fn class(&self) -> BackendClass {
        BackendClass::ReservedRestart
    }

    fn create_index_storage(&self, label: &str) -> Result<WgpuIndexStorage> {
        Ok(WgpuIndexStorage {
            label: label.to_string(),
            device: self.device.clone(),
            queue: self.queue.clone(),
            buffer: None,
            shadow: Vec::new(),
            size: 0,
            width: None,
            serial: Serial::next(),
            mapped: None,
        })
    }
}

/// An `INDEX | COPY_DST` buffer plus its host shadow.
pub struct WgpuIndexStorage {
    label: String,
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffer: Option<wgpu::Buffer>,
    shadow: Vec<u8>,
    size: u32,
    width: Option<ElementWidth>,
    serial: Serial,
    /// `(offset, bytes)` of the open mapping
    mapped: Option<(u32, u32)>,
}

impl WgpuIndexStorage {
    /// The GPU buffer to bind, once allocated.
    #[must_use]
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Format to pass to `set_index_buffer`, once allocated.
    #[must_use]
    pub fn index_format(&self) -> Option<wgpu::IndexFormat> {
        self.width.and_then(ElementWidth::to_wgpu)
    }

    fn create_buffer(&self, size: u32) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label),
            size: u64::from(align_up(size).max(COPY_ALIGNMENT)),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }
}

impl IndexStorage for WgpuIndexStorage {
    fn set_buffer_size(&mut self, bytes: u32, width: ElementWidth) -> Result<()> {
        bindable_format(width)?;
        if bytes <= self.size && self.width == Some(width) {
            return Ok(());
        }
        if bytes > u32::MAX - COPY_ALIGNMENT {
            return Err(IndexError::StorageFailure(format!("{}: {bytes} bytes cannot be aligned", self.label)));
        }

        let size = bytes.max(self.size);
        log::debug!("Resizing index buffer {:?} from {} to {} ({:?})", self.label, self.size, size, width);

        self.buffer = Some(self.create_buffer(size));
        self.shadow = vec![0u8; align_up(size) as usize];
        self.size = size;
        self.width = Some(width);
        self.serial = Serial::next();
        Ok(())
    }

    /// Swaps in a fresh buffer; the old one lives until the GPU is done with it.
    fn discard(&mut self) -> Result<()> {
        if self.mapped.is_some() {
            return Err(IndexError::StorageFailure(format!("{} discarded while mapped", self.label)));
        }
        if self.buffer.is_some() {
            self.buffer = Some(self.create_buffer(self.size));
            self.serial = Serial::next();
        }
        Ok(())
    }

    fn map_buffer(&mut self, offset: u32, bytes: u32) -> Result<&mut [u8]> {
        if self.mapped.is_some() {
            return Err(IndexError::StorageFailure(format!("{} is already mapped", self.label)));
        }

        let end = u64::from(offset) + u64::from(bytes);
        if end > u64::from(self.size) {
            return Err(IndexError::StorageFailure(format!(
                "{}: mapping [{offset}, {end}) exceeds {} bytes",
                self.label, self.size
            )));
        }

        self.mapped = Some((offset, bytes));
        Ok(&mut self.shadow[offset as usize..end as usize])
    }

    fn unmap_buffer(&mut self) -> Result<()> {
        let Some((offset, bytes)) = self.mapped.take() else {
            return Err(IndexError::StorageFailure(format!("{} is not mapped", self.label)));
        };
        let Some(range) = upload_range(offset, bytes) else {
            return Ok(());
        };
        let Some(buffer) = &self.buffer else {
            return Err(IndexError::StorageFailure(format!("{} has no allocation", self.label)));
        };

        self.queue.write_buffer(
            buffer,
            u64::from(range.start),
            &self.shadow[range.start as usize..range.end as usize],
        );
        Ok(())
    }

    fn buffer_size(&self) -> u32 {
        self.size
    }

    fn index_width(&self) -> Option<ElementWidth> {
        self.width
    }

    fn serial(&self) -> Serial {
        self.serial
    }
}
