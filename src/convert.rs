//! Element-wise index conversion.
//!
//! Same-width conversion is a plain byte copy. Widening goes element by
//! element and can rewrite the source restart sentinel into the destination
//! one. Narrowing is never produced by the format policy and is rejected as a
//! contract violation.
//!
//! Source and destination slices carry no alignment guarantee (immediate
//! index pointers and mapped regions can start anywhere), so elements are
//! read and written unaligned.

use bytemuck::Pod;

use crate::errors::{IndexError, Result};
use crate::format::ElementWidth;

/// Byte size of `count` elements at `width`, or [`IndexError::CapacityExceeded`].
pub fn checked_byte_size(count: u32, width: ElementWidth) -> Result<u32> {
    if count > width.max_count() {
        return Err(IndexError::CapacityExceeded {
            count,
            element_size: width.bytes(),
        });
    }
    Ok(count << width.shift())
}

/// Reads one element of `width` from the front of `bytes`.
#[inline]
pub(crate) fn read_index(width: ElementWidth, bytes: &[u8]) -> u32 {
    match width {
        ElementWidth::U8 => u32::from(bytes[0]),
        ElementWidth::U16 => u32::from(bytemuck::pod_read_unaligned::<u16>(&bytes[..2])),
        ElementWidth::U32 => bytemuck::pod_read_unaligned::<u32>(&bytes[..4]),
    }
}

trait IndexElement: Pod + PartialEq {
    const RESTART: Self;
}

impl IndexElement for u8 {
    const RESTART: Self = u8::MAX;
}

impl IndexElement for u16 {
    const RESTART: Self = u16::MAX;
}

impl IndexElement for u32 {
    const RESTART: Self = u32::MAX;
}

fn widen<S, D>(input: &[u8], output: &mut [u8], count: usize, remap_restart: bool)
where
    S: IndexElement,
    D: IndexElement + From<S>,
{
    let src = input.chunks_exact(size_of::<S>());
    let dst = output.chunks_exact_mut(size_of::<D>());

    for (src, dst) in src.zip(dst).take(count) {
        let value: S = bytemuck::pod_read_unaligned(src);
        let out = if remap_restart && value == S::RESTART {
            D::RESTART
        } else {
            D::from(value)
        };
        dst.copy_from_slice(bytemuck::bytes_of(&out));
    }
}

/// Converts `count` indices from `source` to `destination` width.
///
/// `input` must hold at least `count` source elements and `output` at least
/// `count` destination elements. With `remap_restart`, every source element
/// equal to the source sentinel becomes the destination sentinel.
pub fn convert_indices(
    source: ElementWidth,
    destination: ElementWidth,
    input: &[u8],
    count: u32,
    output: &mut [u8],
    remap_restart: bool,
) -> Result<()> {
    let count = count as usize;
    let src_len = count << source.shift();
    let dst_len = count << destination.shift();

    if input.len() < src_len {
        return Err(IndexError::contract("index input shorter than element count"));
    }
    if output.len() < dst_len {
        return Err(IndexError::contract("index output shorter than element count"));
    }

    match (source, destination) {
        _ if source == destination => {
            output[..dst_len].copy_from_slice(&input[..src_len]);
        }
        (ElementWidth::U8, ElementWidth::U16) => widen::<u8, u16>(input, output, count, remap_restart),
        (ElementWidth::U8, ElementWidth::U32) => widen::<u8, u32>(input, output, count, remap_restart),
        (ElementWidth::U16, ElementWidth::U32) => {
            widen::<u16, u32>(input, output, count, remap_restart);
        }
        _ => return Err(IndexError::contract("index conversion would narrow")),
    }

    Ok(())
}

/// [`convert_indices`] into a freshly allocated buffer.
pub fn convert_to_vec(
    source: ElementWidth,
    destination: ElementWidth,
    input: &[u8],
    count: u32,
    remap_restart: bool,
) -> Result<Vec<u8>> {
    let size = checked_byte_size(count, destination)?;
    let mut output = vec![0u8; size as usize];
    convert_indices(source, destination, input, count, &mut output, remap_restart)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_width_is_byte_copy() {
        let input: Vec<u8> = (0u8..=15).collect();
        for width in ElementWidth::ALL {
            let count = 16 >> width.shift();
            let out = convert_to_vec(width, width, &input, count, true).unwrap();
            assert_eq!(out, input);
        }
    }

    #[test]
    fn widen_u8_to_u16_plain() {
        let out = convert_to_vec(ElementWidth::U8, ElementWidth::U16, &[0, 1, 2, 255], 4, false).unwrap();
        let values: Vec<u16> = bytemuck::pod_collect_to_vec(&out);
        assert_eq!(values, [0, 1, 2, 255]);
    }

    #[test]
    fn widen_u8_to_u16_remapped() {
        let out = convert_to_vec(ElementWidth::U8, ElementWidth::U16, &[0, 255, 7], 3, true).unwrap();
        let values: Vec<u16> = bytemuck::pod_collect_to_vec(&out);
        assert_eq!(values, [0, 65535, 7]);
    }

    #[test]
    fn widen_u16_to_u32_remapped() {
        let input: Vec<u8> = bytemuck::cast_slice(&[5u16, 65535, 7]).to_vec();
        let out = convert_to_vec(ElementWidth::U16, ElementWidth::U32, &input, 3, true).unwrap();
        let values: Vec<u32> = bytemuck::pod_collect_to_vec(&out);
        assert_eq!(values, [5, u32::MAX, 7]);
    }

    #[test]
    fn widen_u16_to_u32_keeps_value_without_remap() {
        let input: Vec<u8> = bytemuck::cast_slice(&[65535u16, 1]).to_vec();
        let out = convert_to_vec(ElementWidth::U16, ElementWidth::U32, &input, 2, false).unwrap();
        let values: Vec<u32> = bytemuck::pod_collect_to_vec(&out);
        assert_eq!(values, [65535, 1]);
    }

    #[test]
    fn unaligned_input_and_output() {
        let input = [0u8, 0x34, 0x12, 0xFF, 0xFF];
        let mut output = [0u8; 9];
        convert_indices(ElementWidth::U16, ElementWidth::U32, &input[1..], 2, &mut output[1..], true).unwrap();
        assert_eq!(read_index(ElementWidth::U32, &output[1..5]), u32::from(u16::from_ne_bytes([0x34, 0x12])));
        assert_eq!(read_index(ElementWidth::U32, &output[5..9]), u32::MAX);
    }

    #[test]
    fn zero_count_is_noop() {
        let out = convert_to_vec(ElementWidth::U16, ElementWidth::U32, &[], 0, true).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn capacity_check() {
        assert_eq!(checked_byte_size(3, ElementWidth::U32).unwrap(), 12);
        assert!(checked_byte_size(u32::MAX >> 2, ElementWidth::U32).is_ok());
        let err = checked_byte_size((u32::MAX >> 2) + 1, ElementWidth::U32).unwrap_err();
        assert!(matches!(err, IndexError::CapacityExceeded { element_size: 4, .. }));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "contract violation")]
    fn narrowing_aborts_in_debug() {
        let _ = convert_to_vec(ElementWidth::U32, ElementWidth::U16, &[0; 4], 1, false);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn narrowing_is_a_contract_violation() {
        let err = convert_to_vec(ElementWidth::U32, ElementWidth::U16, &[0; 4], 1, false).unwrap_err();
        assert!(matches!(err, IndexError::ContractViolation(_)));
    }
}
