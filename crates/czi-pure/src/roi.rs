//! Strided three-dimensional region copy between byte buffers.
//!
//! Extents and offsets are `[row bytes, rows, planes]`; callers scale the X
//! component by the pixel size before calling.

use crate::error::{Error, Result};

fn volume(extent: [usize; 3]) -> Option<usize> {
    extent[0].checked_mul(extent[1])?.checked_mul(extent[2])
}

fn check_region(
    buf_len: usize,
    extent: [usize; 3],
    offset: [usize; 3],
    region: [usize; 3],
) -> Result<()> {
    let out_of_bounds = || Error::RegionOutOfBounds {
        offset: offset.map(|o| o as i64),
        size: region,
        extent,
    };
    for axis in 0..3 {
        let end = offset[axis]
            .checked_add(region[axis])
            .ok_or_else(out_of_bounds)?;
        if end > extent[axis] {
            return Err(out_of_bounds());
        }
    }
    match volume(extent) {
        Some(needed) if needed <= buf_len => Ok(()),
        _ => Err(out_of_bounds()),
    }
}

/// Copy `region` from `src` at `src_offset` into `dst` at `dst_offset`.
///
/// `src_extent` and `dst_extent` describe the full layout of each buffer.
/// Bytes of `dst` outside the destination region are left untouched.
pub fn copy_roi(
    src: &[u8],
    src_extent: [usize; 3],
    src_offset: [usize; 3],
    dst: &mut [u8],
    dst_extent: [usize; 3],
    dst_offset: [usize; 3],
    region: [usize; 3],
) -> Result<()> {
    check_region(src.len(), src_extent, src_offset, region)?;
    check_region(dst.len(), dst_extent, dst_offset, region)?;

    let row = region[0];
    if row == 0 {
        return Ok(());
    }
    let src_plane = src_extent[0] * src_extent[1];
    let dst_plane = dst_extent[0] * dst_extent[1];
    for z in 0..region[2] {
        let src_z = (src_offset[2] + z) * src_plane;
        let dst_z = (dst_offset[2] + z) * dst_plane;
        for y in 0..region[1] {
            let s = src_z + (src_offset[1] + y) * src_extent[0] + src_offset[0];
            let d = dst_z + (dst_offset[1] + y) * dst_extent[0] + dst_offset[0];
            dst[d..d + row].copy_from_slice(&src[s..s + row]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_tile_into_corner() {
        let src = [1u8, 2, 3, 4];
        let mut dst = [0u8; 16];
        copy_roi(&src, [2, 2, 1], [0; 3], &mut dst, [4, 4, 1], [2, 2, 0], [2, 2, 1]).unwrap();
        #[rustfmt::skip]
        let expected = [
            0, 0, 0, 0,
            0, 0, 0, 0,
            0, 0, 1, 2,
            0, 0, 3, 4,
        ];
        assert_eq!(dst, expected);
    }

    #[test]
    fn bytes_outside_region_untouched() {
        let src: Vec<u8> = (1..=6).collect();
        let mut dst = vec![0xAAu8; 4 * 3 * 2];
        copy_roi(&src, [3, 2, 1], [0; 3], &mut dst, [4, 3, 2], [1, 1, 1], [3, 2, 1]).unwrap();
        for (i, &b) in dst.iter().enumerate() {
            let (x, y, z) = (i % 4, (i / 4) % 3, i / 12);
            if z == 1 && (1..3).contains(&y) && (1..4).contains(&x) {
                let expected = ((y - 1) * 3 + (x - 1) + 1) as u8;
                assert_eq!(b, expected, "inside at {i}");
            } else {
                assert_eq!(b, 0xAA, "outside at {i}");
            }
        }
    }

    #[test]
    fn multi_plane_copy() {
        let src: Vec<u8> = (0..8).collect();
        let mut dst = vec![0u8; 2 * 2 * 3];
        copy_roi(&src, [2, 2, 2], [0; 3], &mut dst, [2, 2, 3], [0, 0, 1], [2, 2, 2]).unwrap();
        assert_eq!(&dst[..4], &[0, 0, 0, 0]);
        assert_eq!(&dst[4..], &[0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn source_offset_selects_sub_region() {
        let src: Vec<u8> = (0..9).collect();
        let mut dst = [0u8; 4];
        copy_roi(&src, [3, 3, 1], [1, 1, 0], &mut dst, [2, 2, 1], [0; 3], [2, 2, 1]).unwrap();
        assert_eq!(dst, [4, 5, 7, 8]);
    }

    #[test]
    fn region_past_destination_rejected() {
        let src = [0u8; 4];
        let mut dst = [0u8; 16];
        let err = copy_roi(&src, [2, 2, 1], [0; 3], &mut dst, [4, 4, 1], [3, 0, 0], [2, 2, 1]);
        assert!(matches!(err, Err(Error::RegionOutOfBounds { .. })));
        assert_eq!(dst, [0u8; 16]);
    }

    #[test]
    fn short_source_rejected() {
        let src = [0u8; 3];
        let mut dst = [0u8; 4];
        let err = copy_roi(&src, [2, 2, 1], [0; 3], &mut dst, [2, 2, 1], [0; 3], [2, 2, 1]);
        assert!(matches!(err, Err(Error::RegionOutOfBounds { .. })));
    }

    #[test]
    fn empty_region_is_noop() {
        let mut dst = [7u8; 4];
        copy_roi(&[], [0, 0, 0], [0; 3], &mut dst, [2, 2, 1], [0; 3], [0, 0, 0]).unwrap();
        assert_eq!(dst, [7u8; 4]);
    }
}
