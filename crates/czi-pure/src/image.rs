//! Pixel types and typed views of reconstructed buffers.
//!
//! The compositor works on raw bytes; this module maps the directory's pixel
//! type codes to pixel sizes and decodes finished buffers into typed vectors.

use bytemuck::pod_collect_to_vec;

use crate::error::{Error, Result};

/// Pixel type of a sub-block, as coded in its directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// Code 0: 8-bit unsigned grayscale.
    Gray8,
    /// Code 1: 16-bit unsigned grayscale.
    Gray16,
    /// Code 2: 32-bit float grayscale.
    Gray32Float,
}

impl PixelType {
    /// Map a directory pixel type code, rejecting anything but 0, 1 and 2.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(PixelType::Gray8),
            1 => Ok(PixelType::Gray16),
            2 => Ok(PixelType::Gray32Float),
            other => Err(Error::InvalidPixelType(other)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            PixelType::Gray8 => 0,
            PixelType::Gray16 => 1,
            PixelType::Gray32Float => 2,
        }
    }

    /// Returns the number of bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelType::Gray8 => 1,
            PixelType::Gray16 => 2,
            PixelType::Gray32Float => 4,
        }
    }
}

impl core::fmt::Display for PixelType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            PixelType::Gray8 => "Gray8",
            PixelType::Gray16 => "Gray16",
            PixelType::Gray32Float => "Gray32Float",
        };
        f.write_str(name)
    }
}

/// Pixel values of a reconstructed buffer, typed by [`PixelType`].
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    Gray8(Vec<u8>),
    Gray16(Vec<u16>),
    Gray32Float(Vec<f32>),
}

impl PixelData {
    pub fn len(&self) -> usize {
        match self {
            PixelData::Gray8(v) => v.len(),
            PixelData::Gray16(v) => v.len(),
            PixelData::Gray32Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode a little-endian pixel buffer into native-endian typed values.
pub fn decode_pixels(raw: &[u8], pixel_type: PixelType) -> Result<PixelData> {
    if !raw.len().is_multiple_of(pixel_type.bytes_per_pixel()) {
        return Err(Error::UnexpectedEof);
    }
    match pixel_type {
        PixelType::Gray8 => Ok(PixelData::Gray8(raw.to_vec())),
        PixelType::Gray16 => {
            // Collect into an aligned Vec<u16>, then swap to native order in place.
            let mut pixels: Vec<u16> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = u16::from_le(*v);
            }
            Ok(PixelData::Gray16(pixels))
        }
        PixelType::Gray32Float => {
            let mut pixels: Vec<f32> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = f32::from_bits(u32::from_le(v.to_bits()));
            }
            Ok(PixelData::Gray32Float(pixels))
        }
    }
}

/// A reconstructed volume shaped `[z, y, x]`.
#[cfg(feature = "array")]
#[derive(Debug, Clone, PartialEq)]
pub enum PixelArray {
    Gray8(ndarray::Array3<u8>),
    Gray16(ndarray::Array3<u16>),
    Gray32Float(ndarray::Array3<f32>),
}

#[cfg(feature = "array")]
impl PixelData {
    /// Shape the pixels as a `[z, y, x]` array for a volume of `extent`
    /// (`[x, y, z]` pixels).
    pub fn into_array(self, extent: [usize; 3]) -> Result<PixelArray> {
        let shape = (extent[2], extent[1], extent[0]);
        let bad_shape = |_| Error::InvalidDimension("pixel count does not match extent");
        match self {
            PixelData::Gray8(v) => ndarray::Array3::from_shape_vec(shape, v)
                .map(PixelArray::Gray8)
                .map_err(bad_shape),
            PixelData::Gray16(v) => ndarray::Array3::from_shape_vec(shape, v)
                .map(PixelArray::Gray16)
                .map_err(bad_shape),
            PixelData::Gray32Float(v) => ndarray::Array3::from_shape_vec(shape, v)
                .map(PixelArray::Gray32Float)
                .map_err(bad_shape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_size_from_code() {
        assert_eq!(PixelType::from_code(0).unwrap().bytes_per_pixel(), 1);
        assert_eq!(PixelType::from_code(1).unwrap().bytes_per_pixel(), 2);
        assert_eq!(PixelType::from_code(2).unwrap().bytes_per_pixel(), 4);
    }

    #[test]
    fn unknown_codes_rejected() {
        for code in [-1, 3, 4, 8, 12, i32::MAX] {
            assert!(matches!(
                PixelType::from_code(code),
                Err(Error::InvalidPixelType(c)) if c == code
            ));
        }
    }

    #[test]
    fn code_round_trips() {
        for pt in [PixelType::Gray8, PixelType::Gray16, PixelType::Gray32Float] {
            assert_eq!(PixelType::from_code(pt.code()).unwrap(), pt);
        }
    }

    #[test]
    fn decode_gray16_little_endian() {
        let raw = [0x01, 0x00, 0x00, 0x01, 0xFF, 0xFF];
        let data = decode_pixels(&raw, PixelType::Gray16).unwrap();
        assert_eq!(data, PixelData::Gray16(vec![1, 256, u16::MAX]));
    }

    #[test]
    fn decode_gray32_float() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&1.5f32.to_le_bytes());
        raw.extend_from_slice(&(-2.0f32).to_le_bytes());
        let data = decode_pixels(&raw, PixelType::Gray32Float).unwrap();
        assert_eq!(data, PixelData::Gray32Float(vec![1.5, -2.0]));
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn decode_rejects_partial_pixel() {
        assert!(decode_pixels(&[0, 1, 2], PixelType::Gray16).is_err());
    }

    #[test]
    fn display_names() {
        assert_eq!(PixelType::Gray16.to_string(), "Gray16");
    }

    #[cfg(feature = "array")]
    #[test]
    fn into_array_is_z_y_x() {
        let data = PixelData::Gray8((0..12).collect());
        match data.into_array([3, 2, 2]).unwrap() {
            PixelArray::Gray8(arr) => {
                assert_eq!(arr.shape(), &[2, 2, 3]);
                assert_eq!(arr[[1, 0, 2]], 8);
            }
            other => panic!("expected Gray8, got {other:?}"),
        }
    }
}
