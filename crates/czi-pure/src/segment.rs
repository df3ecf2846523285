//! Fixed-layout segment structures of a ZISRAW container.
//!
//! Each structure is decoded field by field from a byte slice and encoded
//! back the same way. Sizes below are the on-disk sizes with no padding.

use uuid::Uuid;

use crate::endian::{
    read_f32_le, read_i32_le, read_i64_le, trim_nul, write_f32_le, write_i32_le, write_i64_le,
};
use crate::error::{Error, Result};

/// Size of the header that precedes every segment.
pub const SEGMENT_HEADER_SIZE: usize = 32;

/// Length of the NUL-padded id field at the start of a segment header.
pub const SEGMENT_ID_LEN: usize = 16;

/// Bytes of the file header segment data that carry fields.
pub const FILE_HEADER_SIZE: usize = 80;

/// Fixed part of the directory segment (entry count plus reserved bytes).
pub const DIRECTORY_SEGMENT_SIZE: usize = 128;

/// Fixed part of one directory entry, before its dimension records.
pub const DIRECTORY_ENTRY_SIZE: usize = 32;

/// Size of one dimension record attached to a directory entry.
pub const DIMENSION_ENTRY_SIZE: usize = 20;

/// Upper bound on dimension records per entry, one per axis key.
pub const MAX_DIMENSIONS: usize = 128;

/// Size fields at the start of a sub-block segment.
pub const SUB_BLOCK_FIELDS_SIZE: usize = 16;

/// Size of the fixed sub-block header that follows the segment header.
/// The metadata section starts right after it, then the pixel data.
pub const SUB_BLOCK_HEADER_SIZE: usize = 256;

/// Known segment ids.
pub mod ids {
    pub const FILE: &str = "ZISRAWFILE";
    pub const DIRECTORY: &str = "ZISRAWDIRECTORY";
    pub const SUB_BLOCK: &str = "ZISRAWSUBBLOCK";
    pub const METADATA: &str = "ZISRAWMETADATA";
    pub const ATTACHMENT: &str = "ZISRAWATTACH";
    pub const ATTACHMENT_DIRECTORY: &str = "ZISRAWATTDIR";
    pub const DELETED: &str = "DELETED";
}

// ---------------------------------------------------------------------------
// Segment header
// ---------------------------------------------------------------------------

/// Header preceding every segment: a type tag and the segment sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    /// NUL-terminated ASCII id, at most 15 characters.
    pub id: [u8; SEGMENT_ID_LEN],
    /// Bytes reserved for the segment data.
    pub allocated_size: i64,
    /// Bytes of the segment data currently in use.
    pub used_size: i64,
}

impl SegmentHeader {
    /// Build a header whose allocated and used sizes are both `size`.
    ///
    /// Ids longer than 15 bytes are truncated so the terminator always fits.
    pub fn new(id: &str, size: i64) -> Self {
        let mut raw = [0u8; SEGMENT_ID_LEN];
        let bytes = id.as_bytes();
        let len = bytes.len().min(SEGMENT_ID_LEN - 1);
        raw[..len].copy_from_slice(&bytes[..len]);
        SegmentHeader {
            id: raw,
            allocated_size: size,
            used_size: size,
        }
    }

    /// The id with its NUL padding removed.
    pub fn id_str(&self) -> String {
        String::from_utf8_lossy(trim_nul(&self.id)).into_owned()
    }

    /// Fails with [`Error::InvalidSegmentId`] unless the id equals `expected`.
    pub fn expect_id(&self, expected: &'static str) -> Result<()> {
        if trim_nul(&self.id) == expected.as_bytes() {
            Ok(())
        } else {
            Err(Error::InvalidSegmentId {
                expected,
                found: self.id_str(),
            })
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < SEGMENT_HEADER_SIZE {
            return Err(Error::UnexpectedEof);
        }
        let mut id = [0u8; SEGMENT_ID_LEN];
        id.copy_from_slice(&buf[..SEGMENT_ID_LEN]);
        Ok(SegmentHeader {
            id,
            allocated_size: read_i64_le(&buf[16..]),
            used_size: read_i64_le(&buf[24..]),
        })
    }

    pub fn encode(&self) -> [u8; SEGMENT_HEADER_SIZE] {
        let mut buf = [0u8; SEGMENT_HEADER_SIZE];
        buf[..SEGMENT_ID_LEN].copy_from_slice(&self.id);
        write_i64_le(&mut buf[16..], self.allocated_size);
        write_i64_le(&mut buf[24..], self.used_size);
        buf
    }
}

// ---------------------------------------------------------------------------
// File header
// ---------------------------------------------------------------------------

/// Contents of the `ZISRAWFILE` segment at offset 0.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub version_major: i32,
    pub version_minor: i32,
    /// GUID of the master file in a multi-part set.
    pub primary_file_guid: Uuid,
    /// GUID of this file.
    pub file_guid: Uuid,
    /// Part number in multi-file containers.
    pub file_part: i32,
    /// Absolute offset of the directory segment.
    pub directory_position: i64,
    /// Absolute offset of the metadata segment, 0 if absent.
    pub metadata_position: i64,
    /// Set while a writer is updating the directory or metadata.
    pub update_pending: bool,
    /// Absolute offset of the attachment directory segment, 0 if absent.
    pub attachment_directory_position: i64,
}

impl Default for FileHeader {
    fn default() -> Self {
        FileHeader {
            version_major: 1,
            version_minor: 0,
            primary_file_guid: Uuid::nil(),
            file_guid: Uuid::nil(),
            file_part: 0,
            directory_position: 0,
            metadata_position: 0,
            update_pending: false,
            attachment_directory_position: 0,
        }
    }
}

fn read_guid(buf: &[u8]) -> Uuid {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&buf[..16]);
    Uuid::from_bytes_le(bytes)
}

impl FileHeader {
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < FILE_HEADER_SIZE {
            return Err(Error::UnexpectedEof);
        }
        // Bytes 8..16 are two reserved i32 fields.
        Ok(FileHeader {
            version_major: read_i32_le(&buf[0..]),
            version_minor: read_i32_le(&buf[4..]),
            primary_file_guid: read_guid(&buf[16..]),
            file_guid: read_guid(&buf[32..]),
            file_part: read_i32_le(&buf[48..]),
            directory_position: read_i64_le(&buf[52..]),
            metadata_position: read_i64_le(&buf[60..]),
            update_pending: read_i32_le(&buf[68..]) != 0,
            attachment_directory_position: read_i64_le(&buf[72..]),
        })
    }

    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        write_i32_le(&mut buf[0..], self.version_major);
        write_i32_le(&mut buf[4..], self.version_minor);
        buf[16..32].copy_from_slice(&self.primary_file_guid.to_bytes_le());
        buf[32..48].copy_from_slice(&self.file_guid.to_bytes_le());
        write_i32_le(&mut buf[48..], self.file_part);
        write_i64_le(&mut buf[52..], self.directory_position);
        write_i64_le(&mut buf[60..], self.metadata_position);
        write_i32_le(&mut buf[68..], if self.update_pending { -1 } else { 0 });
        write_i64_le(&mut buf[72..], self.attachment_directory_position);
        buf
    }
}

// ---------------------------------------------------------------------------
// Directory entries
// ---------------------------------------------------------------------------

/// One dimension record of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionEntry {
    /// Axis identifier; only the first byte is meaningful.
    pub identifier: [u8; 4],
    /// Start index along the axis. May be negative.
    pub start: i32,
    /// Logical size in pixels. Must be positive.
    pub size: i32,
    /// Physical start coordinate, informational only.
    pub start_coordinate: f32,
    /// Stored size when sub-sampled, else 0.
    pub stored_size: i32,
}

impl DimensionEntry {
    /// A record for axis `key` without physical coordinates.
    pub fn new(key: u8, start: i32, size: i32) -> Self {
        DimensionEntry {
            identifier: [key, 0, 0, 0],
            start,
            size,
            start_coordinate: 0.0,
            stored_size: 0,
        }
    }

    /// The axis key (first identifier byte).
    pub fn key(&self) -> u8 {
        self.identifier[0]
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < DIMENSION_ENTRY_SIZE {
            return Err(Error::UnexpectedEof);
        }
        let mut identifier = [0u8; 4];
        identifier.copy_from_slice(&buf[..4]);
        Ok(DimensionEntry {
            identifier,
            start: read_i32_le(&buf[4..]),
            size: read_i32_le(&buf[8..]),
            start_coordinate: read_f32_le(&buf[12..]),
            stored_size: read_i32_le(&buf[16..]),
        })
    }

    pub fn encode(&self) -> [u8; DIMENSION_ENTRY_SIZE] {
        let mut buf = [0u8; DIMENSION_ENTRY_SIZE];
        buf[..4].copy_from_slice(&self.identifier);
        write_i32_le(&mut buf[4..], self.start);
        write_i32_le(&mut buf[8..], self.size);
        write_f32_le(&mut buf[12..], self.start_coordinate);
        write_i32_le(&mut buf[16..], self.stored_size);
        buf
    }
}

/// A "DV" directory entry locating one sub-block and its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub schema_type: [u8; 2],
    /// Pixel type code, see [`crate::image::PixelType`].
    pub pixel_type: i32,
    /// Absolute offset of the sub-block segment.
    pub file_position: i64,
    pub file_part: i32,
    /// Compression code; 0 is uncompressed.
    pub compression: i32,
    pub pyramid_type: u8,
    /// Dimension records in file order.
    pub dimensions: Vec<DimensionEntry>,
}

impl DirectoryEntry {
    /// Decode the fixed 32-byte part, returning the entry (without
    /// dimensions) and the number of dimension records that follow.
    pub fn decode_fixed(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < DIRECTORY_ENTRY_SIZE {
            return Err(Error::UnexpectedEof);
        }
        let dimension_count = read_i32_le(&buf[28..]);
        if dimension_count < 1 {
            return Err(Error::InvalidDimension("entry has no dimension records"));
        }
        if dimension_count as usize > MAX_DIMENSIONS {
            return Err(Error::InvalidDimension("too many dimension records"));
        }
        let entry = DirectoryEntry {
            schema_type: [buf[0], buf[1]],
            pixel_type: read_i32_le(&buf[2..]),
            file_position: read_i64_le(&buf[6..]),
            file_part: read_i32_le(&buf[14..]),
            compression: read_i32_le(&buf[18..]),
            pyramid_type: buf[22],
            dimensions: Vec::new(),
        };
        Ok((entry, dimension_count as usize))
    }

    /// On-disk size of this entry including its dimension records.
    pub fn byte_len(&self) -> usize {
        DIRECTORY_ENTRY_SIZE + self.dimensions.len() * DIMENSION_ENTRY_SIZE
    }

    /// The first dimension record for axis `key`, if any.
    pub fn dimension(&self, key: u8) -> Option<&DimensionEntry> {
        self.dimensions.iter().find(|d| d.key() == key)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.byte_len()];
        buf[..2].copy_from_slice(&self.schema_type);
        write_i32_le(&mut buf[2..], self.pixel_type);
        write_i64_le(&mut buf[6..], self.file_position);
        write_i32_le(&mut buf[14..], self.file_part);
        write_i32_le(&mut buf[18..], self.compression);
        buf[22] = self.pyramid_type;
        write_i32_le(&mut buf[28..], self.dimensions.len() as i32);
        for (i, dim) in self.dimensions.iter().enumerate() {
            let at = DIRECTORY_ENTRY_SIZE + i * DIMENSION_ENTRY_SIZE;
            buf[at..at + DIMENSION_ENTRY_SIZE].copy_from_slice(&dim.encode());
        }
        buf
    }
}

// ---------------------------------------------------------------------------
// Sub-block
// ---------------------------------------------------------------------------

/// Size fields at the start of a `ZISRAWSUBBLOCK` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubBlockHeader {
    pub metadata_size: i32,
    pub attachment_size: i32,
    pub data_size: i64,
}

impl SubBlockHeader {
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < SUB_BLOCK_FIELDS_SIZE {
            return Err(Error::UnexpectedEof);
        }
        Ok(SubBlockHeader {
            metadata_size: read_i32_le(&buf[0..]),
            attachment_size: read_i32_le(&buf[4..]),
            data_size: read_i64_le(&buf[8..]),
        })
    }

    pub fn encode(&self) -> [u8; SUB_BLOCK_FIELDS_SIZE] {
        let mut buf = [0u8; SUB_BLOCK_FIELDS_SIZE];
        write_i32_le(&mut buf[0..], self.metadata_size);
        write_i32_le(&mut buf[4..], self.attachment_size);
        write_i64_le(&mut buf[8..], self.data_size);
        buf
    }
}
