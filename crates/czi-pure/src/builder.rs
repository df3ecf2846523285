//! Writer for minimal, uncompressed ZISRAW containers.
//!
//! Produces a file header segment, one sub-block segment per pushed block
//! and a trailing directory segment. Useful for fixtures and for exporting
//! synthetic data in a layout any reader of the format accepts.

use std::io::Write;

use crate::endian::write_i32_le;
use crate::segment::{
    ids, DimensionEntry, DirectoryEntry, FileHeader, SegmentHeader, SubBlockHeader,
    DIRECTORY_SEGMENT_SIZE, FILE_HEADER_SIZE, SEGMENT_HEADER_SIZE, SUB_BLOCK_FIELDS_SIZE,
    SUB_BLOCK_HEADER_SIZE,
};

/// Space reserved for the file header segment data.
const FILE_HEADER_ALLOCATION: usize = 512;

/// One sub-block to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct SubBlockSpec {
    pub pixel_type: i32,
    pub compression: i32,
    pub dimensions: Vec<DimensionEntry>,
    pub metadata: Vec<u8>,
    pub data: Vec<u8>,
}

impl SubBlockSpec {
    pub fn new(pixel_type: i32, dimensions: Vec<DimensionEntry>, data: Vec<u8>) -> Self {
        SubBlockSpec {
            pixel_type,
            compression: 0,
            dimensions,
            metadata: Vec::new(),
            data,
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<u8>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_compression(mut self, compression: i32) -> Self {
        self.compression = compression;
        self
    }

    fn entry(&self, file_position: i64) -> DirectoryEntry {
        DirectoryEntry {
            schema_type: *b"DV",
            pixel_type: self.pixel_type,
            file_position,
            file_part: 0,
            compression: self.compression,
            pyramid_type: 0,
            dimensions: self.dimensions.clone(),
        }
    }
}

/// Accumulates sub-blocks and serializes them as one container.
#[derive(Debug, Clone, Default)]
pub struct ContainerBuilder {
    header: FileHeader,
    blocks: Vec<SubBlockSpec>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: SubBlockSpec) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn update_pending(&mut self, pending: bool) -> &mut Self {
        self.header.update_pending = pending;
        self
    }

    pub fn file_guid(&mut self, guid: uuid::Uuid) -> &mut Self {
        self.header.file_guid = guid;
        self.header.primary_file_guid = guid;
        self
    }

    /// Serialize the container into a byte vector.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&SegmentHeader::new(ids::FILE, FILE_HEADER_ALLOCATION as i64).encode());
        out.resize(SEGMENT_HEADER_SIZE + FILE_HEADER_ALLOCATION, 0);

        let mut entries = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            let entry = block.entry(out.len() as i64);
            let segment_len = SUB_BLOCK_HEADER_SIZE + block.metadata.len() + block.data.len();

            out.extend_from_slice(&SegmentHeader::new(ids::SUB_BLOCK, segment_len as i64).encode());
            let segment_start = out.len();
            let fields = SubBlockHeader {
                metadata_size: block.metadata.len() as i32,
                attachment_size: 0,
                data_size: block.data.len() as i64,
            };
            out.extend_from_slice(&fields.encode());
            // The entry copy is cut off where the fixed header ends.
            let copy = entry.encode();
            let copy_len = copy.len().min(SUB_BLOCK_HEADER_SIZE - SUB_BLOCK_FIELDS_SIZE);
            out.extend_from_slice(&copy[..copy_len]);
            out.resize(segment_start + SUB_BLOCK_HEADER_SIZE, 0);
            out.extend_from_slice(&block.metadata);
            out.extend_from_slice(&block.data);
            entries.push(entry);
        }

        let directory_position = out.len();
        let entries_len: usize = entries.iter().map(DirectoryEntry::byte_len).sum();
        let directory_len = DIRECTORY_SEGMENT_SIZE + entries_len;
        out.extend_from_slice(&SegmentHeader::new(ids::DIRECTORY, directory_len as i64).encode());
        let mut fixed = [0u8; DIRECTORY_SEGMENT_SIZE];
        write_i32_le(&mut fixed, entries.len() as i32);
        out.extend_from_slice(&fixed);
        for entry in &entries {
            out.extend_from_slice(&entry.encode());
        }

        let header = FileHeader {
            directory_position: directory_position as i64,
            ..self.header.clone()
        };
        out[SEGMENT_HEADER_SIZE..SEGMENT_HEADER_SIZE + FILE_HEADER_SIZE]
            .copy_from_slice(&header.encode());
        out
    }

    /// Serialize the container into `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.build())
    }
}
