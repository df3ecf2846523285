//! Container reader: file header, directory, and sub-block payloads.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::endian::read_i32_le;
use crate::error::{Error, Result};
use crate::segment::{
    ids, DimensionEntry, DirectoryEntry, FileHeader, SegmentHeader, SubBlockHeader,
    DIMENSION_ENTRY_SIZE, DIRECTORY_ENTRY_SIZE, DIRECTORY_SEGMENT_SIZE, FILE_HEADER_SIZE,
    SEGMENT_HEADER_SIZE, SUB_BLOCK_FIELDS_SIZE, SUB_BLOCK_HEADER_SIZE,
};

/// Extension tried when the literal input path cannot be opened.
pub const DEFAULT_EXTENSION: &str = "czi";

/// All sub-block entries of a container, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    pub entries: Vec<DirectoryEntry>,
}

impl Directory {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry at `index`, or `None` if out of bounds.
    pub fn get(&self, index: usize) -> Option<&DirectoryEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter()
    }
}

fn read_array<R: Read, const N: usize>(input: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    input.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(buf)
}

fn seek_to<R: Seek>(input: &mut R, position: i64) -> Result<()> {
    let position = u64::try_from(position).map_err(|_| Error::UnexpectedEof)?;
    input.seek(SeekFrom::Start(position))?;
    Ok(())
}

/// Read a segment header at the current position and check its id.
fn read_segment_header<R: Read>(input: &mut R, expected: &'static str) -> Result<SegmentHeader> {
    let raw: [u8; SEGMENT_HEADER_SIZE] = read_array(input)?;
    let header = SegmentHeader::decode(&raw)?;
    header.expect_id(expected)?;
    Ok(header)
}

/// Read the file header segment at offset 0.
pub fn read_file_header<R: Read + Seek>(input: &mut R) -> Result<FileHeader> {
    seek_to(input, 0)?;
    read_segment_header(input, ids::FILE)?;
    let raw: [u8; FILE_HEADER_SIZE] = read_array(input)?;
    FileHeader::decode(&raw)
}

/// Read the directory segment at `position` with all entries and their
/// dimension records.
pub fn read_directory<R: Read + Seek>(input: &mut R, position: i64) -> Result<Directory> {
    if position <= 0 {
        return Err(Error::InvalidDirectory("missing directory position"));
    }
    seek_to(input, position)?;
    read_segment_header(input, ids::DIRECTORY)?;
    let fixed: [u8; DIRECTORY_SEGMENT_SIZE] = read_array(input)?;
    let entry_count = read_i32_le(&fixed);
    if entry_count == 0 {
        return Err(Error::EmptyDirectory);
    }
    if entry_count < 0 {
        return Err(Error::InvalidDirectory("negative entry count"));
    }
    let entry_count = entry_count as usize;
    debug!(entry_count, position, "reading directory");

    // A corrupt count must not turn into a huge up-front allocation.
    let mut entries = Vec::with_capacity(entry_count.min(4096));
    let mut dim_buf = Vec::new();
    for _ in 0..entry_count {
        let raw: [u8; DIRECTORY_ENTRY_SIZE] = read_array(input)?;
        let (mut entry, dimension_count) = DirectoryEntry::decode_fixed(&raw)?;

        dim_buf.resize(dimension_count * DIMENSION_ENTRY_SIZE, 0);
        input.read_exact(&mut dim_buf).map_err(Error::from_read)?;
        entry.dimensions = dim_buf
            .chunks_exact(DIMENSION_ENTRY_SIZE)
            .map(DimensionEntry::decode)
            .collect::<Result<Vec<_>>>()?;
        for dim in &entry.dimensions {
            if dim.size <= 0 {
                return Err(Error::InvalidDimension("size must be positive"));
            }
        }
        entries.push(entry);
    }

    Ok(Directory { entries })
}

/// A decoded container over a seekable byte source.
///
/// The header and directory are read eagerly; sub-block payloads are read on
/// demand by entry index.
#[derive(Debug)]
pub struct CziReader<R> {
    inner: R,
    len: u64,
    header: FileHeader,
    directory: Directory,
}

impl CziReader<BufReader<File>> {
    /// Open a container by path, retrying with a `.czi` extension appended
    /// when the literal path does not open.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(first) => {
                let mut fallback = PathBuf::from(path).into_os_string();
                fallback.push(".");
                fallback.push(DEFAULT_EXTENSION);
                debug!(path = %path.display(), "retrying with .czi extension");
                File::open(&fallback).map_err(|_| Error::Io(first))?
            }
        };
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> CziReader<R> {
    /// Decode the file header and directory from `inner`.
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        let header = read_file_header(&mut inner)?;
        if header.update_pending {
            warn!("container is flagged as being updated; contents may be inconsistent");
        }
        if header.file_part != 0 {
            debug!(file_part = header.file_part, "container is part of a multi-file set");
        }
        let directory = read_directory(&mut inner, header.directory_position)?;
        Ok(CziReader {
            inner,
            len,
            header,
            directory,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Read the sub-block size fields of entry `index`.
    pub fn read_sub_block_header(&mut self, index: usize) -> Result<SubBlockHeader> {
        let position = self.entry(index)?.file_position;
        seek_to(&mut self.inner, position)?;
        read_segment_header(&mut self.inner, ids::SUB_BLOCK)?;
        let raw: [u8; SUB_BLOCK_FIELDS_SIZE] = read_array(&mut self.inner)?;
        SubBlockHeader::decode(&raw)
    }

    /// Read the pixel payload of entry `index` into `buf`, replacing its
    /// contents. Returns the sub-block size fields.
    pub fn read_payload(&mut self, index: usize, buf: &mut Vec<u8>) -> Result<SubBlockHeader> {
        let entry = self.entry(index)?;
        if entry.compression != 0 {
            return Err(Error::UnsupportedCompression(entry.compression));
        }
        let position = entry.file_position;

        let sub_block = self.read_sub_block_header(index)?;
        if sub_block.metadata_size < 0 || sub_block.data_size < 0 {
            return Err(Error::InvalidDirectory("negative sub-block section size"));
        }
        let data_start = position
            .checked_add(
                (SEGMENT_HEADER_SIZE + SUB_BLOCK_HEADER_SIZE) as i64 + sub_block.metadata_size as i64,
            )
            .ok_or(Error::UnexpectedEof)?;
        // Check against the source length before allocating for a corrupt size.
        let data_end = data_start
            .checked_add(sub_block.data_size)
            .ok_or(Error::UnexpectedEof)?;
        if data_end as u64 > self.len {
            return Err(Error::UnexpectedEof);
        }
        seek_to(&mut self.inner, data_start)?;

        let data_size = usize::try_from(sub_block.data_size).map_err(|_| Error::UnexpectedEof)?;
        buf.clear();
        buf.resize(data_size, 0);
        self.inner.read_exact(buf).map_err(Error::from_read)?;
        Ok(sub_block)
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn entry(&self, index: usize) -> Result<&DirectoryEntry> {
        self.directory
            .get(index)
            .ok_or(Error::InvalidDirectory("entry index out of range"))
    }
}
