//! Destinations for finished groups.
//!
//! The extraction driver calls [`OutputSink::begin_group`] once per group,
//! [`OutputSink::write_chunk`] one or more times with the group's bytes in
//! output order, then [`OutputSink::finish_group`].

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::image::PixelType;

/// Suffix of the raw pixel dump of a group.
pub const DATA_SUFFIX: &str = "_data.raw";
/// Suffix of the size sidecar of a group.
pub const META_SUFFIX: &str = "_meta.txt";

/// Description of one output group, known before any pixels are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHeader {
    /// Composite group index.
    pub index: u64,
    /// Generated name, e.g. `_T1_C0`.
    pub name: String,
    /// Number of sub-blocks in the group.
    pub members: usize,
    /// Spatial extent `[x, y, z]` in pixels.
    pub extent: [usize; 3],
    pub pixel_type: PixelType,
    /// Size of the reconstructed volume in bytes.
    pub byte_len: usize,
}

impl GroupHeader {
    /// Text of the size sidecar.
    pub fn meta_text(&self) -> String {
        format!(
            "size XYZ: [{}, {}, {}]\n",
            self.extent[0], self.extent[1], self.extent[2]
        )
    }
}

/// Receives finished groups from the extraction driver.
pub trait OutputSink {
    fn begin_group(&mut self, group: &GroupHeader) -> Result<()>;
    fn write_chunk(&mut self, bytes: &[u8]) -> Result<()>;
    fn finish_group(&mut self) -> Result<()>;
}

/// Keeps groups whose name ends with a given suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFilter {
    suffix: Option<String>,
}

impl NameFilter {
    pub fn new(suffix: Option<String>) -> Self {
        NameFilter { suffix }
    }

    pub fn accepts(&self, name: &str) -> bool {
        match &self.suffix {
            Some(suffix) => name.ends_with(suffix.as_str()),
            None => true,
        }
    }
}

fn artifact_path(prefix: &Path, name: &str, suffix: &str) -> PathBuf {
    let mut path: OsString = prefix.as_os_str().to_owned();
    path.push(name);
    path.push(suffix);
    PathBuf::from(path)
}

fn resource(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Resource {
        path: path.to_path_buf(),
        source,
    }
}

/// A group whose raw dump is still being written.
#[derive(Debug)]
struct PendingGroup {
    data_path: PathBuf,
    writer: BufWriter<File>,
    meta: Option<(PathBuf, String)>,
}

impl PendingGroup {
    /// Remove whatever was written so far.
    fn discard(self) {
        drop(self.writer);
        let _ = std::fs::remove_file(&self.data_path);
        if let Some((path, _)) = self.meta {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Writes `<prefix><name>_data.raw` and, optionally, `<prefix><name>_meta.txt`
/// per group.
///
/// The prefix is concatenated verbatim, so `out/scan` produces
/// `out/scan_T0_data.raw`. The sidecar is written only once the raw dump has
/// been flushed. A group that fails part way leaves no artifacts behind.
#[derive(Debug)]
pub struct RawFileSink {
    prefix: PathBuf,
    write_meta: bool,
    current: Option<PendingGroup>,
}

impl RawFileSink {
    pub fn new<P: Into<PathBuf>>(prefix: P) -> Self {
        RawFileSink {
            prefix: prefix.into(),
            write_meta: true,
            current: None,
        }
    }

    /// Enable or disable the `_meta.txt` sidecar.
    pub fn with_meta(mut self, write_meta: bool) -> Self {
        self.write_meta = write_meta;
        self
    }

    /// Path of the raw dump for a group called `name`.
    pub fn data_path(&self, name: &str) -> PathBuf {
        artifact_path(&self.prefix, name, DATA_SUFFIX)
    }

    /// Path of the size sidecar for a group called `name`.
    pub fn meta_path(&self, name: &str) -> PathBuf {
        artifact_path(&self.prefix, name, META_SUFFIX)
    }

    fn discard_pending(&mut self) {
        if let Some(pending) = self.current.take() {
            pending.discard();
        }
    }
}

impl OutputSink for RawFileSink {
    fn begin_group(&mut self, group: &GroupHeader) -> Result<()> {
        // A group that never reached finish_group is incomplete.
        self.discard_pending();
        let data_path = self.data_path(&group.name);
        let file = File::create(&data_path).map_err(resource(&data_path))?;
        let meta = self
            .write_meta
            .then(|| (self.meta_path(&group.name), group.meta_text()));
        self.current = Some(PendingGroup {
            data_path,
            writer: BufWriter::new(file),
            meta,
        });
        Ok(())
    }

    fn write_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(pending) = &mut self.current else {
            return Ok(());
        };
        if let Err(e) = pending.writer.write_all(bytes) {
            let err = resource(&pending.data_path)(e);
            self.discard_pending();
            return Err(err);
        }
        Ok(())
    }

    fn finish_group(&mut self) -> Result<()> {
        let Some(mut pending) = self.current.take() else {
            return Ok(());
        };
        if let Err(e) = pending.writer.flush() {
            let err = resource(&pending.data_path)(e);
            pending.discard();
            return Err(err);
        }
        if let Some((path, text)) = &pending.meta {
            if let Err(e) = std::fs::write(path, text) {
                let err = resource(path)(e);
                pending.discard();
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Drop for RawFileSink {
    fn drop(&mut self) {
        self.discard_pending();
    }
}

/// Forwards every group's bytes, back to back, to one writer.
#[derive(Debug)]
pub struct StreamSink<W> {
    writer: W,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        StreamSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for StreamSink<W> {
    fn begin_group(&mut self, _group: &GroupHeader) -> Result<()> {
        Ok(())
    }

    fn write_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn finish_group(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// A finished group held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryGroup {
    pub header: GroupHeader,
    pub data: Vec<u8>,
}

/// Collects every group in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub groups: Vec<MemoryGroup>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for MemorySink {
    fn begin_group(&mut self, group: &GroupHeader) -> Result<()> {
        self.groups.push(MemoryGroup {
            header: group.clone(),
            data: Vec::with_capacity(group.byte_len),
        });
        Ok(())
    }

    fn write_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(group) = self.groups.last_mut() {
            group.data.extend_from_slice(bytes);
        }
        Ok(())
    }

    fn finish_group(&mut self) -> Result<()> {
        Ok(())
    }
}
