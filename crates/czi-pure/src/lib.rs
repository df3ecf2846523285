//! Pure Rust reader for ZISRAW (CZI) image containers.
//!
//! A container holds a directory of sub-blocks, each addressed by a set of
//! named axes. [`CziReader`] decodes the directory, [`DimensionModel`] turns
//! the axes into a partition of sub-blocks into output images, and
//! [`Compositor`] stitches each image's tiles into one buffer.
//!
//! ```no_run
//! use czi_pure::{extract, CziReader, ExtractOptions, RawFileSink};
//!
//! let mut reader = CziReader::open("scan.czi")?;
//! let mut sink = RawFileSink::new("out/scan");
//! let summary = extract(&mut reader, &ExtractOptions::default(), &mut sink)?;
//! println!("{} groups written", summary.written);
//! # Ok::<(), czi_pure::Error>(())
//! ```

pub mod builder;
pub mod compositor;
pub mod dimension;
pub mod endian;
pub mod error;
pub mod extract;
pub mod image;
pub mod reader;
pub mod roi;
pub mod router;
pub mod segment;
pub mod sink;

pub use compositor::{CompositeMode, Compositor};
pub use dimension::{Axis, AxisKey, AxisRole, DimensionModel};
pub use error::{Error, Result};
pub use extract::{extract, list_groups, ExtractOptions, ExtractSummary, Plan};
pub use image::{decode_pixels, PixelData, PixelType};
pub use reader::{CziReader, Directory};
pub use router::{route, Group, Placement};
pub use sink::{GroupHeader, MemorySink, NameFilter, OutputSink, RawFileSink, StreamSink};

#[cfg(feature = "cli")]
pub mod cli;
