//! Reconstruction of one group's pixels from its sub-block payloads.

use std::io::{Read, Seek};

use tracing::trace;

use crate::dimension::DimensionModel;
use crate::error::{Error, Result};
use crate::image::PixelType;
use crate::reader::{CziReader, Directory};
use crate::roi::copy_roi;
use crate::router::{Group, Placement};

/// How a group's sub-blocks become output bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Place every sub-block into one full volume buffer.
    #[default]
    Volume,
    /// Emit each payload as whole XY planes, without placement.
    PlaneStream,
}

/// Common pixel type of all members of `group`.
pub fn group_pixel_type(directory: &Directory, group: &Group) -> Result<PixelType> {
    let code_of = |p: &Placement| {
        directory
            .get(p.entry)
            .map(|e| e.pixel_type)
            .ok_or(Error::InvalidDirectory("entry index out of range"))
    };
    let (head, rest) = group
        .placements
        .split_first()
        .ok_or(Error::InvalidDirectory("group has no members"))?;
    let first = code_of(head)?;
    for placement in rest {
        let other = code_of(placement)?;
        if other != first {
            return Err(Error::MixedPixelTypes {
                group: group.index,
                first,
                other,
            });
        }
    }
    PixelType::from_code(first)
}

/// Size in bytes of a volume of `extent` pixels.
pub fn volume_len(extent: [usize; 3], pixel_type: PixelType) -> Result<usize> {
    extent[0]
        .checked_mul(extent[1])
        .and_then(|n| n.checked_mul(extent[2]))
        .and_then(|n| n.checked_mul(pixel_type.bytes_per_pixel()))
        .ok_or(Error::BufferTooLarge(extent))
}

fn sorted_by_z(group: &Group) -> Vec<Placement> {
    let mut placements = group.placements.clone();
    placements.sort_by_key(|p| p.start[2]);
    placements
}

fn spatial_offset(placement: &Placement, extent: [usize; 3]) -> Result<[usize; 3]> {
    let mut offset = [0usize; 3];
    for (slot, &start) in placement.start.iter().enumerate() {
        offset[slot] = usize::try_from(start).map_err(|_| Error::RegionOutOfBounds {
            offset: placement.start,
            size: placement.size,
            extent,
        })?;
    }
    Ok(offset)
}

/// Builds output buffers for groups, reusing its scratch space between them.
#[derive(Debug, Default)]
pub struct Compositor {
    mode: CompositeMode,
    image: Vec<u8>,
    block: Vec<u8>,
}

impl Compositor {
    pub fn new(mode: CompositeMode) -> Self {
        Compositor {
            mode,
            image: Vec::new(),
            block: Vec::new(),
        }
    }

    pub fn mode(&self) -> CompositeMode {
        self.mode
    }

    /// Reconstruct the full volume of `group`.
    ///
    /// The returned slice is `X × Y × Z × pixel size` bytes laid out with X
    /// fastest. Pixels no sub-block covers are zero.
    pub fn composite<R: Read + Seek>(
        &mut self,
        reader: &mut CziReader<R>,
        model: &DimensionModel,
        group: &Group,
    ) -> Result<&[u8]> {
        let pixel_type = group_pixel_type(reader.directory(), group)?;
        let px = pixel_type.bytes_per_pixel();
        let extent = model.spatial_extent()?;
        let len = volume_len(extent, pixel_type)?;

        if self.image.len() < len {
            self.image.resize(len, 0);
        }
        self.image[..len].fill(0);
        let dst_extent = [extent[0] * px, extent[1], extent[2]];

        for placement in sorted_by_z(group) {
            reader.read_payload(placement.entry, &mut self.block)?;
            let offset = spatial_offset(&placement, extent)?;
            let region = [placement.size[0] * px, placement.size[1], placement.size[2]];
            let expected = placement
                .pixels()
                .and_then(|n| n.checked_mul(px))
                .ok_or(Error::BufferTooLarge(placement.size))?;
            if self.block.len() < expected {
                return Err(Error::PayloadSizeMismatch {
                    entry: placement.entry,
                    expected,
                    actual: self.block.len(),
                });
            }
            trace!(entry = placement.entry, ?offset, size = ?placement.size, "placing sub-block");
            copy_roi(
                &self.block,
                region,
                [0; 3],
                &mut self.image[..len],
                dst_extent,
                [offset[0] * px, offset[1], offset[2]],
                region,
            )?;
        }
        Ok(&self.image[..len])
    }

    /// Hand each member's payload to `emit` as whole planes, in Z order.
    ///
    /// Every member must span the full XY extent.
    pub fn stream_planes<R, F>(
        &mut self,
        reader: &mut CziReader<R>,
        model: &DimensionModel,
        group: &Group,
        mut emit: F,
    ) -> Result<()>
    where
        R: Read + Seek,
        F: FnMut(&[u8]) -> Result<()>,
    {
        let pixel_type = group_pixel_type(reader.directory(), group)?;
        let extent = model.spatial_extent()?;
        let placements = sorted_by_z(group);
        if let Some(p) = placements
            .iter()
            .find(|p| p.size[0] != extent[0] || p.size[1] != extent[1])
        {
            return Err(Error::IncompatibleLayout { entry: p.entry });
        }

        for placement in placements {
            reader.read_payload(placement.entry, &mut self.block)?;
            let expected = volume_len([extent[0], extent[1], placement.size[2]], pixel_type)?;
            if self.block.len() < expected {
                return Err(Error::PayloadSizeMismatch {
                    entry: placement.entry,
                    expected,
                    actual: self.block.len(),
                });
            }
            emit(&self.block[..expected])?;
        }
        Ok(())
    }

    /// Produce `group` in the configured mode, passing output bytes to `emit`.
    ///
    /// Volume mode calls `emit` once with the whole buffer.
    pub fn run<R, F>(
        &mut self,
        reader: &mut CziReader<R>,
        model: &DimensionModel,
        group: &Group,
        mut emit: F,
    ) -> Result<()>
    where
        R: Read + Seek,
        F: FnMut(&[u8]) -> Result<()>,
    {
        match self.mode {
            CompositeMode::Volume => {
                let volume = self.composite(reader, model, group)?;
                emit(volume)
            }
            CompositeMode::PlaneStream => self.stream_planes(reader, model, group, emit),
        }
    }
}
