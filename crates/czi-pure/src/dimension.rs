//! Axis discovery and mixed-radix weights.
//!
//! Every axis seen in the directory gets an extent (one past the largest
//! `start + size - 1`) and a role. The spatial axes X, Y and Z place pixels
//! inside an output buffer. Every other axis is weighted so that
//! `Σ weight × start` numbers the output images densely, except the tile
//! axis, which is collapsed so that mosaic tiles merge into one image.

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};
use crate::segment::DirectoryEntry;

/// Axis keys of the spatial axes, in slot order.
pub const SPATIAL_AXES: [AxisKey; 3] = [AxisKey::X, AxisKey::Y, AxisKey::Z];

/// Single-byte axis identifier in the ASCII range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AxisKey(u8);

impl AxisKey {
    pub const X: AxisKey = AxisKey(b'X');
    pub const Y: AxisKey = AxisKey(b'Y');
    pub const Z: AxisKey = AxisKey(b'Z');
    /// Mosaic tile index, the default tile axis.
    pub const M: AxisKey = AxisKey(b'M');

    pub fn new(byte: u8) -> Result<Self> {
        if byte.is_ascii() {
            Ok(AxisKey(byte))
        } else {
            Err(Error::InvalidAxisKey(byte))
        }
    }

    pub fn byte(self) -> u8 {
        self.0
    }

    pub fn as_char(self) -> char {
        self.0 as char
    }

    /// Slot 0, 1 or 2 for X, Y and Z; `None` for every other axis.
    pub fn spatial_slot(self) -> Option<usize> {
        SPATIAL_AXES.iter().position(|&k| k == self)
    }
}

impl core::fmt::Display for AxisKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for AxisKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.as_bytes() {
            [byte] => AxisKey::new(*byte),
            _ => Err(Error::InvalidDimension("axis key must be one ASCII character")),
        }
    }
}

/// What an axis contributes to routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisRole {
    /// Placement axis; the slot indexes `[x, y, z]`.
    Spatial(usize),
    /// Partitioning axis with its positional weight.
    Weighted(u64),
    /// The collapsed tile axis.
    Tile,
}

impl AxisRole {
    /// Weight in the composite group index; 0 for spatial and tile axes.
    pub fn weight(self) -> u64 {
        match self {
            AxisRole::Weighted(w) => w,
            AxisRole::Spatial(_) | AxisRole::Tile => 0,
        }
    }
}

/// One axis of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axis {
    pub key: AxisKey,
    /// Extent as found in the directory.
    pub discovered_extent: u64,
    /// Extent used for routing; 1 for the tile axis.
    pub extent: u64,
    pub role: AxisRole,
}

/// Axes of a container with their extents and roles.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionModel {
    axes: BTreeMap<AxisKey, Axis>,
    tile_axis: AxisKey,
    num_groups: u64,
}

impl DimensionModel {
    /// Scan all entries and assign axis roles.
    ///
    /// Fails if a dimension identifier is not ASCII, if `tile_axis` is a
    /// spatial axis, or if the number of groups overflows.
    pub fn scan(entries: &[DirectoryEntry], tile_axis: AxisKey) -> Result<Self> {
        if tile_axis.spatial_slot().is_some() {
            return Err(Error::InvalidDimension("tile axis cannot be spatial"));
        }

        // Pass 1: extents.
        let mut extents: BTreeMap<AxisKey, u64> =
            SPATIAL_AXES.iter().map(|&key| (key, 1)).collect();
        for entry in entries {
            for dim in &entry.dimensions {
                let key = AxisKey::new(dim.key())?;
                let end = i64::from(dim.start) + i64::from(dim.size);
                let extent = extents.entry(key).or_insert(1);
                if end > *extent as i64 {
                    *extent = end as u64;
                }
            }
        }

        // Pass 2: roles, in key order. The tile axis is forced to extent 1
        // first so it leaves the running product untouched, then marked.
        let mut num_groups: u64 = 1;
        let mut axes = BTreeMap::new();
        for (&key, &discovered_extent) in &extents {
            let extent = if key == tile_axis { 1 } else { discovered_extent };
            let role = match key.spatial_slot() {
                Some(slot) => AxisRole::Spatial(slot),
                None if key == tile_axis => AxisRole::Tile,
                None => {
                    let weight = num_groups;
                    num_groups = num_groups
                        .checked_mul(extent)
                        .ok_or(Error::GroupCountOverflow)?;
                    AxisRole::Weighted(weight)
                }
            };
            axes.insert(
                key,
                Axis {
                    key,
                    discovered_extent,
                    extent,
                    role,
                },
            );
        }

        debug!(axes = axes.len(), num_groups, "dimension model built");
        Ok(DimensionModel {
            axes,
            tile_axis,
            num_groups,
        })
    }

    /// The axis for `key`, if it appeared in the directory or is spatial.
    pub fn axis(&self, key: AxisKey) -> Option<&Axis> {
        self.axes.get(&key)
    }

    /// All axes in ascending key order.
    pub fn axes(&self) -> impl Iterator<Item = &Axis> {
        self.axes.values()
    }

    /// Routing extent of `key`; 1 for axes never seen.
    pub fn extent(&self, key: AxisKey) -> u64 {
        self.axes.get(&key).map_or(1, |a| a.extent)
    }

    /// Global extent of the spatial axes as `[x, y, z]` pixels.
    pub fn spatial_extent(&self) -> Result<[usize; 3]> {
        let mut extent = [1usize; 3];
        for (slot, &key) in SPATIAL_AXES.iter().enumerate() {
            let raw = self.extent(key);
            extent[slot] = usize::try_from(raw).map_err(|_| Error::GroupCountOverflow)?;
        }
        Ok(extent)
    }

    /// Total number of output images addressed by the weights.
    pub fn num_groups(&self) -> u64 {
        self.num_groups
    }

    pub fn tile_axis(&self) -> AxisKey {
        self.tile_axis
    }
}
