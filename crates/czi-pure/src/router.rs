//! Grouping of sub-blocks into output images.
//!
//! Each sub-block lands in the group `Σ weight × start` over its weighted
//! axes. Tile and spatial axes contribute nothing, so tiles of one mosaic
//! share a group and are told apart only by their spatial placement.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::dimension::{AxisKey, AxisRole, DimensionModel};
use crate::error::{Error, Result};
use crate::segment::DirectoryEntry;

/// Where one sub-block goes inside its group's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index of the sub-block in the directory.
    pub entry: usize,
    /// Start of the sub-block along `[x, y, z]`.
    pub start: [i64; 3],
    /// Stored size along `[x, y, z]`, 1 for missing spatial axes.
    pub size: [usize; 3],
}

impl Placement {
    /// Derive the spatial placement of `entry`.
    pub fn of(index: usize, entry: &DirectoryEntry) -> Result<Self> {
        let mut start = [0i64; 3];
        let mut size = [1usize; 3];
        for dim in &entry.dimensions {
            let Some(slot) = AxisKey::new(dim.key())?.spatial_slot() else {
                continue;
            };
            if dim.size <= 0 {
                return Err(Error::InvalidDimension("dimension size must be positive"));
            }
            start[slot] = i64::from(dim.start);
            size[slot] = dim.size as usize;
        }
        Ok(Placement {
            entry: index,
            start,
            size,
        })
    }

    /// Pixel count covered by this placement.
    pub fn pixels(&self) -> Option<usize> {
        self.size[0]
            .checked_mul(self.size[1])?
            .checked_mul(self.size[2])
    }
}

/// One output image and the sub-blocks that compose it.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Composite group index.
    pub index: u64,
    /// Label built from the group's first member.
    pub name: String,
    /// Members in file order; never empty when built by [`route`].
    pub placements: Vec<Placement>,
}

impl Group {
    /// Directory index of the first member in file order.
    pub fn representative(&self) -> Option<usize> {
        self.placements.first().map(|p| p.entry)
    }
}

/// Composite group index of `entry`.
pub fn group_index(index: usize, entry: &DirectoryEntry, model: &DimensionModel) -> Result<u64> {
    let mut sum: i64 = 0;
    for dim in &entry.dimensions {
        let key = AxisKey::new(dim.key())?;
        let role = model
            .axis(key)
            .ok_or(Error::InvalidDimension("axis missing from dimension model"))?
            .role;
        if let AxisRole::Weighted(weight) = role {
            if dim.start < 0 {
                return Err(Error::NegativeAxisStart {
                    entry: index,
                    axis: key.as_char(),
                    start: dim.start,
                });
            }
            let weight = i64::try_from(weight).map_err(|_| Error::GroupCountOverflow)?;
            sum = weight
                .checked_mul(i64::from(dim.start))
                .and_then(|term| sum.checked_add(term))
                .ok_or(Error::GroupCountOverflow)?;
        }
    }
    u64::try_from(sum).map_err(|_| Error::NegativeGroupIndex { entry: index, index: sum })
}

/// Label of the group `entry` belongs to.
///
/// One `_<key><start>` token per weighted axis whose extent exceeds 1, in
/// the entry's own dimension order.
pub fn group_name(entry: &DirectoryEntry, model: &DimensionModel) -> String {
    let mut name = String::new();
    for dim in &entry.dimensions {
        let Ok(key) = AxisKey::new(dim.key()) else {
            continue;
        };
        let Some(axis) = model.axis(key) else {
            continue;
        };
        if matches!(axis.role, AxisRole::Weighted(_)) && axis.extent > 1 {
            let _ = write!(name, "_{}{}", key, dim.start);
        }
    }
    name
}

/// Bucket every entry into its group, ordered by group index.
///
/// Members keep file order within a group. Empty groups are not produced.
pub fn route(entries: &[DirectoryEntry], model: &DimensionModel) -> Result<Vec<Group>> {
    let mut groups: BTreeMap<u64, Group> = BTreeMap::new();
    for (i, entry) in entries.iter().enumerate() {
        let index = group_index(i, entry, model)?;
        let placement = Placement::of(i, entry)?;
        groups
            .entry(index)
            .or_insert_with(|| Group {
                index,
                name: group_name(entry, model),
                placements: Vec::new(),
            })
            .placements
            .push(placement);
    }
    Ok(groups.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::DimensionEntry;

    fn entry(dims: &[(u8, i32, i32)]) -> DirectoryEntry {
        DirectoryEntry {
            schema_type: *b"DV",
            pixel_type: 0,
            file_position: 0,
            file_part: 0,
            compression: 0,
            pyramid_type: 0,
            dimensions: dims
                .iter()
                .map(|&(k, start, size)| DimensionEntry::new(k, start, size))
                .collect(),
        }
    }

    fn routed(entries: &[DirectoryEntry]) -> Vec<Group> {
        let model = DimensionModel::scan(entries, AxisKey::M).unwrap();
        route(entries, &model).unwrap()
    }

    #[test]
    fn tiles_share_a_group() {
        let entries = vec![
            entry(&[(b'X', 0, 10), (b'Y', 0, 10), (b'M', 0, 1), (b'T', 0, 1)]),
            entry(&[(b'X', 10, 10), (b'Y', 0, 10), (b'M', 1, 1), (b'T', 0, 1)]),
            entry(&[(b'X', 0, 10), (b'Y', 0, 10), (b'M', 0, 1), (b'T', 1, 1)]),
        ];
        let groups = routed(&entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].index, 0);
        assert_eq!(groups[0].placements.len(), 2);
        assert_eq!(groups[0].placements[1].start, [10, 0, 0]);
        assert_eq!(groups[1].index, 1);
        assert_eq!(groups[1].representative(), Some(2));
    }

    #[test]
    fn groups_ordered_by_index_members_by_file_order() {
        let entries = vec![
            entry(&[(b'C', 1, 1), (b'Z', 1, 1)]),
            entry(&[(b'C', 0, 1), (b'Z', 0, 1)]),
            entry(&[(b'C', 1, 1), (b'Z', 0, 1)]),
        ];
        let groups = routed(&entries);
        assert_eq!(groups.iter().map(|g| g.index).collect::<Vec<_>>(), vec![0, 1]);
        let members: Vec<usize> = groups[1].placements.iter().map(|p| p.entry).collect();
        assert_eq!(members, vec![0, 2]);
    }

    #[test]
    fn sparse_groups_are_skipped() {
        let entries = vec![entry(&[(b'T', 0, 1)]), entry(&[(b'T', 4, 1)])];
        let groups = routed(&entries);
        assert_eq!(groups.iter().map(|g| g.index).collect::<Vec<_>>(), vec![0, 4]);
    }

    #[test]
    fn index_uses_mixed_radix_weights() {
        // C extent 3 (weight 1), T extent 2 (weight 3).
        let entries = vec![
            entry(&[(b'C', 2, 1), (b'T', 1, 1)]),
            entry(&[(b'C', 0, 1), (b'T', 0, 1)]),
        ];
        let model = DimensionModel::scan(&entries, AxisKey::M).unwrap();
        assert_eq!(group_index(0, &entries[0], &model).unwrap(), 5);
        assert_eq!(group_index(1, &entries[1], &model).unwrap(), 0);
    }

    #[test]
    fn negative_sum_rejected() {
        let entries = vec![entry(&[(b'T', 1, 1)]), entry(&[(b'C', 1, 1), (b'T', -1, 1)])];
        let model = DimensionModel::scan(&entries, AxisKey::M).unwrap();
        assert!(matches!(
            route(&entries, &model),
            Err(Error::NegativeAxisStart { entry: 1, axis: 'T', start: -1 })
        ));
    }

    #[test]
    fn negative_start_rejected_even_when_sum_is_valid() {
        // C=-1 with weight 1 plus T=1 with weight 1 would sum to group 0.
        let entries = vec![
            entry(&[(b'X', 0, 1), (b'C', 0, 1), (b'T', 0, 1)]),
            entry(&[(b'X', 0, 1), (b'C', -1, 1), (b'T', 1, 1)]),
        ];
        let model = DimensionModel::scan(&entries, AxisKey::M).unwrap();
        assert!(group_index(0, &entries[0], &model).is_ok());
        assert!(matches!(
            group_index(1, &entries[1], &model),
            Err(Error::NegativeAxisStart { entry: 1, axis: 'C', start: -1 })
        ));
        assert!(route(&entries, &model).is_err());
    }

    #[test]
    fn distinct_coordinates_never_share_a_group() {
        // C extent 3 (weight 1), T extent 2 (weight 3).
        let mut entries = Vec::new();
        for t in 0..2 {
            for c in 0..3 {
                entries.push(entry(&[(b'C', c, 1), (b'T', t, 1)]));
            }
        }
        let model = DimensionModel::scan(&entries, AxisKey::M).unwrap();
        let mut seen = std::collections::BTreeSet::new();
        for (i, e) in entries.iter().enumerate() {
            assert!(seen.insert(group_index(i, e, &model).unwrap()));
        }
        assert_eq!(seen.len(), 6);

        // (C=-1, T=1) sums to 2, the index of (C=2, T=0).
        let alias = entry(&[(b'C', -1, 1), (b'T', 1, 1)]);
        assert!(matches!(
            group_index(6, &alias, &model),
            Err(Error::NegativeAxisStart { entry: 6, axis: 'C', start: -1 })
        ));
    }

    #[test]
    fn name_lists_weighted_axes_with_extent_above_one() {
        let entries = vec![
            entry(&[(b'X', 0, 4), (b'T', 3, 1), (b'C', 0, 1), (b'M', 2, 1), (b'B', 0, 1)]),
            entry(&[(b'X', 0, 4), (b'T', 0, 1), (b'C', 1, 1), (b'M', 0, 1), (b'B', 0, 1)]),
        ];
        let model = DimensionModel::scan(&entries, AxisKey::M).unwrap();
        assert_eq!(group_name(&entries[0], &model), "_T3_C0");
        assert_eq!(group_name(&entries[1], &model), "_T0_C1");
    }

    #[test]
    fn name_empty_when_nothing_partitions() {
        let entries = vec![entry(&[(b'X', 0, 4), (b'M', 0, 1)])];
        let groups = routed(&entries);
        assert_eq!(groups[0].name, "");
    }

    #[test]
    fn placement_defaults_missing_spatial_axes() {
        let p = Placement::of(7, &entry(&[(b'X', 3, 5), (b'C', 0, 1)])).unwrap();
        assert_eq!(p.entry, 7);
        assert_eq!(p.start, [3, 0, 0]);
        assert_eq!(p.size, [5, 1, 1]);
        assert_eq!(p.pixels(), Some(5));
    }

    #[test]
    fn placement_rejects_non_positive_size() {
        assert!(Placement::of(0, &entry(&[(b'Y', 0, 0)])).is_err());
    }
}
