//! End-to-end extraction: directory → model → groups → sink.

use std::io::{Read, Seek};

use tracing::{debug, info, warn};

use crate::compositor::{group_pixel_type, volume_len, CompositeMode, Compositor};
use crate::dimension::{AxisKey, DimensionModel};
use crate::error::Result;
use crate::reader::CziReader;
use crate::router::{route, Group};
use crate::sink::{GroupHeader, NameFilter, OutputSink};

/// Settings for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub mode: CompositeMode,
    /// Keep only groups whose name ends with this string.
    pub suffix: Option<String>,
    /// Axis whose values never split groups.
    pub tile_axis: AxisKey,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            mode: CompositeMode::Volume,
            suffix: None,
            tile_axis: AxisKey::M,
        }
    }
}

/// Counts reported after an extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Non-empty groups found.
    pub groups: usize,
    /// Groups handed to the sink completely.
    pub written: usize,
    /// Groups skipped by the name filter.
    pub filtered: usize,
    /// Groups skipped because their output could not be written.
    pub skipped: usize,
}

/// The dimension model and routed groups of a container.
#[derive(Debug, Clone)]
pub struct Plan {
    pub model: DimensionModel,
    pub groups: Vec<Group>,
}

impl Plan {
    pub fn new<R: Read + Seek>(reader: &CziReader<R>, tile_axis: AxisKey) -> Result<Self> {
        let entries = &reader.directory().entries;
        let model = DimensionModel::scan(entries, tile_axis)?;
        let groups = route(entries, &model)?;
        debug!(groups = groups.len(), num_groups = model.num_groups(), "routed sub-blocks");
        Ok(Plan { model, groups })
    }

    /// Describe `group` without reading pixel data.
    pub fn header<R: Read + Seek>(&self, reader: &CziReader<R>, group: &Group) -> Result<GroupHeader> {
        let pixel_type = group_pixel_type(reader.directory(), group)?;
        let extent = self.model.spatial_extent()?;
        Ok(GroupHeader {
            index: group.index,
            name: group.name.clone(),
            members: group.placements.len(),
            extent,
            pixel_type,
            byte_len: volume_len(extent, pixel_type)?,
        })
    }
}

/// Headers of every group that passes the suffix filter, in index order.
///
/// No pixel data is read.
pub fn list_groups<R: Read + Seek>(
    reader: &CziReader<R>,
    options: &ExtractOptions,
) -> Result<Vec<GroupHeader>> {
    let plan = Plan::new(reader, options.tile_axis)?;
    let filter = NameFilter::new(options.suffix.clone());
    plan.groups
        .iter()
        .filter(|g| filter.accepts(&g.name))
        .map(|g| plan.header(reader, g))
        .collect()
}

fn write_group<R, S>(
    reader: &mut CziReader<R>,
    compositor: &mut Compositor,
    model: &DimensionModel,
    group: &Group,
    header: &GroupHeader,
    sink: &mut S,
) -> Result<()>
where
    R: Read + Seek,
    S: OutputSink + ?Sized,
{
    sink.begin_group(header)?;
    compositor.run(reader, model, group, |chunk| sink.write_chunk(chunk))?;
    sink.finish_group()
}

/// Reconstruct every selected group and hand it to `sink`.
///
/// A group whose output cannot be written is logged and skipped; any other
/// error stops the run.
pub fn extract<R, S>(
    reader: &mut CziReader<R>,
    options: &ExtractOptions,
    sink: &mut S,
) -> Result<ExtractSummary>
where
    R: Read + Seek,
    S: OutputSink + ?Sized,
{
    let plan = Plan::new(reader, options.tile_axis)?;
    let filter = NameFilter::new(options.suffix.clone());
    let mut compositor = Compositor::new(options.mode);
    let mut summary = ExtractSummary {
        groups: plan.groups.len(),
        ..ExtractSummary::default()
    };

    for group in &plan.groups {
        if !filter.accepts(&group.name) {
            debug!(group = %group.name, "filtered out");
            summary.filtered += 1;
            continue;
        }
        let header = plan.header(reader, group)?;
        match write_group(reader, &mut compositor, &plan.model, group, &header, sink) {
            Ok(()) => {
                info!(
                    group = %header.name,
                    members = header.members,
                    extent = ?header.extent,
                    "wrote group"
                );
                summary.written += 1;
            }
            Err(e) if e.is_recoverable() => {
                warn!(group = %header.name, error = %e, "skipping group");
                summary.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(summary)
}
