use clap::Parser;
use czi_pure::cli::{init_logging, InfoArgs};
use czi_pure::dimension::{AxisRole, DimensionModel};
use czi_pure::segment::FileHeader;
use czi_pure::{list_groups, CziReader, ExtractOptions, GroupHeader};
use std::process;

fn format_header(header: &FileHeader, entries: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Version: {}.{}\n",
        header.version_major, header.version_minor
    ));
    out.push_str(&format!("File GUID: {}\n", header.file_guid));
    if header.primary_file_guid != header.file_guid {
        out.push_str(&format!("Primary GUID: {}\n", header.primary_file_guid));
    }
    out.push_str(&format!("File part: {}\n", header.file_part));
    if header.update_pending {
        out.push_str("Update pending: yes\n");
    }
    out.push_str(&format!("Directory position: {}\n", header.directory_position));
    out.push_str(&format!("Sub-blocks: {}\n", entries));
    out
}

fn format_axes(model: &DimensionModel) -> String {
    let mut out = String::new();
    out.push_str("Axes:\n");
    for axis in model.axes() {
        let role = match axis.role {
            AxisRole::Spatial(slot) => format!("spatial[{}]", slot),
            AxisRole::Weighted(weight) => format!("weight {}", weight),
            AxisRole::Tile => "tile".to_string(),
        };
        if axis.discovered_extent == axis.extent {
            out.push_str(&format!("  {}: extent {}, {}\n", axis.key, axis.extent, role));
        } else {
            out.push_str(&format!(
                "  {}: extent {} (found {}), {}\n",
                axis.key, axis.extent, axis.discovered_extent, role
            ));
        }
    }
    out.push_str(&format!("Group slots: {}\n", model.num_groups()));
    out
}

fn format_groups(groups: &[GroupHeader]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Groups: {}\n", groups.len()));
    for group in groups {
        let name = if group.name.is_empty() {
            "(unnamed)"
        } else {
            group.name.as_str()
        };
        out.push_str(&format!(
            "  {} {}: {} sub-blocks, {}x{}x{} {}, {} bytes\n",
            group.index,
            name,
            group.members,
            group.extent[0],
            group.extent[1],
            group.extent[2],
            group.pixel_type,
            group.byte_len
        ));
    }
    out
}

fn run(args: &InfoArgs) -> Result<String, String> {
    let path = args.input.display();
    let reader =
        CziReader::open(&args.input).map_err(|e| format!("Error reading '{}': {}", path, e))?;

    let entries = &reader.directory().entries;
    let model = DimensionModel::scan(entries, args.tile_axis)
        .map_err(|e| format!("Error parsing '{}': {}", path, e))?;

    let mut out = format_header(reader.header(), entries.len());
    out.push_str(&format_axes(&model));
    if args.groups {
        let options = ExtractOptions {
            tile_axis: args.tile_axis,
            ..ExtractOptions::default()
        };
        let groups = list_groups(&reader, &options)
            .map_err(|e| format!("Error parsing '{}': {}", path, e))?;
        out.push_str(&format_groups(&groups));
    }
    Ok(out)
}

fn main() {
    let args = InfoArgs::parse();
    init_logging(args.verbose);
    match run(&args) {
        Ok(output) => print!("{}", output),
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
    }
}
