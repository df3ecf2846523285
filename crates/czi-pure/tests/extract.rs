//! End-to-end extraction over synthetic containers.

use std::io::Cursor;

use czi_pure::builder::{ContainerBuilder, SubBlockSpec};
use czi_pure::segment::DimensionEntry;
use czi_pure::{
    decode_pixels, extract, list_groups, AxisKey, CompositeMode, CziReader, DimensionModel,
    ExtractOptions, MemorySink, PixelData, PixelType, RawFileSink,
};

const TILE: i32 = 10;

fn dims(list: &[(u8, i32, i32)]) -> Vec<DimensionEntry> {
    list.iter()
        .map(|&(k, start, size)| DimensionEntry::new(k, start, size))
        .collect()
}

/// Two time points, each a 2×2 mosaic of 10×10 Gray16 tiles. Tile indices
/// run 0, 1, 2, 0 so the tile axis is discovered with extent 3. Every pixel
/// holds `t * 1000 + tile * 100 + y * 10 + x` within its tile.
fn mosaic_container() -> Vec<u8> {
    let mut builder = ContainerBuilder::new();
    for t in 0..2 {
        for (tile, (m, gx, gy)) in [(0, 0, 0), (1, 1, 0), (2, 0, 1), (0, 1, 1)]
            .into_iter()
            .enumerate()
        {
            let mut data = Vec::new();
            for y in 0..TILE {
                for x in 0..TILE {
                    let v = (t * 1000 + tile as i32 * 100 + y * 10 + x) as u16;
                    data.extend_from_slice(&v.to_le_bytes());
                }
            }
            builder.push(SubBlockSpec::new(
                1,
                dims(&[
                    (b'X', gx * TILE, TILE),
                    (b'Y', gy * TILE, TILE),
                    (b'C', 0, 1),
                    (b'T', t, 1),
                    (b'M', m, 1),
                ]),
                data,
            ));
        }
    }
    builder.build()
}

fn open(bytes: Vec<u8>) -> CziReader<Cursor<Vec<u8>>> {
    CziReader::new(Cursor::new(bytes)).unwrap()
}

#[test]
fn mosaic_model() {
    let reader = open(mosaic_container());
    let model = DimensionModel::scan(&reader.directory().entries, AxisKey::M).unwrap();
    let m = model.axis(AxisKey::M).unwrap();
    assert_eq!(m.discovered_extent, 3);
    assert_eq!(m.extent, 1);
    assert_eq!(model.num_groups(), 2);
    assert_eq!(model.spatial_extent().unwrap(), [20, 20, 1]);
}

#[test]
fn mosaic_stitched_per_time_point() {
    let mut reader = open(mosaic_container());
    let mut sink = MemorySink::new();
    let summary = extract(&mut reader, &ExtractOptions::default(), &mut sink).unwrap();

    assert_eq!(summary.groups, 2);
    assert_eq!(summary.written, 2);
    assert_eq!(sink.groups.len(), 2);

    for (t, group) in sink.groups.iter().enumerate() {
        assert_eq!(group.header.name, format!("_T{t}"));
        assert_eq!(group.header.extent, [20, 20, 1]);
        assert_eq!(group.header.members, 4);
        assert_eq!(group.data.len(), 20 * 20 * 2);

        let PixelData::Gray16(pixels) = decode_pixels(&group.data, PixelType::Gray16).unwrap()
        else {
            panic!("expected Gray16 pixels");
        };
        for y in 0..20usize {
            for x in 0..20usize {
                let tile = (y / 10) * 2 + x / 10;
                let expected = t * 1000 + tile * 100 + (y % 10) * 10 + x % 10;
                assert_eq!(pixels[y * 20 + x] as usize, expected, "t={t} x={x} y={y}");
            }
        }
    }
}

#[test]
fn suffix_selects_one_time_point() {
    let mut reader = open(mosaic_container());
    let mut sink = MemorySink::new();
    let options = ExtractOptions {
        suffix: Some("T1".to_string()),
        ..ExtractOptions::default()
    };
    let summary = extract(&mut reader, &options, &mut sink).unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.filtered, 1);
    assert_eq!(sink.groups[0].header.name, "_T1");

    let options = ExtractOptions {
        suffix: Some("T2".to_string()),
        ..ExtractOptions::default()
    };
    let mut sink = MemorySink::new();
    let summary = extract(&mut reader, &options, &mut sink).unwrap();
    assert_eq!(summary.written, 0);
    assert!(sink.groups.is_empty());
}

#[test]
fn files_written_with_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let mut reader = open(mosaic_container());
    let mut sink = RawFileSink::new(dir.path().join("mosaic"));
    extract(&mut reader, &ExtractOptions::default(), &mut sink).unwrap();

    for t in 0..2 {
        let data = std::fs::read(dir.path().join(format!("mosaic_T{t}_data.raw"))).unwrap();
        assert_eq!(data.len(), 800);
        let meta =
            std::fs::read_to_string(dir.path().join(format!("mosaic_T{t}_meta.txt"))).unwrap();
        assert_eq!(meta, "size XYZ: [20, 20, 1]\n");
    }
}

#[test]
fn listing_matches_extraction() {
    let reader = open(mosaic_container());
    let groups = list_groups(&reader, &ExtractOptions::default()).unwrap();
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["_T0", "_T1"]);
    assert!(groups.iter().all(|g| g.byte_len == 800));
}

#[test]
fn plane_stream_over_z_stack() {
    // Z slices stored out of order, one per sub-block, two channels.
    let mut builder = ContainerBuilder::new();
    for (z, c) in [(2, 0), (0, 0), (1, 0), (0, 1), (1, 1), (2, 1)] {
        let fill = (c * 10 + z) as u8;
        builder.push(SubBlockSpec::new(
            0,
            dims(&[(b'X', 0, 2), (b'Y', 0, 2), (b'Z', z, 1), (b'C', c, 1)]),
            vec![fill; 4],
        ));
    }
    let bytes = builder.build();

    let stream = ExtractOptions {
        mode: CompositeMode::PlaneStream,
        ..ExtractOptions::default()
    };
    let mut streamed = MemorySink::new();
    extract(&mut open(bytes.clone()), &stream, &mut streamed).unwrap();
    let mut volume = MemorySink::new();
    extract(&mut open(bytes), &ExtractOptions::default(), &mut volume).unwrap();

    assert_eq!(streamed.groups.len(), 2);
    assert_eq!(streamed.groups[1].header.name, "_C1");
    assert_eq!(
        streamed.groups[1].data,
        [10u8, 10, 10, 10, 11, 11, 11, 11, 12, 12, 12, 12]
    );
    for (s, v) in streamed.groups.iter().zip(&volume.groups) {
        assert_eq!(s.data, v.data);
    }
}

#[test]
fn truncated_container_rejected() {
    let mut bytes = mosaic_container();
    bytes.truncate(bytes.len() - 10);
    assert!(CziReader::new(Cursor::new(bytes)).is_err());
}

#[test]
fn empty_directory_rejected() {
    let bytes = ContainerBuilder::new().build();
    assert!(matches!(
        CziReader::new(Cursor::new(bytes)),
        Err(czi_pure::Error::EmptyDirectory)
    ));
}
