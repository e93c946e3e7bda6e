//! End-to-end conversion tests.
//!
//! Tests verify:
//! - SVS and OME-TIFF files written to disk scan back with the planned
//!   directories, sizes and tags
//! - Tiles decode as JPEG and border tiles are zero-padded
//! - BigTIFF and big-endian streams through the same writer
//! - Failure handling of the caller-level helper

use std::io::Cursor;
use std::path::Path;

use slide_converter::format::tiff::{ByteOrder, TiffTag};
use slide_converter::{
    convert_scene, ConversionParameters, ConversionState, DataType, EncodeParams, ErrorKind,
    ImageFormat, MemoryScene, SvsMetadata, TiffConverter, TiffFileWriter,
};

use super::test_utils::{rgb_scene, scan_tiff, shared, stack_scene, ScannedTiff};

fn jpeg(format: ImageFormat) -> ConversionParameters {
    ConversionParameters::new(format, EncodeParams::jpeg(95)).with_tile_size(256, 256)
}

fn read_back(path: &Path) -> ScannedTiff {
    scan_tiff(std::fs::read(path).unwrap())
}

// =============================================================================
// SVS
// =============================================================================

#[test]
fn test_svs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("slide.svs");
    let params = jpeg(ImageFormat::Svs).with_zoom_levels(3);

    let converter = convert_scene(shared(rgb_scene(1024, 768)), &params, &output, None).unwrap();
    assert_eq!(converter.state(), ConversionState::Written);

    let tiff = read_back(&output);
    assert!(!tiff.header.is_bigtiff);
    assert_eq!(tiff.directories.len(), 3);

    let sizes: Vec<(u64, u64)> = tiff.directories.iter().map(|d| tiff.size(d)).collect();
    assert_eq!(sizes, vec![(1024, 768), (512, 384), (256, 192)]);

    for (level, d) in tiff.directories.iter().enumerate() {
        assert_eq!(tiff.value(d, TiffTag::SamplesPerPixel), Some(3));
        assert_eq!(tiff.values(d, TiffTag::BitsPerSample), vec![8, 8, 8]);
        assert_eq!(tiff.value(d, TiffTag::Compression), Some(7));
        assert_eq!(tiff.value(d, TiffTag::NewSubfileType), Some(u64::from(level > 0)));
        assert_eq!(tiff.value(d, TiffTag::TileWidth), Some(256));
        assert!(tiff.values(d, TiffTag::SubIfds).is_empty());
    }
    assert_eq!(tiff.values(&tiff.directories[0], TiffTag::TileOffsets).len(), 4 * 3);
    assert_eq!(tiff.values(&tiff.directories[2], TiffTag::TileOffsets).len(), 1);
}

#[test]
fn test_svs_description_and_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("slide.svs");
    convert_scene(shared(rgb_scene(512, 512)), &jpeg(ImageFormat::Svs), &output, None).unwrap();

    let tiff = read_back(&output);
    let first = &tiff.directories[0];
    let text = tiff.text(first, TiffTag::ImageDescription).unwrap();
    assert!(text.starts_with("SlideIO Library 2.0\n512x512(256x256) JPEG/RGB Q=95\n"));

    let meta = SvsMetadata::parse(&text);
    assert_eq!(meta.mpp, Some(0.25));
    assert_eq!(meta.magnification, Some(40.0));
    assert_eq!(meta.filename.as_deref(), Some("rgb"));

    assert_eq!(tiff.value(first, TiffTag::ResolutionUnit), Some(3));
    assert!(tiff.value(first, TiffTag::XResolution).unwrap() > 0);
}

#[test]
fn test_tiles_decode_and_border_is_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("border.svs");
    let mut scene = MemoryScene::new("gray", 300, 200, 1, DataType::U8);
    scene.fill_channel(0, 0, 0, |_, _| 200.0).unwrap();
    convert_scene(shared(scene), &jpeg(ImageFormat::Svs), &output, None).unwrap();

    let tiff = read_back(&output);
    let d = &tiff.directories[0];
    assert_eq!(tiff.values(d, TiffTag::TileOffsets).len(), 2);

    let right = image::load_from_memory_with_format(tiff.tile_data(d, 1), image::ImageFormat::Jpeg)
        .unwrap()
        .to_luma8();
    assert_eq!(right.dimensions(), (256, 256));
    // Scene covers x < 44 and y < 200 of this tile
    assert!(right.get_pixel(10, 10)[0] > 190);
    assert!(right.get_pixel(200, 10)[0] < 10);
    assert!(right.get_pixel(10, 240)[0] < 10);
}

// =============================================================================
// OME-TIFF
// =============================================================================

#[test]
fn test_ome_sub_directories() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("slide.ome.tif");
    let params = jpeg(ImageFormat::OmeTiff).with_zoom_levels(3);
    convert_scene(shared(rgb_scene(1024, 1024)), &params, &output, None).unwrap();

    let tiff = read_back(&output);
    assert_eq!(tiff.directories.len(), 1);
    let top = &tiff.directories[0];
    assert_eq!(tiff.size(top), (1024, 1024));
    assert_eq!(tiff.value(top, TiffTag::PhotometricInterpretation), Some(6));

    let subs = tiff.sub_directories(top);
    assert_eq!(subs.len(), 2);
    assert_eq!(tiff.size(&subs[0]), (512, 512));
    assert_eq!(tiff.size(&subs[1]), (256, 256));
    assert_eq!(tiff.value(&subs[1], TiffTag::NewSubfileType), Some(1));

    let xml = tiff.text(top, TiffTag::ImageDescription).unwrap();
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("SizeX=\"1024\""));
    assert!(xml.contains("SizeC=\"3\""));
    assert!(xml.contains("Type=\"uint8\""));
    assert!(xml.contains("<TiffData IFD=\"0\" FirstC=\"0\" SizeC=\"3\""));
    assert!(xml.contains("FileName=\"slide.ome.tif\""));
}

#[test]
fn test_ome_stack_pages() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("stack.ome.tif");
    convert_scene(shared(stack_scene(128, 128, 2, 2, 1)), &jpeg(ImageFormat::OmeTiff), &output, None)
        .unwrap();

    let tiff = read_back(&output);
    assert_eq!(tiff.directories.len(), 4);
    for d in &tiff.directories {
        assert_eq!(tiff.value(d, TiffTag::SamplesPerPixel), Some(1));
        assert_eq!(tiff.value(d, TiffTag::PhotometricInterpretation), Some(1));
    }
    assert!(tiff.text(&tiff.directories[1], TiffTag::ImageDescription).is_none());

    let xml = tiff.text(&tiff.directories[0], TiffTag::ImageDescription).unwrap();
    assert!(xml.contains("Name=\"C1\""));
    assert!(xml.contains("<TiffData IFD=\"3\" FirstC=\"1\" SizeC=\"1\" FirstZ=\"1\""));
}

// =============================================================================
// Stream Variants
// =============================================================================

fn write_stream(order: ByteOrder, bigtiff: bool) -> ScannedTiff {
    let mut converter = TiffConverter::new();
    converter
        .create_file_layout(
            shared(rgb_scene(512, 512)),
            &jpeg(ImageFormat::OmeTiff).with_zoom_levels(2),
        )
        .unwrap();
    let mut writer = TiffFileWriter::new(Cursor::new(Vec::new()), order, bigtiff).unwrap();
    converter.write_to(&mut writer, "stream.ome.tif", None).unwrap();
    scan_tiff(writer.finish().unwrap().into_inner())
}

#[test]
fn test_bigtiff_stream() {
    let tiff = write_stream(ByteOrder::LittleEndian, true);
    assert!(tiff.header.is_bigtiff);
    assert_eq!(&tiff.bytes[0..2], b"II");
    let top = &tiff.directories[0];
    assert_eq!(tiff.size(top), (512, 512));
    assert_eq!(tiff.size(&tiff.sub_directories(top)[0]), (256, 256));
}

#[test]
fn test_big_endian_stream() {
    let tiff = write_stream(ByteOrder::BigEndian, false);
    assert_eq!(&tiff.bytes[0..2], b"MM");
    let top = &tiff.directories[0];
    assert_eq!(tiff.size(top), (512, 512));
    let tile = tiff.tile_data(top, 0);
    assert_eq!(&tile[0..2], &[0xFF, 0xD8]);
}

// =============================================================================
// Failure Handling
// =============================================================================

#[test]
fn test_jpeg2000_removes_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("j2k.ome.tif");
    let params = ConversionParameters::new(ImageFormat::OmeTiff, EncodeParams::jpeg2000(5.0))
        .with_tile_size(256, 256);

    let err = convert_scene(shared(rgb_scene(256, 256)), &params, &output, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    assert!(!output.exists());
}

#[test]
fn test_create_tiff_leaves_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("j2k.ome.tif");
    let params = ConversionParameters::new(ImageFormat::OmeTiff, EncodeParams::jpeg2000(5.0))
        .with_tile_size(256, 256);

    let mut converter = TiffConverter::new();
    converter
        .create_file_layout(shared(rgb_scene(256, 256)), &params)
        .unwrap();
    assert!(converter.create_tiff(&output, None).is_err());
    assert!(output.exists());
    assert_eq!(converter.state(), ConversionState::Planned);
}

#[test]
fn test_existing_output_refused() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("exists.svs");
    std::fs::write(&output, b"keep").unwrap();

    let err = convert_scene(shared(rgb_scene(256, 256)), &jpeg(ImageFormat::Svs), &output, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(std::fs::read(&output).unwrap(), b"keep");
}

#[test]
fn test_progress_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("progress.svs");
    let mut last = 0;
    let mut calls = 0;
    let mut sink = |p: u32| {
        last = p;
        calls += 1;
    };
    let converter = convert_scene(
        shared(rgb_scene(512, 512)),
        &jpeg(ImageFormat::Svs).with_zoom_levels(2),
        &output,
        Some(&mut sink),
    )
    .unwrap();
    assert_eq!(calls, converter.total_tiles());
    assert_eq!(last, 100);
}
