//! Layout planning and writer call-sequence tests.
//!
//! Tests verify:
//! - Page and sub-directory counts for SVS and OME-TIFF
//! - Channel chunking rules
//! - Crop rectangle handling
//! - The calls made on a container writer, tile by tile

use std::sync::Arc;

use slide_converter::{
    ConversionParameters, ConversionState, ConvertError, DataType, EncodeParams, ErrorKind,
    ImageFormat, Rect, Scene, TiffConverter,
};

use super::test_utils::{
    rgb_scene, shared, stack_scene, RecordingWriter, VirtualScene, WriterCall,
};

fn jpeg(format: ImageFormat) -> ConversionParameters {
    ConversionParameters::new(format, EncodeParams::jpeg(85)).with_tile_size(256, 256)
}

fn planned(scene: Arc<dyn Scene>, params: &ConversionParameters) -> TiffConverter {
    let mut converter = TiffConverter::new();
    converter.create_file_layout(scene, params).unwrap();
    converter
}

// =============================================================================
// Page Structure
// =============================================================================

#[test]
fn test_svs_pages_per_zoom_level() {
    let converter = planned(
        shared(rgb_scene(2048, 1024)),
        &jpeg(ImageFormat::Svs).with_zoom_levels(3),
    );
    let structure = converter.structure().unwrap();
    assert_eq!(structure.num_pages(), 3);
    for (level, page) in structure.pages.iter().enumerate() {
        assert_eq!(page.directory.zoom_level().unwrap(), level as i32);
        assert_eq!(page.directory.slice_range.len(), 1);
        assert_eq!(page.directory.frame_range.len(), 1);
        assert_eq!(page.directory.channel_range, 0..3);
        assert_eq!(page.num_sub_directories(), 0);
    }
}

#[test]
fn test_svs_auto_zoom_levels() {
    // 16000 -> 8000 -> 4000 -> 2000 -> 1000
    let scene: Arc<dyn Scene> = Arc::new(VirtualScene::new(16000, 16000, vec![DataType::U8; 3]));
    let converter = planned(scene, &jpeg(ImageFormat::Svs));
    assert_eq!(converter.parameters().unwrap().num_zoom_levels(), 5);
    assert_eq!(converter.num_pages(), 5);
}

#[test]
fn test_ome_rgb_jpeg_single_page() {
    let converter = planned(
        shared(rgb_scene(1024, 1024)),
        &jpeg(ImageFormat::OmeTiff).with_zoom_levels(3),
    );
    assert_eq!(converter.num_pages(), 1);
    let page = converter.page(0).unwrap();
    assert_eq!(page.directory.channel_range, 0..3);
    assert_eq!(page.num_sub_directories(), 2);
    assert_eq!(page.sub_directory(0).unwrap().zoom_level().unwrap(), 1);
    assert_eq!(page.sub_directory(1).unwrap().channel_range, 0..3);
}

#[test]
fn test_ome_jpeg2000_chunks() {
    let four: Arc<dyn Scene> = Arc::new(VirtualScene::new(512, 512, vec![DataType::U16; 4]));
    let params = ConversionParameters::new(ImageFormat::OmeTiff, EncodeParams::jpeg2000(5.0));
    let converter = planned(four, &params);
    assert_eq!(converter.num_pages(), 4);

    let three: Arc<dyn Scene> = Arc::new(VirtualScene::new(512, 512, vec![DataType::U16; 3]));
    let converter = planned(three, &params);
    assert_eq!(converter.num_pages(), 1);
    assert_eq!(converter.page(0).unwrap().directory.channel_range, 0..3);
}

#[test]
fn test_ome_partial_rgb_not_grouped() {
    let params = jpeg(ImageFormat::OmeTiff).with_channel_range(1..3);
    let converter = planned(shared(rgb_scene(256, 256)), &params);
    let ranges: Vec<_> = converter
        .structure()
        .unwrap()
        .pages
        .iter()
        .map(|p| p.directory.channel_range.clone())
        .collect();
    assert_eq!(ranges, vec![1..2, 2..3]);
}

#[test]
fn test_ome_page_order_frame_slice_channel() {
    let converter = planned(shared(stack_scene(64, 64, 2, 3, 2)), &jpeg(ImageFormat::OmeTiff));
    let structure = converter.structure().unwrap();
    assert_eq!(structure.num_pages(), 2 * 3 * 2);

    let order: Vec<(usize, usize, usize)> = structure
        .pages
        .iter()
        .map(|p| {
            let d = &p.directory;
            (d.frame_range.start, d.slice_range.start, d.channel_range.start)
        })
        .collect();
    assert_eq!(order[0], (0, 0, 0));
    assert_eq!(order[1], (0, 0, 1));
    assert_eq!(order[2], (0, 1, 0));
    assert_eq!(order[6], (1, 0, 0));
    assert!(structure.pages.iter().all(|p| p.directory.plane_count == 1));
}

#[test]
fn test_channel_metadata_for_named_channels() {
    let converter = planned(shared(stack_scene(64, 64, 2, 1, 1)), &jpeg(ImageFormat::OmeTiff));
    let channels = &converter.structure().unwrap().channels;
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[1].name, "C1");
    assert_eq!(channels[1].id, "Channel:0:1");
}

#[test]
fn test_total_tiles() {
    // 300x200 at 256: level 0 2x1, level 1 (150x100) 1x1
    let params = jpeg(ImageFormat::Svs).with_zoom_levels(2);
    let converter = planned(shared(rgb_scene(300, 200)), &params);
    assert_eq!(converter.total_tiles(), 3);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_svs_rejects_multi_slice() {
    let scene: Arc<dyn Scene> =
        Arc::new(VirtualScene::new(512, 512, vec![DataType::U8]).with_planes(4, 1));
    let params = jpeg(ImageFormat::Svs).with_slice_range(0..4);
    let err = TiffConverter::new().create_file_layout(scene, &params).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
}

#[test]
fn test_svs_defaults_to_first_plane() {
    let scene: Arc<dyn Scene> =
        Arc::new(VirtualScene::new(512, 512, vec![DataType::U8]).with_planes(4, 2));
    let converter = planned(scene, &jpeg(ImageFormat::Svs));
    let params = converter.parameters().unwrap();
    assert_eq!(params.slice_range, 0..1);
    assert_eq!(params.frame_range, 0..1);
}

#[test]
fn test_svs_jpeg_channel_count() {
    let scene: Arc<dyn Scene> = Arc::new(VirtualScene::new(512, 512, vec![DataType::U8; 2]));
    let err = TiffConverter::new()
        .create_file_layout(scene, &jpeg(ImageFormat::Svs))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
}

#[test]
fn test_svs_mixed_types() {
    let scene: Arc<dyn Scene> = Arc::new(VirtualScene::new(
        512,
        512,
        vec![DataType::U16, DataType::U8, DataType::U16],
    ));
    let params = ConversionParameters::new(ImageFormat::Svs, EncodeParams::jpeg2000(4.0));
    let err = TiffConverter::new().create_file_layout(scene, &params).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
}

#[test]
fn test_ranges_outside_scene() {
    let scene = shared(rgb_scene(256, 256));
    let params = jpeg(ImageFormat::OmeTiff).with_channel_range(2..4);
    let err = TiffConverter::new()
        .create_file_layout(scene, &params)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_crop_rect_preserved() {
    let scene: Arc<dyn Scene> = Arc::new(VirtualScene::new(20000, 20000, vec![DataType::U8; 3]));
    let rect = Rect::new(10000, 5000, 10000, 15000);
    let converter = planned(scene, &jpeg(ImageFormat::Svs).with_rect(rect));
    assert_eq!(converter.structure().unwrap().crop_rect, rect);
}

#[test]
fn test_crop_rect_bounds() {
    let scene = shared(rgb_scene(1000, 800));
    let mut converter = TiffConverter::new();

    let err = converter
        .create_file_layout(
            Arc::clone(&scene),
            &jpeg(ImageFormat::Svs).with_rect(Rect::new(1, 0, 1000, 800)),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    converter
        .create_file_layout(scene, &jpeg(ImageFormat::Svs).with_rect(Rect::new(0, 0, 1000, 800)))
        .unwrap();
    assert_eq!(converter.state(), ConversionState::Planned);
}

#[test]
fn test_page_index_out_of_range() {
    let converter = planned(shared(rgb_scene(256, 256)), &jpeg(ImageFormat::Svs));
    assert!(matches!(converter.page(1), Err(ConvertError::InvalidState(_))));
    assert!(matches!(
        converter.page(0).unwrap().sub_directory(0),
        Err(ConvertError::InvalidState(_))
    ));
}

#[test]
fn test_replanning_replaces_structure() {
    let scene = shared(rgb_scene(1024, 1024));
    let mut converter = TiffConverter::new();
    converter
        .create_file_layout(Arc::clone(&scene), &jpeg(ImageFormat::Svs).with_zoom_levels(3))
        .unwrap();
    assert_eq!(converter.num_pages(), 3);
    converter
        .create_file_layout(scene, &jpeg(ImageFormat::OmeTiff).with_zoom_levels(2))
        .unwrap();
    assert_eq!(converter.num_pages(), 1);
    assert_eq!(converter.page(0).unwrap().num_sub_directories(), 1);
}

// =============================================================================
// Writer Call Sequence
// =============================================================================

#[test]
fn test_write_sequence_ome() {
    let mut converter = planned(
        shared(rgb_scene(512, 512)),
        &jpeg(ImageFormat::OmeTiff).with_zoom_levels(2),
    );
    let mut writer = RecordingWriter::new();
    converter.write_to(&mut writer, "out.ome.tif", None).unwrap();
    assert_eq!(converter.state(), ConversionState::Written);

    assert!(matches!(writer.calls[0], WriterCall::SetTags(_)));
    assert_eq!(writer.calls[1], WriterCall::InitSubDirs(1));
    assert_eq!(writer.tiles_per_directory(), vec![4, 1]);
    assert_eq!(writer.tile_count(), converter.total_tiles());
    assert_eq!(
        writer.calls.iter().filter(|c| **c == WriterCall::WriteDirectory).count(),
        2
    );

    let dirs = writer.directories();
    assert_eq!((dirs[0].width, dirs[0].height), (512, 512));
    assert_eq!((dirs[1].width, dirs[1].height), (256, 256));
    assert!(!dirs[0].reduced);
    assert!(dirs[1].reduced);
    assert!(dirs[0].description.contains("<OME"));
    assert!(dirs[1].description.is_empty());
    // Resolution doubles with each level
    assert!((dirs[1].resolution.x - 2.0 * dirs[0].resolution.x).abs() < 1e-15);
}

#[test]
fn test_tiles_row_major_and_level_local() {
    let mut converter = planned(
        shared(rgb_scene(600, 300)),
        &jpeg(ImageFormat::Svs).with_zoom_levels(2),
    );
    let mut writer = RecordingWriter::new();
    converter.write_to(&mut writer, "out.svs", None).unwrap();

    let tiles: Vec<(u32, u32)> = writer
        .calls
        .iter()
        .filter_map(|c| match c {
            WriterCall::Tile { x, y, width, height } => {
                assert_eq!((*width, *height), (256, 256));
                Some((*x, *y))
            }
            _ => None,
        })
        .collect();
    // Level 0 is 3x2 tiles, level 1 (300x150) is 2x1
    assert_eq!(
        tiles,
        vec![(0, 0), (256, 0), (512, 0), (0, 256), (256, 256), (512, 256), (0, 0), (256, 0)]
    );
}

#[test]
fn test_cropped_write_uses_crop_origin() {
    let params = jpeg(ImageFormat::Svs).with_rect(Rect::new(100, 50, 256, 256));
    let mut converter = planned(shared(rgb_scene(512, 512)), &params);
    let mut writer = RecordingWriter::new();
    converter.write_to(&mut writer, "crop.svs", None).unwrap();
    assert_eq!(writer.tile_count(), 1);
    let dir = writer.directories()[0];
    assert_eq!((dir.width, dir.height), (256, 256));
    assert!(dir.description.contains("256x256(256x256)"));
}

#[test]
fn test_progress_reaches_100() {
    let mut converter = planned(
        shared(rgb_scene(1024, 512)),
        &jpeg(ImageFormat::Svs).with_zoom_levels(2),
    );
    let mut seen = Vec::new();
    let mut sink = |p: u32| seen.push(p);
    let mut writer = RecordingWriter::new();
    converter.write_to(&mut writer, "out.svs", Some(&mut sink)).unwrap();

    assert_eq!(seen.len(), converter.total_tiles());
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&100));
}

#[test]
fn test_write_before_layout() {
    let mut converter = TiffConverter::new();
    let mut writer = RecordingWriter::new();
    let err = converter.write_to(&mut writer, "x.tif", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(writer.calls.is_empty());
}
