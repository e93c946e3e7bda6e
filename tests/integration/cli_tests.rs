//! Command-line tests.
//!
//! Tests verify:
//! - Options map onto conversion parameters for a real image file
//! - The binary's info-only mode, conversion and exit codes

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use clap::Parser;
use image::{Rgb, RgbImage};

use slide_converter::format::tiff::TiffTag;
use slide_converter::{open_scene, Cli, ImageFormat, Scene, TiffConverter};

use super::test_utils::scan_tiff;

/// Write a 640x480 RGB PNG into `dir`.
fn write_png(dir: &Path) -> PathBuf {
    let path = dir.join("input.png");
    let img = RgbImage::from_fn(640, 480, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    img.save(&path).unwrap();
    path
}

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_slide-converter"))
}

// =============================================================================
// Parameter Building
// =============================================================================

#[test]
fn test_cli_parameters_for_png() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path());
    let output = dir.path().join("out.svs");

    let cli = Cli::try_parse_from([
        "slide-converter",
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "-f",
        "SVS",
        "-m",
        "Jpeg",
        "-t",
        "256",
        "-r",
        "0,0,512,256",
    ])
    .unwrap();
    cli.validate().unwrap();

    let scene: Arc<dyn Scene> = Arc::from(open_scene(&cli.input, &cli.driver, cli.scene_index).unwrap());
    assert_eq!(scene.num_channels(), 3);
    let params = cli.to_parameters(scene.as_ref()).unwrap();
    assert_eq!(params.format, ImageFormat::Svs);

    let mut converter = TiffConverter::new();
    converter.create_file_layout(scene, &params).unwrap();
    assert_eq!(converter.total_tiles(), 2);
}

#[test]
fn test_cli_unknown_driver() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path());
    let cli = Cli::try_parse_from([
        "slide-converter",
        input.to_str().unwrap(),
        "out.tif",
        "--driver",
        "NDPI",
    ])
    .unwrap();
    assert!(open_scene(&cli.input, &cli.driver, cli.scene_index).is_err());
}

#[test]
fn test_cli_rejects_bad_format() {
    assert!(Cli::try_parse_from(["slide-converter", "a.png", "b.tif", "-f", "PNG"]).is_err());
    assert!(Cli::try_parse_from(["slide-converter", "a.png"]).is_err());
}

// =============================================================================
// Binary
// =============================================================================

#[test]
fn test_binary_info_only() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path());
    let output = dir.path().join("info.ome.tif");

    let result = binary()
        .arg(&input)
        .arg(&output)
        .args(["-i", "-m", "Jpeg", "-t", "256"])
        .output()
        .unwrap();
    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Info-only mode: Conversion skipped."));
    assert!(!output.exists());
}

#[test]
fn test_binary_json_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path());
    let output = dir.path().join("info.svs");

    let result = binary()
        .arg(&input)
        .arg(&output)
        .args(["-i", "-f", "SVS", "-m", "Jpeg", "--output-format", "json"])
        .output()
        .unwrap();
    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    let json_text = stdout.trim_end().trim_end_matches("Info-only mode: Conversion skipped.");
    let json: serde_json::Value = serde_json::from_str(json_text.trim()).unwrap();
    assert_eq!(json["scene"]["channels"], 3);
    assert_eq!(json["structure"]["pages"].as_array().unwrap().len(), 1);
}

#[test]
fn test_binary_converts() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path());
    let output = dir.path().join("out.svs");

    let result = binary()
        .arg(&input)
        .arg(&output)
        .args(["-s", "-f", "SVS", "-m", "Jpeg", "-t", "256", "-z", "2"])
        .output()
        .unwrap();
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let tiff = scan_tiff(std::fs::read(&output).unwrap());
    assert_eq!(tiff.directories.len(), 2);
    assert_eq!(tiff.size(&tiff.directories[1]), (320, 240));
}

#[test]
fn test_binary_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path());
    let output = dir.path().join("progress.ome.tif");

    let result = binary().arg(&input).arg(&output).output().unwrap();
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Conversion completed successfully."));
    assert!(stdout.contains("Elapsed time:"));

    let tiff = scan_tiff(std::fs::read(&output).unwrap());
    let top = &tiff.directories[0];
    assert_eq!(tiff.size(top), (640, 480));
    assert_eq!(tiff.value(top, TiffTag::Compression), Some(7));
}

#[test]
fn test_binary_jpeg2000_is_plan_only() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path());
    let output = dir.path().join("j2k.ome.tif");

    let planned = binary()
        .arg(&input)
        .arg(&output)
        .args(["-i", "-m", "Jpeg2000"])
        .output()
        .unwrap();
    assert!(planned.status.success());

    let written = binary()
        .arg(&input)
        .arg(&output)
        .args(["-s", "-m", "Jpeg2000"])
        .output()
        .unwrap();
    assert_eq!(written.status.code(), Some(1));
    assert!(!output.exists());
}

#[test]
fn test_binary_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path());
    let output = dir.path().join("out.svs");
    std::fs::write(&output, b"old").unwrap();

    let args = ["-s", "-f", "SVS", "-m", "Jpeg", "-t", "256"];
    let refused = binary().arg(&input).arg(&output).args(args).output().unwrap();
    assert_eq!(refused.status.code(), Some(1));
    assert_eq!(std::fs::read(&output).unwrap(), b"old");

    let replaced = binary()
        .arg(&input)
        .arg(&output)
        .args(args)
        .arg("--delete-if-exists")
        .output()
        .unwrap();
    assert!(replaced.status.success());
    assert_eq!(&std::fs::read(&output).unwrap()[0..2], b"II");
}

#[test]
fn test_binary_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let result = binary()
        .arg(dir.path().join("missing.png"))
        .arg(dir.path().join("out.tif"))
        .output()
        .unwrap();
    assert_eq!(result.status.code(), Some(1));
}
