//! End-to-end runs through the public API: file in, GIF bytes out.

use gif_rotate::config::{self, RotateConfig};
use gif_rotate::optimize::{OptimizerKind, Rescale, select_optimizer};
use gif_rotate::pipeline::{self, PipelineEvent};
use gif_rotate::source;
use gif_rotate::store::{FrameFormat, FrameStore};
use gif_rotate::types::AxisMode;
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, RgbImage};
use std::io::Cursor;
use std::sync::mpsc;
use tempfile::TempDir;

fn write_source(dir: &std::path::Path, width: u32, height: u32) -> std::path::PathBuf {
    let path = dir.join("input.png");
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 16) as u8, (y * 20) as u8, 90])
    })
    .save(&path)
    .unwrap();
    path
}

fn small_config(angles: u32) -> RotateConfig {
    let overlay: toml::Value = toml::from_str(&format!(
        "[sweep]\nangles = {angles}\n[optimize]\nbackend = \"builtin\"\n"
    ))
    .unwrap();
    config::resolve_config([overlay]).unwrap()
}

fn decode(bytes: &[u8]) -> Vec<image::Frame> {
    GifDecoder::new(Cursor::new(bytes))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap()
}

#[test]
fn png_in_gif_out() {
    let tmp = TempDir::new().unwrap();
    let input = write_source(tmp.path(), 16, 12);
    let image = source::load_source(&input, None).unwrap();
    let config = small_config(8);

    let output = pipeline::run(&image, &config, None, None, None, None).unwrap();

    let frames = decode(output.artifact.bytes());
    assert_eq!(frames.len(), 2);
    assert_eq!(output.report.sampled, vec![3, 7]);
    for frame in &frames {
        assert_eq!(frame.buffer().dimensions(), (16, 12));
        assert_eq!(frame.delay().numer_denom_ms(), (50, 1));
    }
}

#[test]
fn ideal_size_applies_to_every_frame() {
    let tmp = TempDir::new().unwrap();
    let input = write_source(tmp.path(), 32, 24);
    let ideal = source::ideal_size(Some(20), Some(10));
    let image = source::load_source(&input, ideal).unwrap();

    let output = pipeline::run(&image, &small_config(8), None, None, None, None).unwrap();
    let frames = decode(output.artifact.bytes());
    assert!(frames.iter().all(|f| f.buffer().dimensions() == (20, 10)));
    assert_eq!((output.report.width, output.report.height), (20, 10));
}

#[test]
fn same_input_same_fingerprint() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(12, 10, |x, y| {
        image::Rgb([(x * 20) as u8, (y * 25) as u8, 7])
    }));
    let config = small_config(16);
    let a = pipeline::run(&image, &config, None, None, None, None).unwrap();
    let b = pipeline::run(&image, &config, None, None, None, None).unwrap();
    assert_eq!(a.report.fingerprint, b.report.fingerprint);
    assert_eq!(a.artifact.bytes(), b.artifact.bytes());
}

#[test]
fn full_yz_sweep_skips_edge_on_angles() {
    let tmp = TempDir::new().unwrap();
    let input = write_source(tmp.path(), 12, 8);
    let image = source::load_source(&input, None).unwrap();
    let mut config = small_config(360);
    config.sweep.axis = AxisMode::Yz;

    let output = pipeline::run(&image, &config, None, None, None, None).unwrap();
    let skipped: Vec<u32> = output.report.skipped.iter().map(|s| s.angle_index).collect();
    assert_eq!(skipped, vec![90, 270]);
    assert_eq!(output.report.sampled.len(), 90);
    assert_eq!(decode(output.artifact.bytes()).len(), 90);
}

#[test]
fn frame_store_receives_every_rendered_frame() {
    let tmp = TempDir::new().unwrap();
    let input = write_source(tmp.path(), 10, 10);
    let image = source::load_source(&input, None).unwrap();
    let frames_dir = tmp.path().join("frames");
    let store = FrameStore::create(&frames_dir, FrameFormat::Jpg, 12).unwrap();

    pipeline::run(&image, &small_config(12), None, Some(&store), None, None).unwrap();
    let mut names: Vec<String> = std::fs::read_dir(&frames_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 12);
    assert_eq!(names[0], "000.jpg");
    assert_eq!(names[11], "011.jpg");

    assert_eq!(store.clear().unwrap(), 12);
    assert!(frames_dir.is_dir());
}

#[test]
fn builtin_optimizer_shrinks_output() {
    let tmp = TempDir::new().unwrap();
    let input = write_source(tmp.path(), 40, 30);
    let image = source::load_source(&input, None).unwrap();
    let mut config = small_config(8);
    config.optimize.target_bytes = 1;

    let optimizer = Rescale::default();
    let (tx, rx) = mpsc::channel();
    let output =
        pipeline::run(&image, &config, Some(&optimizer), None, None, Some(tx)).unwrap();

    assert_eq!(output.report.optimizer.as_deref(), Some("builtin"));
    assert_eq!(output.report.passes.len(), 1);
    assert!(!output.report.met_target);
    assert!(output.report.final_bytes < output.report.encoded_bytes);
    let frames = decode(output.artifact.bytes());
    assert_eq!(frames[0].buffer().dimensions(), (28, 21));

    let optimized = rx
        .into_iter()
        .any(|e| matches!(e, PipelineEvent::Optimized { .. }));
    assert!(optimized);
}

#[test]
fn selected_builtin_backend_is_usable() {
    let config = small_config(8);
    let optimizer = select_optimizer(OptimizerKind::Builtin, Default::default()).unwrap();
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30])));
    let output =
        pipeline::run(&image, &config, Some(optimizer.as_ref()), None, None, None).unwrap();
    assert_eq!(output.report.optimizer.as_deref(), Some("builtin"));
    assert_eq!(decode(output.artifact.bytes()).len(), 2);
}
