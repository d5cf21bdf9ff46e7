use std::path::Path;

use anyhow::Result;
use mirror_scene::{Extent, SceneConfig, load_mesh};
use mirror_viewer::{FrameCapture, HeadlessRenderer, OBJECT_MESH_PATH, SetupError};

/// Bob peak of the first hop: every object sits at its highest point.
const PEAK_SECONDS: f64 = 10.0 / 36.0;

fn try_headless(extent: Extent) -> Result<HeadlessRenderer, SetupError> {
    let mesh = load_mesh(Path::new(OBJECT_MESH_PATH)).expect("object mesh");
    HeadlessRenderer::new(SceneConfig::default(), &mesh, extent)
}

fn headless(extent: Extent) -> Option<HeadlessRenderer> {
    match try_headless(extent) {
        Ok(renderer) => Some(renderer),
        Err(SetupError::NoAdapter) => {
            eprintln!("skipping: no GPU adapter available");
            None
        }
        Err(err) => panic!("headless setup failed: {err}"),
    }
}

fn differing_pixels(a: &FrameCapture, b: &FrameCapture, rows: std::ops::Range<u32>) -> usize {
    let row_bytes = a.width as usize * 4;
    let span = rows.start as usize * row_bytes..rows.end as usize * row_bytes;
    a.data[span.clone()]
        .chunks_exact(4)
        .zip(b.data[span].chunks_exact(4))
        .filter(|(x, y)| x != y)
        .count()
}

#[test]
fn same_time_renders_identical_frames() -> Result<()> {
    let Some(mut renderer) = headless(Extent::new(320, 180)) else {
        return Ok(());
    };
    let first = renderer.render(3.3)?;
    let first_mirror = renderer.capture_mirror()?;
    let second = renderer.render(3.3)?;
    let second_mirror = renderer.capture_mirror()?;
    assert_eq!(first, second);
    assert_eq!(first_mirror, second_mirror);
    Ok(())
}

#[test]
fn resize_keeps_mirror_resolution() -> Result<()> {
    let Some(mut renderer) = headless(Extent::new(320, 180)) else {
        return Ok(());
    };
    let before = renderer.render(1.0)?;
    assert_eq!((before.width, before.height), (320, 180));
    assert_eq!(renderer.capture_mirror()?.width, 1024);

    renderer.resize(Extent::new(200, 300))?;
    let after = renderer.render(1.0)?;
    assert_eq!((after.width, after.height), (200, 300));
    assert_eq!(after.data.len(), 200 * 300 * 4);
    let mirror = renderer.capture_mirror()?;
    assert_eq!((mirror.width, mirror.height), (1024, 1024));
    Ok(())
}

#[test]
fn mirror_content_reaches_the_floor() -> Result<()> {
    let extent = Extent::new(320, 240);
    let Some(mut renderer) = headless(extent) else {
        return Ok(());
    };
    let plan = renderer.plan(PEAK_SECONDS);
    let mut empty_mirror = plan.clone();
    empty_mirror.mirror.draws.clear();

    let reflected = renderer.render_plan(&plan)?;
    let reflected_mirror = renderer.capture_mirror()?;
    let unreflected = renderer.render_plan(&empty_mirror)?;
    let unreflected_mirror = renderer.capture_mirror()?;

    assert_ne!(reflected_mirror, unreflected_mirror);
    // The whole floor projects below the image center, so mirror content
    // can only change the lower half.
    let half = extent.height / 2;
    assert_eq!(differing_pixels(&reflected, &unreflected, 0..half), 0);
    assert!(differing_pixels(&reflected, &unreflected, half..extent.height) > 0);
    assert_eq!(
        reflected.band_mean_luma(0..half),
        unreflected.band_mean_luma(0..half)
    );
    assert_ne!(
        reflected.band_mean_luma(half..extent.height),
        unreflected.band_mean_luma(half..extent.height)
    );
    Ok(())
}

#[test]
fn frames_show_lit_geometry() -> Result<()> {
    let Some(mut renderer) = headless(Extent::new(256, 256)) else {
        return Ok(());
    };
    let stats = renderer.render(PEAK_SECONDS)?.stats();
    assert_eq!((stats.width, stats.height), (256, 256));
    assert!(stats.max_luma > stats.min_luma);
    Ok(())
}

#[test]
fn plans_for_another_extent_are_rejected() {
    let Some(mut renderer) = headless(Extent::new(160, 120)) else {
        return;
    };
    let plan = renderer.planner().plan(0.0, Extent::new(640, 480));
    let err = renderer.render_plan(&plan).expect_err("extent mismatch");
    assert!(err.to_string().contains("640x480"));
}

#[test]
fn png_dump_round_trips() -> Result<()> {
    let Some(mut renderer) = headless(Extent::new(96, 64)) else {
        return Ok(());
    };
    let frame = renderer.render(0.5)?;
    let temp = tempfile::tempdir()?;
    let path = temp.path().join("frame.png");
    frame.export_png(&path)?;
    let decoded = image::open(&path)?.to_rgba8();
    assert_eq!(decoded.dimensions(), (96, 64));
    assert_eq!(decoded.into_raw(), frame.data);
    Ok(())
}

#[test]
fn oversized_window_extent_is_a_setup_error() {
    match try_headless(Extent::new(40000, 16)) {
        Err(SetupError::NoAdapter) => eprintln!("skipping: no GPU adapter available"),
        Err(SetupError::Framebuffer(message)) => {
            assert!(message.contains("40000x16"), "{message}")
        }
        Err(err) => panic!("unexpected setup error: {err}"),
        Ok(_) => panic!("40000x16 window accepted"),
    }
}

#[test]
fn oversized_resize_keeps_the_previous_extent() -> Result<()> {
    let Some(mut renderer) = headless(Extent::new(64, 48)) else {
        return Ok(());
    };
    let err = renderer
        .resize(Extent::new(16, 40000))
        .expect_err("oversized resize");
    assert!(matches!(err, SetupError::Framebuffer(_)));
    assert_eq!(renderer.extent(), Extent::new(64, 48));
    let frame = renderer.render(0.25)?;
    assert_eq!((frame.width, frame.height), (64, 48));
    Ok(())
}
