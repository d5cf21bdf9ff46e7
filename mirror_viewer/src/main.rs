use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use mirror_scene::{Extent, FramePlan, Light, MeshData, PassSummary, SceneConfig, load_mesh};
use mirror_viewer::{FrameStats, HeadlessRenderer, OBJECT_MESH_PATH, app, cli::Args};
use serde::Serialize;
use winit::dpi::PhysicalSize;

#[derive(Debug, Serialize)]
struct RenderReport {
    elapsed: f64,
    phase: f32,
    window: Extent,
    mirror_extent: Extent,
    /// Eye-space lights of the direct and mirrored views.
    direct_light: Light,
    mirror_light: Light,
    passes: Vec<PassSummary>,
    frame: FrameStats,
    mirror: FrameStats,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    ensure!(
        args.time.is_finite() && args.time >= 0.0,
        "--time must be a non-negative number of seconds (got {})",
        args.time
    );
    ensure!(
        args.width > 0 && args.height > 0,
        "window size must be non-zero (got {}x{})",
        args.width,
        args.height
    );

    let mesh = load_mesh(Path::new(OBJECT_MESH_PATH))
        .with_context(|| format!("loading object mesh {OBJECT_MESH_PATH}"))?;
    println!(
        "Loaded {} ({} vertices, {} triangles)",
        mesh.name,
        mesh.vertices.len(),
        mesh.triangle_count()
    );
    if let Some((min, max)) = mesh.bounds() {
        log::info!("object bounds {min} .. {max}");
    }

    if args.headless {
        return render_headless(&args, &mesh);
    }

    app::run(&mesh, PhysicalSize::new(args.width, args.height))
}

fn render_headless(args: &Args, mesh: &MeshData) -> Result<()> {
    let extent = Extent::new(args.width, args.height);
    let mut renderer = HeadlessRenderer::new(SceneConfig::default(), mesh, extent)
        .context("initializing headless renderer")?;
    let plan = renderer.plan(args.time);
    log_plan(&plan);

    let frame = renderer.render_plan(&plan)?;
    let mirror = renderer.capture_mirror()?;

    if let Some(path) = args.dump_render.as_ref() {
        frame
            .export_png(path)
            .with_context(|| format!("writing PNG to {}", path.display()))?;
        println!("Frame exported to {}", path.display());
    }
    if let Some(path) = args.dump_mirror.as_ref() {
        mirror
            .export_png(path)
            .with_context(|| format!("writing PNG to {}", path.display()))?;
        println!("Mirror image exported to {}", path.display());
    }

    let frame_stats = frame.stats();
    let mirror_stats = mirror.stats();
    // The floor covers the lower half of the window.
    let half = frame.height / 2;
    println!(
        "  frame {}x{} luminance avg {:.2}, min {}, max {}, upper half {:.2}, lower half {:.2}",
        frame_stats.width,
        frame_stats.height,
        frame_stats.mean_luma,
        frame_stats.min_luma,
        frame_stats.max_luma,
        frame.band_mean_luma(0..half),
        frame.band_mean_luma(half..frame.height)
    );
    println!(
        "  mirror {}x{} luminance avg {:.2}, min {}, max {}",
        mirror_stats.width,
        mirror_stats.height,
        mirror_stats.mean_luma,
        mirror_stats.min_luma,
        mirror_stats.max_luma
    );

    if let Some(path) = args.stats_json.as_ref() {
        let report = RenderReport {
            elapsed: args.time,
            phase: plan.t,
            window: plan.window,
            mirror_extent: renderer.planner().offscreen_extent(),
            direct_light: renderer.planner().direct_light(),
            mirror_light: renderer.planner().mirror_light(),
            passes: plan.passes().iter().map(|pass| pass.summary()).collect(),
            frame: frame_stats,
            mirror: mirror_stats,
        };
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &report)
            .with_context(|| format!("writing stats to {}", path.display()))?;
        println!("Stats written to {}", path.display());
    }
    Ok(())
}

fn log_plan(plan: &FramePlan) {
    for pass in plan.passes() {
        let summary = pass.summary();
        log::info!(
            "{}: {:?} {}x{} cull {:?} program {:?} cleared {} draws {}",
            summary.label,
            summary.target,
            summary.viewport.width,
            summary.viewport.height,
            summary.cull,
            summary.program,
            summary.cleared,
            summary.draws
        );
    }
}
