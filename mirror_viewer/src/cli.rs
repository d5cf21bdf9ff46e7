use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Rotating objects above a floor that reflects them through an off-screen mirror pass",
    version
)]
pub struct Args {
    /// Render a single frame off-screen instead of opening a window
    #[arg(long)]
    pub headless: bool,

    /// Elapsed seconds to render in headless mode
    #[arg(long, default_value_t = 0.0)]
    pub time: f64,

    /// Window width (also the headless frame width)
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Window height (also the headless frame height)
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// When set, write the composited headless frame to disk (PNG)
    #[arg(long)]
    pub dump_render: Option<PathBuf>,

    /// When set, write the off-screen mirror image to disk (PNG)
    #[arg(long)]
    pub dump_mirror: Option<PathBuf>,

    /// When set, write frame statistics and the pass summary as JSON
    #[arg(long)]
    pub stats_json: Option<PathBuf>,
}
