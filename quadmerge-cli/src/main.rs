//! Quadmerge CLI - Command-line interface
//!
//! Merges a quadtree tile pyramid, as written by map renderers, into one
//! flat PNG image.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use quadmerge::EngineKind;

use commands::merge::MergeArgs;

/// Raster engine selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum EngineArg {
    /// ImageMagick `convert` (handles maps larger than memory)
    Magick,
    /// In-process engine (no ImageMagick needed, holds the map in memory)
    Builtin,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Magick => EngineKind::Magick,
            EngineArg::Builtin => EngineKind::Builtin,
        }
    }
}

#[derive(Parser)]
#[command(name = "quadmerge")]
#[command(version, about = "Merge quadtree map tiles into a single image", long_about = None)]
struct Args {
    /// Input tile pyramid directory (or a single tile image)
    input: PathBuf,

    /// Output image file; ".png" is appended if missing
    output: PathBuf,

    /// Directory for temporary files [default: system temp directory]
    #[arg(short, long)]
    temp: Option<PathBuf>,

    /// Location of the ImageMagick convert executable [default: convert]
    #[arg(short = 'e', long)]
    convert_executable: Option<PathBuf>,

    /// Memory limit in GB for ImageMagick, 0 for no limit [default: 8]
    #[arg(short, long)]
    mem: Option<u32>,

    /// Pyramid level to merge; 0 picks the deepest level
    #[arg(short, long, default_value_t = 0)]
    depth: u32,

    /// Debug logging, and run ImageMagick with -monitor
    #[arg(short, long)]
    verbose: bool,

    /// Crop the final image by removing the uniform border around it
    #[arg(short, long)]
    crop: bool,

    /// Resize the final image to a percentage of its size, e.g. 50
    #[arg(short, long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    resize: u32,

    /// Raster engine [default: magick]
    #[arg(long, value_enum)]
    engine: Option<EngineArg>,

    /// Rows to compose at the same time [default: 1]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    workers: Option<u64>,

    /// Seconds a single engine invocation may run [default: 3600]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Configuration file [default: <config dir>/quadmerge/config.ini]
    #[arg(long)]
    config: Option<PathBuf>,
}

impl From<Args> for MergeArgs {
    fn from(args: Args) -> Self {
        MergeArgs {
            input: args.input,
            output: args.output,
            temp: args.temp,
            convert_executable: args.convert_executable,
            mem: args.mem,
            depth: (args.depth > 0).then_some(args.depth),
            verbose: args.verbose,
            crop: args.crop,
            resize: args.resize,
            engine: args.engine.map(EngineKind::from),
            workers: args.workers.map(|n| n as usize),
            timeout_secs: args.timeout,
            config: args.config,
        }
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = commands::merge::run(args.into()) {
        e.exit();
    }
}
