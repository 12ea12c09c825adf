//! ImageMagick backend.
//!
//! Every operation is one `convert` invocation. Argument lists are built by
//! plain functions so they can be checked without ImageMagick installed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use super::process::{run_checked, run_checked_with, RunOptions, RunningChildren, StderrMode};
use super::{Dimensions, EngineError, RasterEngine};

/// Executable looked up on `PATH` when none is configured.
pub const DEFAULT_EXECUTABLE: &str = "convert";

/// Raster engine that shells out to ImageMagick.
#[derive(Debug, Clone)]
pub struct MagickEngine {
    executable: PathBuf,
    memory_limit_gb: u32,
    monitor: bool,
    timeout: Duration,
    temp_dir: Option<PathBuf>,
    children: RunningChildren,
}

impl Default for MagickEngine {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTABLE)
    }
}

impl MagickEngine {
    /// Create an engine that runs `executable`.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            memory_limit_gb: 8,
            monitor: false,
            timeout: Duration::from_secs(3600),
            temp_dir: None,
            children: RunningChildren::new(),
        }
    }

    /// Cap ImageMagick's pixel cache memory; `0` leaves ImageMagick's default.
    pub fn with_memory_limit_gb(mut self, gb: u32) -> Self {
        self.memory_limit_gb = gb;
        self
    }

    /// Pass `-monitor` so ImageMagick reports progress, and forward its
    /// stderr to ours while each invocation runs.
    pub fn with_monitor(mut self, monitor: bool) -> Self {
        self.monitor = monitor;
        self
    }

    /// Kill any single invocation that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory ImageMagick spills its pixel cache into.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Track running invocations in `children` instead of a private set.
    pub fn with_children(mut self, children: RunningChildren) -> Self {
        self.children = children;
        self
    }

    /// Invocations currently running.
    pub fn children(&self) -> &RunningChildren {
        &self.children
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Check that the executable can be started at all.
    ///
    /// Gives a clear install hint up front instead of failing on the first
    /// row with a bare spawn error.
    pub fn check_available(&self) -> Result<(), EngineError> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-version");
        run_checked(cmd, Duration::from_secs(30)).map(|_| ())
    }

    /// Options placed before every operation.
    fn global_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if self.monitor {
            args.push("-monitor".into());
        }
        if self.memory_limit_gb > 0 {
            args.push("-limit".into());
            args.push("memory".into());
            args.push(format!("{}GB", self.memory_limit_gb).into());
        }
        args
    }

    fn command(&self, op_args: Vec<OsString>) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(self.global_args()).args(op_args);
        if let Some(dir) = &self.temp_dir {
            cmd.env("MAGICK_TEMPORARY_PATH", dir);
            cmd.env("MAGICK_TMPDIR", dir);
        }
        cmd
    }

    fn run_options(&self) -> RunOptions {
        let stderr = if self.monitor {
            StderrMode::Forward
        } else {
            StderrMode::Capture
        };
        RunOptions::new(self.timeout)
            .with_stderr(stderr)
            .with_children(self.children.clone())
    }

    fn run(&self, op_args: Vec<OsString>) -> Result<Vec<u8>, EngineError> {
        run_checked_with(self.command(op_args), &self.run_options())
    }
}

impl RasterEngine for MagickEngine {
    fn name(&self) -> &str {
        "imagemagick"
    }

    fn dimensions(&self, image: &Path) -> Result<Dimensions, EngineError> {
        let stdout = self.run(identify_args(image))?;
        let dims = parse_dimensions(&stdout)?;
        debug!(image = %image.display(), size = %dims, "Probed image size");
        Ok(dims)
    }

    fn blank(&self, size: Dimensions, output: &Path) -> Result<(), EngineError> {
        self.run(blank_args(size, output)).map(|_| ())
    }

    fn append_horizontal(&self, inputs: &[PathBuf], output: &Path) -> Result<(), EngineError> {
        if inputs.is_empty() {
            return Err(EngineError::NoInputs);
        }
        self.run(append_args(inputs, Direction::Horizontal, output))
            .map(|_| ())
    }

    fn append_vertical(&self, inputs: &[PathBuf], output: &Path) -> Result<(), EngineError> {
        if inputs.is_empty() {
            return Err(EngineError::NoInputs);
        }
        self.run(append_args(inputs, Direction::Vertical, output))
            .map(|_| ())
    }

    fn trim(&self, input: &Path, fuzz_percent: u8, output: &Path) -> Result<(), EngineError> {
        self.run(trim_args(input, fuzz_percent, output)).map(|_| ())
    }

    fn resize(&self, input: &Path, percent: u32, output: &Path) -> Result<(), EngineError> {
        self.run(resize_args(input, percent, output)).map(|_| ())
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Horizontal,
    Vertical,
}

fn identify_args(image: &Path) -> Vec<OsString> {
    vec![
        image.into(),
        "-format".into(),
        "%wx%h".into(),
        "info:".into(),
    ]
}

fn blank_args(size: Dimensions, output: &Path) -> Vec<OsString> {
    vec![
        "-size".into(),
        size.to_string().into(),
        "xc:none".into(),
        output.into(),
    ]
}

fn append_args(inputs: &[PathBuf], direction: Direction, output: &Path) -> Vec<OsString> {
    let operator = match direction {
        Direction::Horizontal => "+append",
        Direction::Vertical => "-append",
    };

    let mut args: Vec<OsString> = inputs.iter().map(|p| p.into()).collect();
    args.push(operator.into());
    args.push(output.into());
    args
}

fn trim_args(input: &Path, fuzz_percent: u8, output: &Path) -> Vec<OsString> {
    vec![
        input.into(),
        "-fuzz".into(),
        format!("{}%", fuzz_percent).into(),
        "-trim".into(),
        "+repage".into(),
        output.into(),
    ]
}

fn resize_args(input: &Path, percent: u32, output: &Path) -> Vec<OsString> {
    vec![
        input.into(),
        "-resize".into(),
        format!("{}%", percent).into(),
        output.into(),
    ]
}

/// Parse the `WxH` line printed by `-format %wx%h info:`.
fn parse_dimensions(stdout: &[u8]) -> Result<Dimensions, EngineError> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();

    let parsed = text.split_once('x').and_then(|(w, h)| {
        let width = w.trim().parse::<u32>().ok()?;
        let height = h.trim().parse::<u32>().ok()?;
        Some(Dimensions::new(width, height))
    });

    match parsed {
        Some(dims) if dims.width > 0 && dims.height > 0 => Ok(dims),
        _ => Err(EngineError::UnexpectedOutput(format!(
            "expected WIDTHxHEIGHT, got '{}'",
            text
        ))),
    }
}
