//! Run configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::engine::{EngineKind, DEFAULT_EXECUTABLE};
use crate::error::{MergeError, MergeResult};
use crate::postprocess::{PostProcess, NO_RESIZE};
use crate::quadtree::MAX_DEPTH;

/// Default ImageMagick memory ceiling in GB.
pub const DEFAULT_MEMORY_LIMIT_GB: u32 = 8;

/// Default per-invocation engine timeout.
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 3600;

/// Default tile file extension.
pub const DEFAULT_TILE_EXTENSION: &str = "png";

/// Everything one merge run needs to know.
///
/// # Example
///
/// ```
/// use quadmerge::MergeConfig;
///
/// let config = MergeConfig::default()
///     .with_depth(Some(4))
///     .with_crop(true)
///     .with_resize_percent(50);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.memory_limit_gb(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    temp_dir: PathBuf,
    engine: EngineKind,
    executable: PathBuf,
    memory_limit_gb: u32,
    verbose: bool,
    depth: Option<u32>,
    crop: bool,
    resize_percent: u32,
    tile_extension: String,
    workers: usize,
    timeout: Duration,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            engine: EngineKind::default(),
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            memory_limit_gb: DEFAULT_MEMORY_LIMIT_GB,
            verbose: false,
            depth: None,
            crop: false,
            resize_percent: NO_RESIZE,
            tile_extension: DEFAULT_TILE_EXTENSION.to_string(),
            workers: 1,
            timeout: Duration::from_secs(DEFAULT_ENGINE_TIMEOUT_SECS),
        }
    }
}

impl MergeConfig {
    /// Root under which the scratch directory is created.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    /// ImageMagick `convert` to run; a bare name is looked up on `PATH`.
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// `0` disables the limit.
    pub fn with_memory_limit_gb(mut self, gb: u32) -> Self {
        self.memory_limit_gb = gb;
        self
    }

    /// Debug logging and engine progress output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Pyramid level to reconstruct; `None` picks the deepest.
    pub fn with_depth(mut self, depth: Option<u32>) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_crop(mut self, crop: bool) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_resize_percent(mut self, percent: u32) -> Self {
        self.resize_percent = percent;
        self
    }

    pub fn with_tile_extension(mut self, extension: impl Into<String>) -> Self {
        self.tile_extension = extension.into();
        self
    }

    /// Rows composed concurrently; `1` is sequential.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn temp_dir(&self) -> &PathBuf {
        &self.temp_dir
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn executable(&self) -> &PathBuf {
        &self.executable
    }

    pub fn memory_limit_gb(&self) -> u32 {
        self.memory_limit_gb
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn depth(&self) -> Option<u32> {
        self.depth
    }

    pub fn crop(&self) -> bool {
        self.crop
    }

    pub fn resize_percent(&self) -> u32 {
        self.resize_percent
    }

    pub fn tile_extension(&self) -> &str {
        &self.tile_extension
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Post-processing steps selected by this configuration.
    pub fn post_process(&self) -> PostProcess {
        PostProcess {
            crop: self.crop,
            resize_percent: self.resize_percent,
        }
    }

    /// Reject option values no run could use.
    pub fn validate(&self) -> MergeResult<()> {
        if self.resize_percent == 0 {
            return Err(MergeError::InvalidOption(
                "resize percentage must be greater than 0".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(MergeError::InvalidOption(
                "workers must be at least 1".to_string(),
            ));
        }
        if let Some(depth) = self.depth {
            if depth > MAX_DEPTH {
                return Err(MergeError::InvalidOption(format!(
                    "depth {} exceeds the maximum of {}",
                    depth, MAX_DEPTH
                )));
            }
        }
        if self.tile_extension.is_empty() || self.tile_extension.contains('.') {
            return Err(MergeError::InvalidOption(format!(
                "tile extension '{}' must be a bare extension like 'png'",
                self.tile_extension
            )));
        }
        if self.timeout.is_zero() {
            return Err(MergeError::InvalidOption(
                "engine timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MergeConfig::default();

        assert_eq!(config.temp_dir(), &std::env::temp_dir());
        assert_eq!(config.engine(), EngineKind::Magick);
        assert_eq!(config.executable(), &PathBuf::from("convert"));
        assert_eq!(config.memory_limit_gb(), 8);
        assert_eq!(config.depth(), None);
        assert!(!config.crop());
        assert_eq!(config.resize_percent(), 100);
        assert_eq!(config.tile_extension(), "png");
        assert_eq!(config.workers(), 1);
        assert_eq!(config.timeout(), Duration::from_secs(3600));
        assert!(config.post_process().is_noop());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = MergeConfig::default()
            .with_temp_dir("/scratch")
            .with_engine(EngineKind::Builtin)
            .with_executable("/opt/im/convert")
            .with_memory_limit_gb(0)
            .with_verbose(true)
            .with_crop(true)
            .with_resize_percent(25)
            .with_workers(4);

        assert_eq!(config.temp_dir(), &PathBuf::from("/scratch"));
        assert_eq!(config.engine(), EngineKind::Builtin);
        assert_eq!(config.memory_limit_gb(), 0);
        assert!(config.verbose());
        assert_eq!(
            config.post_process(),
            PostProcess {
                crop: true,
                resize_percent: 25
            }
        );
        assert_eq!(config.workers(), 4);
    }

    #[test]
    fn test_rejects_zero_resize() {
        let err = MergeConfig::default()
            .with_resize_percent(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("resize"));
    }

    #[test]
    fn test_rejects_zero_workers() {
        assert!(MergeConfig::default().with_workers(0).validate().is_err());
    }

    #[test]
    fn test_rejects_excessive_depth() {
        assert!(MergeConfig::default()
            .with_depth(Some(MAX_DEPTH + 1))
            .validate()
            .is_err());
        assert!(MergeConfig::default()
            .with_depth(Some(MAX_DEPTH))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rejects_dotted_extension() {
        assert!(MergeConfig::default()
            .with_tile_extension(".png")
            .validate()
            .is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(MergeConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }
}
