//! Recording engine for tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{Dimensions, EngineError, RasterEngine};

/// One recorded engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Dimensions(PathBuf),
    Blank(Dimensions, PathBuf),
    AppendHorizontal(Vec<PathBuf>, PathBuf),
    AppendVertical(Vec<PathBuf>, PathBuf),
    Trim(PathBuf, u8, PathBuf),
    Resize(PathBuf, u32, PathBuf),
}

impl Call {
    fn output(&self) -> Option<&Path> {
        match self {
            Call::Dimensions(_) => None,
            Call::Blank(_, out)
            | Call::AppendHorizontal(_, out)
            | Call::AppendVertical(_, out)
            | Call::Trim(_, _, out)
            | Call::Resize(_, _, out) => Some(out),
        }
    }
}

type FailWhen = Box<dyn Fn(&Call) -> bool + Send + Sync>;

/// Engine that records every call and writes a marker file as output.
pub struct RecordingEngine {
    size: Dimensions,
    calls: Mutex<Vec<Call>>,
    fail_when: Option<FailWhen>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            size: Dimensions::new(256, 256),
            calls: Mutex::new(Vec::new()),
            fail_when: None,
        }
    }

    /// Fail every call matching `predicate` with an engine error.
    pub fn failing_when(
        mut self,
        predicate: impl Fn(&Call) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Input lists of all horizontal appends, in call order.
    pub fn rows(&self) -> Vec<(Vec<PathBuf>, PathBuf)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AppendHorizontal(inputs, out) => Some((inputs, out)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> Result<(), EngineError> {
        let fail = self.fail_when.as_ref().is_some_and(|f| f(&call));
        let output = call.output().map(Path::to_path_buf);
        self.calls.lock().unwrap().push(call);

        if fail {
            return Err(EngineError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "mock failure".to_string(),
            });
        }
        if let Some(out) = output {
            fs::write(out, b"mock")?;
        }
        Ok(())
    }
}

impl RasterEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn dimensions(&self, image: &Path) -> Result<Dimensions, EngineError> {
        self.record(Call::Dimensions(image.to_path_buf()))?;
        Ok(self.size)
    }

    fn blank(&self, size: Dimensions, output: &Path) -> Result<(), EngineError> {
        self.record(Call::Blank(size, output.to_path_buf()))
    }

    fn append_horizontal(&self, inputs: &[PathBuf], output: &Path) -> Result<(), EngineError> {
        self.record(Call::AppendHorizontal(inputs.to_vec(), output.to_path_buf()))
    }

    fn append_vertical(&self, inputs: &[PathBuf], output: &Path) -> Result<(), EngineError> {
        self.record(Call::AppendVertical(inputs.to_vec(), output.to_path_buf()))
    }

    fn trim(&self, input: &Path, fuzz_percent: u8, output: &Path) -> Result<(), EngineError> {
        self.record(Call::Trim(
            input.to_path_buf(),
            fuzz_percent,
            output.to_path_buf(),
        ))
    }

    fn resize(&self, input: &Path, percent: u32, output: &Path) -> Result<(), EngineError> {
        self.record(Call::Resize(
            input.to_path_buf(),
            percent,
            output.to_path_buf(),
        ))
    }
}
