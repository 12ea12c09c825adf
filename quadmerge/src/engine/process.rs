//! Subprocess execution with a deadline.
//!
//! `std::process` has no timed wait, so the child is polled with `try_wait`
//! while two helper threads drain stdout and stderr (a full pipe would
//! otherwise stall the child forever).
//!
//! Children started with a [`RunningChildren`] set are listed there until
//! they exit, so an interrupt handler can kill them before quadmerge exits.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::process::{Child, Command, Output, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::EngineError;

/// How often a running child is checked for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What happens to a child's stderr while it runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StderrMode {
    /// Keep it for error reports only.
    #[default]
    Capture,
    /// Also copy it to our own stderr as it arrives, e.g. ImageMagick
    /// `-monitor` progress.
    Forward,
}

/// Engine processes that are still running.
///
/// Clones share one set.
#[derive(Debug, Clone, Default)]
pub struct RunningChildren {
    inner: Arc<Mutex<BTreeMap<u32, Arc<Mutex<Child>>>>>,
}

impl RunningChildren {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kill every child in the set and return how many were signalled.
    ///
    /// The thread waiting on each child still reaps it.
    pub fn kill_all(&self) -> usize {
        let running: Vec<_> = lock(&self.inner).values().cloned().collect();
        for child in &running {
            let mut child = lock(child);
            if let Err(e) = child.kill() {
                debug!(pid = child.id(), error = %e, "Engine process already gone");
            }
        }
        running.len()
    }

    fn register(&self, child: &Arc<Mutex<Child>>) -> Registration<'_> {
        let id = lock(child).id();
        lock(&self.inner).insert(id, Arc::clone(child));
        Registration { children: self, id }
    }
}

/// Removes a child from its [`RunningChildren`] set when dropped.
struct Registration<'a> {
    children: &'a RunningChildren,
    id: u32,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        lock(&self.children.inner).remove(&self.id);
    }
}

/// Settings for one child process.
#[derive(Debug, Clone)]
pub struct RunOptions {
    timeout: Duration,
    stderr: StderrMode,
    children: Option<RunningChildren>,
}

impl RunOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            stderr: StderrMode::Capture,
            children: None,
        }
    }

    pub fn with_stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }

    /// List the child in `children` while it runs.
    pub fn with_children(mut self, children: RunningChildren) -> Self {
        self.children = Some(children);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stderr(&self) -> StderrMode {
        self.stderr
    }
}

/// Run `command` to completion or until `timeout` expires.
///
/// On expiry the child is killed and reaped before `TimedOut` is returned.
/// A non-zero exit is *not* an error here; see [`run_checked`].
pub fn run_with_timeout(command: Command, timeout: Duration) -> Result<Output, EngineError> {
    run_with_options(command, &RunOptions::new(timeout))
}

/// [`run_with_timeout`] with stderr forwarding and child tracking.
pub fn run_with_options(mut command: Command, options: &RunOptions) -> Result<Output, EngineError> {
    let program = command.get_program().to_string_lossy().to_string();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    {
        let args: Vec<_> = command.get_args().collect();
        debug!(program = %program, args = ?args, "Spawning engine");
    }

    let mut child = command
        .spawn()
        .map_err(|source| EngineError::Spawn { program, source })?;

    let stdout = child.stdout.take().map(|out| drain(out, StderrMode::Capture));
    let stderr = child.stderr.take().map(|err| drain(err, options.stderr));

    let child = Arc::new(Mutex::new(child));
    let _registration = options.children.as_ref().map(|set| set.register(&child));

    let deadline = Instant::now() + options.timeout;
    let status = loop {
        let mut running = lock(&child);
        if let Some(status) = running.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            warn!(timeout = ?options.timeout, "Engine invocation timed out, killing it");
            let _ = running.kill();
            let _ = running.wait();
            return Err(EngineError::TimedOut {
                timeout: options.timeout,
            });
        }
        drop(running);
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

/// Run `command` and return its stdout, failing on a non-zero exit.
///
/// The error carries the engine's own stderr so the operator sees exactly
/// what the engine complained about.
pub fn run_checked(command: Command, timeout: Duration) -> Result<Vec<u8>, EngineError> {
    run_checked_with(command, &RunOptions::new(timeout))
}

/// [`run_checked`] with stderr forwarding and child tracking.
pub fn run_checked_with(command: Command, options: &RunOptions) -> Result<Vec<u8>, EngineError> {
    let output = run_with_options(command, options)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::Failed {
            status: output.status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(output.stdout)
}

fn drain<R: Read + Send + 'static>(reader: R, mode: StderrMode) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || match mode {
        StderrMode::Capture => copy_echoing(reader, io::sink()),
        StderrMode::Forward => copy_echoing(reader, io::stderr()),
    })
}

/// Read `reader` to the end, writing each chunk to `echo` as it arrives.
fn copy_echoing<R: Read, W: Write>(mut reader: R, mut echo: W) -> Vec<u8> {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                kept.extend_from_slice(&chunk[..n]);
                // Progress lines end in '\r', so flush every chunk
                let _ = echo.write_all(&chunk[..n]).and_then(|()| echo.flush());
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    kept
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
