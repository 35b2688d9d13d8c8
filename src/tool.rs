//! Invocation of external command-line tools.
//!
//! Tools are started from an argument vector (never through a shell), their
//! output pipes are drained on helper threads, and a child still running at
//! the deadline is killed.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::FpsynthError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished tool run.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` with `args` on behalf of `item`.
///
/// A tool that cannot be started is an [`FpsynthError::ExternalToolFailure`];
/// one still running after `timeout` is killed and reported as
/// [`FpsynthError::ExternalToolTimeout`]. A non-zero exit status is returned
/// to the caller, which knows what output the tool should have produced.
pub fn run_tool<I, S>(
    tool: &str,
    program: &Path,
    args: I,
    item: &Path,
    timeout: Duration,
) -> Result<ToolOutput, FpsynthError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| FpsynthError::ExternalToolFailure {
            tool: tool.to_string(),
            path: item.to_path_buf(),
            message: format!("could not start {}: {err}", program.display()),
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_with_deadline(&mut child, timeout).map_err(|err| match err {
        WaitError::TimedOut => FpsynthError::ExternalToolTimeout {
            tool: tool.to_string(),
            path: item.to_path_buf(),
            timeout,
        },
        WaitError::Io(err) => FpsynthError::ExternalToolFailure {
            tool: tool.to_string(),
            path: item.to_path_buf(),
            message: format!("could not wait for {}: {err}", program.display()),
        },
    })?;

    Ok(ToolOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

/// `<prefix>.<extension>`, keeping any dots already in the prefix.
pub fn with_suffix(prefix: &Path, extension: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

enum WaitError {
    TimedOut,
    Io(std::io::Error),
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<ExitStatus, WaitError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait().map_err(WaitError::Io)? {
            Some(status) => return Ok(status),
            None if Instant::now() >= deadline => {
                // The child may exit between try_wait and kill.
                let _ = child.kill();
                let _ = child.wait();
                return Err(WaitError::TimedOut);
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
