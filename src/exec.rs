//! Child execution: spawn the target once per trial, feed it the candidate
//! input, enforce a wall-clock timeout and collect its output.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// Wall-clock budget for a single child run.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(5);

/// How a candidate input reaches the target: piped through standard input,
/// or written to a file named on the target's command line before each run.
#[derive(Debug, Clone)]
pub enum ExecutionInput {
    Stdin {
        program: PathBuf,
        timeout: Duration,
        input: Vec<u8>,
    },
    File {
        program: PathBuf,
        timeout: Duration,
        path: PathBuf,
    },
}

impl ExecutionInput {
    pub fn stdin(program: PathBuf, timeout: Duration) -> Self {
        Self::Stdin {
            program,
            timeout,
            input: Vec::new(),
        }
    }

    pub fn file(program: PathBuf, timeout: Duration, path: PathBuf) -> Self {
        Self::File {
            program,
            timeout,
            path,
        }
    }

    /// Stage the candidate bytes for the next run.
    pub fn set_input(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Self::Stdin { input, .. } => {
                *input = bytes.to_vec();
                Ok(())
            }
            Self::File { path, .. } => fs::write(path, bytes),
        }
    }

    pub fn program(&self) -> &Path {
        match self {
            Self::Stdin { program, .. } | Self::File { program, .. } => program,
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            Self::Stdin { timeout, .. } | Self::File { timeout, .. } => *timeout,
        }
    }

    pub fn arguments(&self) -> Vec<OsString> {
        match self {
            Self::Stdin { .. } => Vec::new(),
            Self::File { path, .. } => vec![path.clone().into_os_string()],
        }
    }

    fn stdin_bytes(&self) -> &[u8] {
        match self {
            Self::Stdin { input, .. } => input,
            Self::File { .. } => &[],
        }
    }
}

/// Outcome of one child run. Stdout is captured only on request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: Option<Vec<u8>>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

fn drain<R: Read>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        // Read errors leave whatever arrived; a broken pipe is not a failed run.
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}

/// Run the target once.
///
/// The input bytes are written to the child's stdin and the pipe is closed
/// before waiting, so a target that reads to EOF cannot deadlock. Stderr is
/// fully drained before returning. On timeout the child is killed and reaped
/// and the result carries `timed_out = true, exit_code = -1`.
pub fn run_with_timeout(
    input: &ExecutionInput,
    capture_stdout: bool,
) -> io::Result<ExecutionResult> {
    let start = Instant::now();

    let mut child = Command::new(input.program())
        .args(input.arguments())
        .stdin(Stdio::piped())
        .stdout(if capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stderr(Stdio::piped())
        .spawn()?;

    let stdin_bytes = input.stdin_bytes().to_vec();
    let stdin_pipe = child.stdin.take();
    let writer = thread::spawn(move || {
        if let Some(mut pipe) = stdin_pipe {
            // EPIPE from a target that exited without reading is expected.
            let _ = pipe.write_all(&stdin_bytes);
        }
    });

    let stderr_pipe = child.stderr.take();
    let stderr_reader = thread::spawn(move || drain(stderr_pipe));
    let stdout_reader = if capture_stdout {
        let stdout_pipe = child.stdout.take();
        Some(thread::spawn(move || drain(stdout_pipe)))
    } else {
        None
    };

    let deadline = start + input.timeout();
    let (status, timed_out) = loop {
        if let Some(status) = child.try_wait()? {
            break (Some(status), false);
        }
        if Instant::now() >= deadline {
            let _ = kill(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
            let _ = child.wait();
            break (None, true);
        }
        thread::sleep(Duration::from_millis(1));
    };
    let elapsed = start.elapsed();

    let _ = writer.join();
    let stderr = stderr_reader.join().unwrap_or_default();
    let stdout = stdout_reader.map(|reader| reader.join().unwrap_or_default());

    let exit_code = match status {
        Some(status) => status
            .code()
            .or_else(|| status.signal().map(|sig| 128 + sig))
            .unwrap_or(-1),
        None => -1,
    };

    Ok(ExecutionResult {
        exit_code,
        stdout,
        stderr,
        timed_out,
        elapsed,
    })
}
