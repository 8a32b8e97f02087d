//! External process execution.
//!
//! Every call to `ffprobe` or `ffmpeg` goes through the [`CommandRunner`]
//! trait. [`SystemRunner`] is the real implementation. It spawns the child
//! with piped output and watches it for timeout and cancellation. Tests and
//! embedders can substitute their own runner to simulate tool behaviour.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::configuration::AnalysisOptions;
use crate::error::AutoEditError;

/// How often a running child is polled for exit, timeout, and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Maximum number of stderr characters kept in [`AutoEditError::ProcessFailed`].
const STDERR_TAIL_CHARS: usize = 500;

/// A program and its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: PathBuf,
    /// Arguments, passed verbatim (no shell is involved).
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Start an invocation of `program` with no arguments.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    /// The argument following the first occurrence of `flag`, if any.
    ///
    /// ```
    /// use autoedit::Invocation;
    ///
    /// let invocation = Invocation::new("ffmpeg").args(["-af", "volume=2", "-f", "null"]);
    /// assert_eq!(invocation.value_of("-af").unwrap(), "volume=2");
    /// assert!(invocation.value_of("-i").is_none());
    /// ```
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|index| self.args.get(index + 1))
            .map(OsString::as_os_str)
    }

    /// Display name of the program, used in errors and logs.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code. `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Standard output, decoded lossily as UTF-8.
    pub stdout: String,
    /// Standard error, decoded lossily as UTF-8.
    pub stderr: String,
}

impl CommandOutput {
    /// Output of a process that exited with status 0.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Output of a process that exited with `code` and wrote `stderr`.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns `true` if the process exited with status 0.
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "termination by signal".to_string(),
        }
    }
}

/// Runs external programs.
///
/// Implementations return `Ok` for any process that ran to completion,
/// whatever its exit code; [`run_checked`] turns a non-zero exit into
/// [`AutoEditError::ProcessFailed`].
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion, honouring the timeout and
    /// cancellation token in `options`.
    fn run(
        &self,
        invocation: &Invocation,
        options: &AnalysisOptions,
    ) -> Result<CommandOutput, AutoEditError>;
}

/// [`CommandRunner`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        invocation: &Invocation,
        options: &AnalysisOptions,
    ) -> Result<CommandOutput, AutoEditError> {
        let program = invocation.program_name();
        log::debug!("Running {} {:?}", invocation.program.display(), invocation.args);

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| AutoEditError::ProcessLaunch {
                program: program.clone(),
                source,
            })?;

        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        // On timeout or cancellation the readers are left detached. A process
        // started by the tool may still hold the pipes open, and joining
        // would block until it exits.
        let status = wait_for_exit(&mut child, &program, options)?;

        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;

        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Run `invocation` and fail unless it exits with status 0.
pub fn run_checked(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
    options: &AnalysisOptions,
) -> Result<CommandOutput, AutoEditError> {
    let output = runner.run(invocation, options)?;
    if output.is_success() {
        return Ok(output);
    }

    Err(AutoEditError::ProcessFailed {
        program: invocation.program_name(),
        status: output.status_text(),
        stderr: stderr_tail(&output.stderr),
    })
}

fn wait_for_exit(
    child: &mut Child,
    program: &str,
    options: &AnalysisOptions,
) -> Result<ExitStatus, AutoEditError> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if options.is_cancelled() {
            log::debug!("Cancellation requested, killing {program}");
            kill(child);
            return Err(AutoEditError::Cancelled);
        }

        if let Some(timeout) = options.timeout() {
            if start.elapsed() > timeout {
                log::debug!("{program} exceeded {timeout:?}, killing it");
                kill(child);
                return Err(AutoEditError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut reader) = pipe {
            reader.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn join_reader(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<String, AutoEditError> {
    let bytes = handle
        .join()
        .map_err(|_| std::io::Error::other("pipe reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - STDERR_TAIL_CHARS).collect()
}
