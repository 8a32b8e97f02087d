//! External FFmpeg toolchain configuration.
//!
//! `autoedit` does not link against FFmpeg. It runs the `ffprobe` and
//! `ffmpeg` executables as child processes. [`Toolchain`] records where those
//! executables live and how verbose they should be.
//!
//! # Example
//!
//! ```no_run
//! use autoedit::{ToolLogLevel, Toolchain};
//!
//! // Explicit paths, validated up front.
//! let tools = Toolchain::new("/usr/bin/ffmpeg", "/usr/bin/ffprobe")?
//!     .with_log_level(ToolLogLevel::Warning);
//!
//! // Or resolve from AUTOEDIT_FFMPEG / AUTOEDIT_FFPROBE, falling back to PATH.
//! let tools = Toolchain::from_env();
//! # Ok::<(), autoedit::AutoEditError>(())
//! ```
//!
//! # Note
//!
//! [`ToolLogLevel`] controls **the tools' own stderr output** (their `-v`
//! flag), not the Rust-side diagnostics emitted via the `log` crate.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::AutoEditError;

/// Environment variable overriding the `ffmpeg` executable.
pub const FFMPEG_ENV: &str = "AUTOEDIT_FFMPEG";
/// Environment variable overriding the `ffprobe` executable.
pub const FFPROBE_ENV: &str = "AUTOEDIT_FFPROBE";

/// Verbosity passed to the external tools through `-v`.
///
/// # Ordering (most quiet → most verbose)
///
/// `Quiet` < `Panic` < `Fatal` < `Error` < `Warning` < `Info` < `Verbose` < `Debug` < `Trace`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only log conditions the tool cannot recover from before aborting.
    Panic,
    /// Only log unrecoverable errors.
    Fatal,
    /// Log recoverable errors. This is the default, so failed runs still
    /// carry a useful stderr tail.
    #[default]
    Error,
    /// Log warnings.
    Warning,
    /// Log informational messages.
    Info,
    /// Log verbose informational messages.
    Verbose,
    /// Log debugging messages.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

impl ToolLogLevel {
    /// The value of the `-v` command-line option for this level.
    pub fn as_arg(self) -> &'static str {
        match self {
            ToolLogLevel::Quiet => "quiet",
            ToolLogLevel::Panic => "panic",
            ToolLogLevel::Fatal => "fatal",
            ToolLogLevel::Error => "error",
            ToolLogLevel::Warning => "warning",
            ToolLogLevel::Info => "info",
            ToolLogLevel::Verbose => "verbose",
            ToolLogLevel::Debug => "debug",
            ToolLogLevel::Trace => "trace",
        }
    }

    /// Parse a level name as accepted by `-v` (case-insensitive, `warn` is
    /// an alias for `warning`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Some(ToolLogLevel::Quiet),
            "panic" => Some(ToolLogLevel::Panic),
            "fatal" => Some(ToolLogLevel::Fatal),
            "error" => Some(ToolLogLevel::Error),
            "warning" | "warn" => Some(ToolLogLevel::Warning),
            "info" => Some(ToolLogLevel::Info),
            "verbose" => Some(ToolLogLevel::Verbose),
            "debug" => Some(ToolLogLevel::Debug),
            "trace" => Some(ToolLogLevel::Trace),
            _ => None,
        }
    }
}

/// Locations of the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    log_level: ToolLogLevel,
}

impl Toolchain {
    /// Use the executables at the given paths.
    ///
    /// # Errors
    ///
    /// Returns [`AutoEditError::ToolNotFound`] if either path does not
    /// point at an existing file.
    pub fn new<F: AsRef<Path>, P: AsRef<Path>>(
        ffmpeg: F,
        ffprobe: P,
    ) -> Result<Self, AutoEditError> {
        let ffmpeg = ffmpeg.as_ref().to_path_buf();
        let ffprobe = ffprobe.as_ref().to_path_buf();
        ensure_tool("ffmpeg", &ffmpeg)?;
        ensure_tool("ffprobe", &ffprobe)?;

        Ok(Self {
            ffmpeg,
            ffprobe,
            log_level: ToolLogLevel::default(),
        })
    }

    /// Resolve the executables from [`FFMPEG_ENV`] and [`FFPROBE_ENV`],
    /// falling back to bare `ffmpeg` / `ffprobe` looked up on `PATH`.
    ///
    /// Nothing is validated here; a missing tool surfaces as
    /// [`AutoEditError::ProcessLaunch`] on first use.
    pub fn from_env() -> Self {
        Self::unchecked(
            env_or(FFMPEG_ENV, "ffmpeg"),
            env_or(FFPROBE_ENV, "ffprobe"),
        )
    }

    /// Use the given program names or paths without checking that they exist.
    pub fn unchecked(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            log_level: ToolLogLevel::default(),
        }
    }

    /// Set the verbosity of the external tools.
    #[must_use]
    pub fn with_log_level(mut self, level: ToolLogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Path or program name of `ffmpeg`.
    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Path or program name of `ffprobe`.
    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }

    /// Verbosity passed to both tools.
    pub fn log_level(&self) -> ToolLogLevel {
        self.log_level
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::from_env()
    }
}

fn ensure_tool(tool: &'static str, path: &Path) -> Result<(), AutoEditError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(AutoEditError::ToolNotFound {
            tool,
            path: path.to_path_buf(),
        })
    }
}

fn env_or(key: &str, fallback: &str) -> OsString {
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| OsString::from(fallback))
}
