//! Error types for the `autoedit` crate.
//!
//! This module defines [`AutoEditError`], the unified error type returned by
//! all fallible operations in the crate. Variants fall into four groups:
//! external process failures, I/O failures, data format failures, and
//! precondition failures (missing tools or inputs).

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use thiserror::Error;

/// The unified error type for all `autoedit` operations.
///
/// Every public method that can fail returns `Result<T, AutoEditError>`.
/// Variants carry enough context to diagnose the problem without needing
/// additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AutoEditError {
    /// The input media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::MediaFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// An external tool executable does not exist at the configured path.
    #[error("{tool} not found at {path}")]
    ToolNotFound {
        /// Tool name (`"ffmpeg"` or `"ffprobe"`).
        tool: &'static str,
        /// Path that was checked.
        path: PathBuf,
    },

    /// An external tool could not be started.
    #[error("Failed to launch {program}: {source}")]
    ProcessLaunch {
        /// Program that was being launched.
        program: String,
        /// Error reported by the operating system.
        source: IoError,
    },

    /// An external tool exited with a non-zero status.
    #[error("{program} exited with {status}: {stderr}")]
    ProcessFailed {
        /// Program that failed.
        program: String,
        /// Exit status of the process, as reported by the operating system.
        status: String,
        /// Trailing portion of the process's standard error.
        stderr: String,
    },

    /// An external tool ran longer than the configured timeout and was killed.
    #[error("{program} timed out after {timeout:?}")]
    Timeout {
        /// Program that was killed.
        program: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// The probe report contained no audio stream.
    #[error("No audio stream found in file")]
    NoAudioStream,

    /// The probe report could not be deserialized.
    #[error("Invalid probe output: {0}")]
    ProbeOutput(String),

    /// The loudness side file does not hold a whole, non-empty number of
    /// header/value line pairs.
    #[error("Unexpected loudness data: expected an even number of lines (at least 2), got {0}")]
    UnexpectedLineCount(usize),

    /// A line of the loudness side file could not be parsed.
    #[error("Malformed loudness data at line {line}: {reason}")]
    MalformedLoudnessData {
        /// 1-based line number within the side file.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// An I/O error occurred while creating, reading, or deleting files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl AutoEditError {
    /// Returns `true` for errors that mean the analysis output does not
    /// match the expected format.
    ///
    /// These are never converted into an empty result by
    /// [`LoudnessSampler::sample_loudness`](crate::LoudnessSampler::sample_loudness),
    /// because they usually indicate a tool version mismatch.
    pub fn is_data_format(&self) -> bool {
        matches!(
            self,
            AutoEditError::UnexpectedLineCount(_) | AutoEditError::MalformedLoudnessData { .. }
        )
    }

    /// Returns `true` for errors raised by launching or running an external tool.
    pub fn is_process_failure(&self) -> bool {
        matches!(
            self,
            AutoEditError::ProcessLaunch { .. }
                | AutoEditError::ProcessFailed { .. }
                | AutoEditError::Timeout { .. }
                | AutoEditError::Cancelled
        )
    }
}

impl From<serde_json::Error> for AutoEditError {
    fn from(error: serde_json::Error) -> Self {
        AutoEditError::ProbeOutput(error.to_string())
    }
}
