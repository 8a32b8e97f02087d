//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for observing the stages of a
//! loudness analysis, [`CancellationToken`] for cooperative cancellation of
//! the external tool invocations, and [`ProgressInfo`] for stage snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use autoedit::{
//!     AnalysisOptions, AutoEditError, MediaFile, ProgressCallback, ProgressInfo, Toolchain,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {:?} elapsed", info.operation, info.elapsed);
//!     }
//! }
//!
//! let options = AnalysisOptions::new().with_progress(Arc::new(PrintProgress));
//! let media = MediaFile::open("input.wav", Toolchain::from_env())?;
//! let records = media.sampler_with_options(options).try_sample_loudness(media.path())?;
//! # Ok::<(), AutoEditError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The analysis stage a progress report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Running the probe tool to find the sample rate.
    Probe,
    /// Running the analysis tool that writes the side file.
    Analysis,
    /// Parsing the side file into loudness records.
    Parsing,
}

/// A snapshot of analysis progress.
///
/// One report is delivered when each stage starts and one when it
/// finishes.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which stage is being reported.
    pub operation: OperationType,
    /// `true` once the stage has completed successfully.
    pub finished: bool,
    /// Wall-clock time elapsed since the analysis started.
    pub elapsed: Duration,
    /// Number of loudness records produced so far (parsing stage only).
    pub records: Option<usize>,
}

/// Trait for receiving progress updates during analysis.
///
/// Implementations must be [`Send`] and [`Sync`] because analyses may run
/// on a blocking worker thread when the `async` feature is used.
///
/// Progress callbacks are **infallible**. They observe but cannot halt the
/// operation. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called at each stage boundary.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to request
/// cancellation. A running external tool is killed at the next poll and the
/// operation returns [`AutoEditError::Cancelled`](crate::AutoEditError::Cancelled).
///
/// # Example
///
/// ```
/// use autoedit::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal helper that timestamps stage reports.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>) -> Self {
        Self {
            callback,
            start_time: Instant::now(),
        }
    }

    pub(crate) fn begin(&self, operation: OperationType) {
        self.report(operation, false, None);
    }

    pub(crate) fn finish(&self, operation: OperationType, records: Option<usize>) {
        self.report(operation, true, records);
    }

    fn report(&self, operation: OperationType, finished: bool, records: Option<usize>) {
        let info = ProgressInfo {
            operation,
            finished,
            elapsed: self.start_time.elapsed(),
            records,
        };
        self.callback.on_progress(&info);
    }
}
