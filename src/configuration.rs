//! Analysis configuration.
//!
//! [`AnalysisOptions`] is a builder that threads timeouts, cancellation
//! tokens, progress callbacks and filter tuning through the probe and
//! analysis stages without polluting every function signature.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use autoedit::{AnalysisOptions, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let options = AnalysisOptions::new()
//!     .with_timeout(Duration::from_secs(600))
//!     .with_cancellation(token.clone())
//!     .with_reset(48);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Metadata key printed by the `ametadata` filter: overall RMS level in dB.
pub const RMS_LEVEL_KEY: &str = "lavfi.astats.Overall.RMS_level";

/// Configuration for probe and analysis operations.
///
/// All fields have sensible defaults. A default-constructed value runs the
/// tools without a timeout, uses the system temp directory for side files,
/// and derives the reset cadence from the probed sample rate.
#[derive(Clone)]
pub struct AnalysisOptions {
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
    /// Kill an external tool that runs longer than this.
    pub(crate) timeout: Option<Duration>,
    /// Directory for side files. `None` means [`std::env::temp_dir`].
    pub(crate) temp_dir: Option<PathBuf>,
    /// Explicit `astats` reset cadence, bypassing the sample-rate heuristic.
    pub(crate) reset: Option<u32>,
    /// Metadata key passed to `ametadata`.
    pub(crate) metadata_key: String,
}

impl Debug for AnalysisOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnalysisOptions")
            .field("has_progress", &true)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("timeout", &self.timeout)
            .field("temp_dir", &self.temp_dir)
            .field("reset", &self.reset)
            .field("metadata_key", &self.metadata_key)
            .finish()
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOptions {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            timeout: None,
            temp_dir: None,
            reset: None,
            metadata_key: RMS_LEVEL_KEY.to_string(),
        }
    }

    /// Attach a progress callback, invoked at each stage boundary.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled, the running tool is killed and the
    /// operation returns [`AutoEditError::Cancelled`](crate::AutoEditError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Kill an external tool that has not exited after `timeout`.
    ///
    /// A zero duration disables the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Create side files in `directory` instead of the system temp dir.
    #[must_use]
    pub fn with_temp_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(directory.into());
        self
    }

    /// Use a fixed `astats` reset cadence (in frames) instead of deriving
    /// it from the sample rate. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_reset(mut self, reset: u32) -> Self {
        self.reset = Some(reset.max(1));
        self
    }

    /// Print a different `astats` metadata key (for example
    /// `lavfi.astats.Overall.Peak_level`).
    #[must_use]
    pub fn with_metadata_key(mut self, key: impl Into<String>) -> Self {
        self.metadata_key = key.into();
        self
    }

    /// The configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The metadata key printed by the analysis filter.
    pub fn metadata_key(&self) -> &str {
        &self.metadata_key
    }

    /// The directory side files are created in.
    pub fn side_file_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
