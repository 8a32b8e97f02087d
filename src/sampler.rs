//! Loudness sampling through `ffmpeg`'s `astats` filter.
//!
//! [`LoudnessSampler`] resolves the sample rate, runs `ffmpeg` with an
//! `astats,ametadata` filter chain that prints the per-frame RMS level to a
//! side file, and parses that file with
//! [`parse_loudness_records`](crate::parse_loudness_records).
//!
//! The side file gets a random name in the temp directory. It is removed
//! when its guard drops, so every exit path deletes it, including errors
//! and cancellation.
//!
//! # Example
//!
//! ```no_run
//! use autoedit::{LoudnessSampler, Toolchain};
//!
//! let sampler = LoudnessSampler::new(Toolchain::from_env());
//! if let Some(records) = sampler.sample_loudness("input.wav")? {
//!     for record in records.iter().take(5) {
//!         println!("{:>8.3}s {:>8.2} dB", record.pts_time, record.level);
//!     }
//! }
//! # Ok::<(), autoedit::AutoEditError>(())
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempPath;

use crate::command::{CommandRunner, Invocation, SystemRunner, run_checked};
use crate::configuration::AnalysisOptions;
use crate::error::AutoEditError;
use crate::ffmpeg::Toolchain;
use crate::loudness::{LoudnessRecord, parse_loudness_records};
use crate::probe::SamplingRateResolver;
use crate::progress::{OperationType, ProgressTracker};

const SIDE_FILE_PREFIX: &str = "autoedit-";
const SIDE_FILE_SUFFIX: &str = ".loudness";

/// `astats` reset cadence for a sample rate: `sample_rate / 1000`.
///
/// `astats` with `metadata=1` reports once per audio frame and restarts its
/// running statistics every `reset` frames. Dividing the sample rate by
/// 1000 gives roughly one window per second for common frame sizes. It is a
/// heuristic, not an exact time unit.
///
/// ```
/// assert_eq!(autoedit::reset_cadence(48_000), 48);
/// assert_eq!(autoedit::reset_cadence(44_100), 44);
/// assert_eq!(autoedit::reset_cadence(8_000), 8);
/// ```
pub fn reset_cadence(sample_rate: u32) -> u32 {
    sample_rate / 1000
}

/// Build the `-af` filter expression for the analysis pass.
///
/// ```
/// use std::path::Path;
///
/// let filter = autoedit::loudness_filter(48, "lavfi.astats.Overall.RMS_level", Path::new("/tmp/side"));
/// assert_eq!(
///     filter,
///     "astats=metadata=1:reset=48,ametadata=print:key=lavfi.astats.Overall.RMS_level:file=/tmp/side"
/// );
/// ```
pub fn loudness_filter(reset: u32, metadata_key: &str, side_file: &Path) -> String {
    format!(
        "astats=metadata=1:reset={reset},ametadata=print:key={metadata_key}:file={}",
        escape_filter_value(&side_file.to_string_lossy())
    )
}

/// Escape characters that are special inside a filtergraph option value.
///
/// ```
/// assert_eq!(autoedit::escape_filter_value("/tmp/a.txt"), "/tmp/a.txt");
/// assert_eq!(autoedit::escape_filter_value(r"C:\tmp\a.txt"), r"C\:\\tmp\\a.txt");
/// ```
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ':' | '\'' | ',' | ';' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Samples per-frame loudness of media files with `ffmpeg`.
#[derive(Clone)]
pub struct LoudnessSampler {
    toolchain: Toolchain,
    runner: Arc<dyn CommandRunner>,
    options: AnalysisOptions,
}

impl LoudnessSampler {
    /// Create a sampler that runs the real `ffprobe` and `ffmpeg`.
    pub fn new(toolchain: Toolchain) -> Self {
        Self::with_runner(toolchain, Arc::new(SystemRunner))
    }

    /// Create a sampler that runs both tools through `runner`.
    pub fn with_runner(toolchain: Toolchain, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            toolchain,
            runner,
            options: AnalysisOptions::default(),
        }
    }

    /// Apply timeout, cancellation, progress and filter settings.
    #[must_use]
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// The resolver used for the probe stage.
    pub fn resolver(&self) -> SamplingRateResolver {
        SamplingRateResolver::with_runner(self.toolchain.clone(), self.runner.clone())
            .with_options(self.options.clone())
    }

    /// The `ffmpeg` invocation for `input` with the given cadence and side file.
    pub fn analysis_invocation(&self, input: &Path, reset: u32, side_file: &Path) -> Invocation {
        Invocation::new(self.toolchain.ffmpeg())
            .args(["-hide_banner", "-nostdin"])
            .args(["-v", self.toolchain.log_level().as_arg()])
            .arg("-i")
            .arg(input)
            .arg("-af")
            .arg(loudness_filter(reset, self.options.metadata_key(), side_file))
            .args(["-f", "null", "-"])
    }

    /// Per-frame loudness of `input`, or `None` if no data could be produced.
    ///
    /// Tool failures, timeouts, cancellation and side-file I/O errors are
    /// logged and reported as `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`AutoEditError::UnexpectedLineCount`] or
    /// [`AutoEditError::MalformedLoudnessData`] when the side file does not
    /// follow the expected format. These usually mean the installed `ffmpeg`
    /// writes a different format, which callers need to know about.
    pub fn sample_loudness<P: AsRef<Path>>(
        &self,
        input: P,
    ) -> Result<Option<Vec<LoudnessRecord>>, AutoEditError> {
        let input = input.as_ref();
        match self.try_sample_loudness(input) {
            Ok(records) => Ok(Some(records)),
            Err(error) if error.is_data_format() => Err(error),
            Err(error) if error.is_process_failure() => {
                log::error!(
                    "Failed to get audio loudness info for {}: external tool failed: {error}",
                    input.display()
                );
                Ok(None)
            }
            Err(error) => {
                log::error!(
                    "Failed to get audio loudness info for {}: {error}",
                    input.display()
                );
                Ok(None)
            }
        }
    }

    /// Per-frame loudness of `input`, propagating every failure.
    pub fn try_sample_loudness<P: AsRef<Path>>(
        &self,
        input: P,
    ) -> Result<Vec<LoudnessRecord>, AutoEditError> {
        let input = input.as_ref();
        let reset = match self.options.reset {
            Some(reset) => reset,
            None => reset_cadence(self.resolver().sample_rate(input)?),
        };

        let tracker = ProgressTracker::new(self.options.progress.clone());
        let side_file = self.create_side_file()?;
        log::debug!(
            "Sampling loudness of {} (reset={reset}, side file {})",
            input.display(),
            side_file.display()
        );

        tracker.begin(OperationType::Analysis);
        let invocation = self.analysis_invocation(input, reset, &side_file);
        run_checked(self.runner.as_ref(), &invocation, &self.options)?;
        tracker.finish(OperationType::Analysis, None);

        tracker.begin(OperationType::Parsing);
        let contents = fs::read_to_string(&side_file)?;
        let lines: Vec<&str> = contents.lines().collect();
        let records = parse_loudness_records(&lines)?;
        tracker.finish(OperationType::Parsing, Some(records.len()));

        log::info!(
            "Sampled {} loudness records from {}",
            records.len(),
            input.display()
        );
        Ok(records)
    }

    /// Reserve a uniquely named, closed side file that is deleted on drop.
    fn create_side_file(&self) -> Result<TempPath, AutoEditError> {
        let file = tempfile::Builder::new()
            .prefix(SIDE_FILE_PREFIX)
            .suffix(SIDE_FILE_SUFFIX)
            .tempfile_in(self.options.side_file_dir())?;
        Ok(file.into_temp_path())
    }
}
