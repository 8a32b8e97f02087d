//! Sample-rate probing through `ffprobe`.
//!
//! [`SamplingRateResolver`] runs `ffprobe -show_streams -of json` against a
//! media file, deserializes the report into [`StreamDescriptor`]s, and picks
//! the sample rate of the first audio stream.
//!
//! Two entry points are offered:
//!
//! - [`SamplingRateResolver::sample_rate`] returns a `Result` that keeps
//!   "no audio stream" apart from "ffprobe failed".
//! - [`SamplingRateResolver::resolve_sampling_rate`] collapses every failure
//!   into [`SAMPLE_RATE_UNRESOLVED`] and never returns an error.
//!
//! # Example
//!
//! ```no_run
//! use autoedit::{SamplingRateResolver, Toolchain};
//!
//! let resolver = SamplingRateResolver::new(Toolchain::from_env());
//! match resolver.sample_rate("input.wav") {
//!     Ok(rate) => println!("{rate} Hz"),
//!     Err(err) => eprintln!("probe failed: {err}"),
//! }
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::command::{CommandRunner, Invocation, SystemRunner, run_checked};
use crate::configuration::AnalysisOptions;
use crate::error::AutoEditError;
use crate::ffmpeg::Toolchain;
use crate::progress::{OperationType, ProgressTracker};

/// Value returned by [`SamplingRateResolver::resolve_sampling_rate`] when the
/// sample rate could not be determined.
pub const SAMPLE_RATE_UNRESOLVED: i64 = -1;

/// Root object of `ffprobe -show_streams -of json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeReport {
    /// One entry per stream in the container, in container order.
    #[serde(default)]
    pub streams: Vec<StreamDescriptor>,
}

impl ProbeReport {
    /// Deserialize a probe report from `ffprobe`'s standard output.
    ///
    /// Empty output is treated as a report with no streams.
    pub fn parse(json: &str) -> Result<Self, AutoEditError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// The first stream that carries audio.
    pub fn first_audio_stream(&self) -> Option<&StreamDescriptor> {
        self.streams.iter().find(|stream| stream.is_audio())
    }

    /// Sample rate of the first audio stream.
    ///
    /// # Errors
    ///
    /// Returns [`AutoEditError::NoAudioStream`] if no stream qualifies or the
    /// first audio stream has no positive rate.
    pub fn sample_rate(&self) -> Result<u32, AutoEditError> {
        self.first_audio_stream()
            .and_then(|stream| stream.sample_rate)
            .filter(|&rate| rate > 0)
            .ok_or(AutoEditError::NoAudioStream)
    }
}

/// One stream of a probe report.
///
/// Only the fields relevant to loudness analysis are kept. Every field is
/// optional because `ffprobe` omits keys that do not apply to a stream type.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamDescriptor {
    pub index: u32,
    pub codec_name: Option<String>,
    pub codec_long_name: Option<String>,
    /// `"audio"`, `"video"`, `"subtitle"`, `"data"`, ...
    pub codec_type: Option<String>,
    pub codec_time_base: Option<String>,
    pub codec_tag_string: Option<String>,
    pub codec_tag: Option<String>,
    pub sample_fmt: Option<String>,
    /// Sample rate in hertz. `ffprobe` prints it as a JSON string.
    #[serde(deserialize_with = "lenient_u32")]
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub bits_per_sample: Option<u32>,
    pub r_frame_rate: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub time_base: Option<String>,
    pub duration_ts: Option<i64>,
    pub duration: Option<String>,
    pub bit_rate: Option<String>,
}

impl StreamDescriptor {
    /// Returns `true` for audio streams.
    ///
    /// A stream without a `codec_type` counts as audio when it reports a
    /// positive sample rate.
    pub fn is_audio(&self) -> bool {
        match self.codec_type.as_deref() {
            Some(kind) => kind == "audio",
            None => self.sample_rate.is_some_and(|rate| rate > 0),
        }
    }
}

impl Display for StreamDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "#{} {} ({})",
            self.index,
            self.codec_type.as_deref().unwrap_or("unknown"),
            self.codec_name.as_deref().unwrap_or("unknown codec"),
        )?;
        if let Some(rate) = self.sample_rate {
            write!(f, " {rate} Hz")?;
        }
        if let Some(channels) = self.channels {
            write!(f, " {channels} ch")?;
        }
        Ok(())
    }
}

/// Accept a `u32` written either as a JSON number or a numeric string.
/// Anything else (including `"N/A"`) becomes `None`.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        Text(String),
    }

    Ok(
        match Option::<NumberOrString>::deserialize(deserializer)? {
            Some(NumberOrString::Number(value)) => u32::try_from(value).ok(),
            Some(NumberOrString::Text(text)) => text.trim().parse().ok(),
            None => None,
        },
    )
}

/// Resolves the audio sample rate of media files with `ffprobe`.
#[derive(Clone)]
pub struct SamplingRateResolver {
    toolchain: Toolchain,
    runner: Arc<dyn CommandRunner>,
    options: AnalysisOptions,
}

impl SamplingRateResolver {
    /// Create a resolver that runs the real `ffprobe`.
    pub fn new(toolchain: Toolchain) -> Self {
        Self::with_runner(toolchain, Arc::new(SystemRunner))
    }

    /// Create a resolver that runs `ffprobe` through `runner`.
    pub fn with_runner(toolchain: Toolchain, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            toolchain,
            runner,
            options: AnalysisOptions::default(),
        }
    }

    /// Apply timeout, cancellation and progress settings.
    #[must_use]
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// The `ffprobe` invocation used for `path`.
    pub fn probe_invocation(&self, path: &Path) -> Invocation {
        Invocation::new(self.toolchain.ffprobe())
            .args(["-v", self.toolchain.log_level().as_arg()])
            .args(["-show_streams", "-of", "json"])
            .arg(path)
    }

    /// Run `ffprobe` and return the full stream report.
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> Result<ProbeReport, AutoEditError> {
        let invocation = self.probe_invocation(path.as_ref());
        let output = run_checked(self.runner.as_ref(), &invocation, &self.options)?;
        ProbeReport::parse(&output.stdout)
    }

    /// Sample rate of the first audio stream in `path`.
    ///
    /// # Errors
    ///
    /// - [`AutoEditError::NoAudioStream`] if the file has no audio stream.
    /// - [`AutoEditError::ProcessLaunch`], [`AutoEditError::ProcessFailed`],
    ///   [`AutoEditError::Timeout`] or [`AutoEditError::Cancelled`] if
    ///   `ffprobe` did not complete successfully.
    /// - [`AutoEditError::ProbeOutput`] if its output is not valid JSON.
    pub fn sample_rate<P: AsRef<Path>>(&self, path: P) -> Result<u32, AutoEditError> {
        let path = path.as_ref();
        let tracker = ProgressTracker::new(self.options.progress.clone());
        tracker.begin(OperationType::Probe);

        let rate = self.probe(path)?.sample_rate()?;
        log::debug!("Resolved sample rate of {} to {rate} Hz", path.display());

        tracker.finish(OperationType::Probe, None);
        Ok(rate)
    }

    /// Sample rate of the first audio stream in `path`, or
    /// [`SAMPLE_RATE_UNRESOLVED`] on any failure.
    ///
    /// Failures are logged and never propagated, so a missing audio stream
    /// and a crashed `ffprobe` look the same to the caller. Use
    /// [`sample_rate`](Self::sample_rate) to tell them apart.
    pub fn resolve_sampling_rate<P: AsRef<Path>>(&self, path: P) -> i64 {
        let path = path.as_ref();
        match self.sample_rate(path) {
            Ok(rate) => i64::from(rate),
            Err(error) => {
                log::warn!(
                    "Failed to get audio sampling rate for {}: {error}",
                    path.display()
                );
                SAMPLE_RATE_UNRESOLVED
            }
        }
    }
}
