//! The [`MediaFile`] entry point.
//!
//! [`MediaFile`] binds one validated input path to a [`Toolchain`] and a
//! [`CommandRunner`], and hands out the probe and sampling stages for it.
//!
//! # Example
//!
//! ```no_run
//! use autoedit::{MediaFile, Toolchain};
//!
//! let tools = Toolchain::new("/usr/bin/ffmpeg", "/usr/bin/ffprobe")?;
//! let media = MediaFile::open("input.wav", tools)?;
//!
//! println!("sample rate: {}", media.resolve_sampling_rate());
//! if let Some(records) = media.sample_loudness()? {
//!     println!("{} frames analysed", records.len());
//! }
//! # Ok::<(), autoedit::AutoEditError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::command::{CommandRunner, SystemRunner};
use crate::configuration::AnalysisOptions;
use crate::error::AutoEditError;
use crate::ffmpeg::Toolchain;
use crate::loudness::LoudnessRecord;
use crate::probe::{ProbeReport, SamplingRateResolver};
use crate::sampler::LoudnessSampler;

/// A media file ready for loudness analysis.
#[derive(Clone)]
pub struct MediaFile {
    path: PathBuf,
    toolchain: Toolchain,
    runner: Arc<dyn CommandRunner>,
    options: AnalysisOptions,
}

impl MediaFile {
    /// Bind `path` to `toolchain`, running the tools as real processes.
    ///
    /// # Errors
    ///
    /// Returns [`AutoEditError::FileOpen`] if `path` is not an existing file.
    pub fn open<P: AsRef<Path>>(path: P, toolchain: Toolchain) -> Result<Self, AutoEditError> {
        Self::open_with_runner(path, toolchain, Arc::new(SystemRunner))
    }

    /// Bind `path` to `toolchain`, running the tools through `runner`.
    pub fn open_with_runner<P: AsRef<Path>>(
        path: P,
        toolchain: Toolchain,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, AutoEditError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AutoEditError::FileOpen {
                path: path.to_path_buf(),
                reason: "Path to input file does not exist".to_string(),
            });
        }

        log::debug!("Opened {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            toolchain,
            runner,
            options: AnalysisOptions::default(),
        })
    }

    /// Replace the analysis options used by every stage.
    #[must_use]
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// The input path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The toolchain used for both stages.
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// A resolver configured with this file's toolchain, runner and options.
    pub fn resolver(&self) -> SamplingRateResolver {
        SamplingRateResolver::with_runner(self.toolchain.clone(), self.runner.clone())
            .with_options(self.options.clone())
    }

    /// A sampler configured with this file's toolchain, runner and options.
    pub fn sampler(&self) -> LoudnessSampler {
        self.sampler_with_options(self.options.clone())
    }

    /// A sampler configured with this file's toolchain and runner, and `options`.
    pub fn sampler_with_options(&self, options: AnalysisOptions) -> LoudnessSampler {
        LoudnessSampler::with_runner(self.toolchain.clone(), self.runner.clone())
            .with_options(options)
    }

    /// Full `ffprobe` stream report.
    pub fn probe(&self) -> Result<ProbeReport, AutoEditError> {
        self.resolver().probe(&self.path)
    }

    /// Sample rate of the first audio stream.
    ///
    /// See [`SamplingRateResolver::sample_rate`].
    pub fn sample_rate(&self) -> Result<u32, AutoEditError> {
        self.resolver().sample_rate(&self.path)
    }

    /// Sample rate of the first audio stream, or
    /// [`SAMPLE_RATE_UNRESOLVED`](crate::SAMPLE_RATE_UNRESOLVED).
    pub fn resolve_sampling_rate(&self) -> i64 {
        self.resolver().resolve_sampling_rate(&self.path)
    }

    /// Per-frame loudness, or `None` when the tools failed.
    ///
    /// See [`LoudnessSampler::sample_loudness`].
    pub fn sample_loudness(&self) -> Result<Option<Vec<LoudnessRecord>>, AutoEditError> {
        self.sampler().sample_loudness(&self.path)
    }

    /// Per-frame loudness, propagating every failure.
    pub fn try_sample_loudness(&self) -> Result<Vec<LoudnessRecord>, AutoEditError> {
        self.sampler().try_sample_loudness(&self.path)
    }

    /// Run [`sample_loudness`](Self::sample_loudness) on a blocking thread.
    #[cfg(feature = "async")]
    pub fn sample_loudness_async(&self) -> crate::stream::LoudnessFuture {
        crate::stream::create_loudness_future(self.sampler(), self.path.clone())
    }

    /// Run [`sample_rate`](Self::sample_rate) on a blocking thread.
    #[cfg(feature = "async")]
    pub fn sample_rate_async(&self) -> crate::stream::SampleRateFuture {
        crate::stream::create_sample_rate_future(self.resolver(), self.path.clone())
    }
}
