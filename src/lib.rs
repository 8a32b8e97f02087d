//! # autoedit
//!
//! Per-frame audio loudness extraction for media files, driven by the
//! `ffprobe` and `ffmpeg` command-line tools.
//!
//! `autoedit` runs a two-stage pipeline:
//!
//! 1. **Probe**: `ffprobe -show_streams -of json` finds the sample rate of
//!    the first audio stream.
//! 2. **Sample**: `ffmpeg` runs an `astats,ametadata` filter chain that
//!    prints each frame's RMS level to a side file. That file is parsed into
//!    an ordered `Vec<LoudnessRecord>` and then deleted.
//!
//! ## Quick Start
//!
//! ```no_run
//! use autoedit::{MediaFile, Toolchain};
//!
//! let media = MediaFile::open("input.wav", Toolchain::from_env())?;
//! match media.sample_loudness()? {
//!     Some(records) => {
//!         for record in &records {
//!             println!("{:>10.3}s  {:>8.2} dB", record.pts_time, record.level);
//!         }
//!     }
//!     None => eprintln!("ffmpeg could not analyse the file"),
//! }
//! # Ok::<(), autoedit::AutoEditError>(())
//! ```
//!
//! ### Parse an Existing Side File
//!
//! ```no_run
//! let records = autoedit::parse_loudness_file("loudness.txt")?;
//! # Ok::<(), autoedit::AutoEditError>(())
//! ```
//!
//! ## Failure Model
//!
//! - Tool and I/O failures make [`MediaFile::sample_loudness`] return
//!   `Ok(None)` after logging through the [`log`](https://crates.io/crates/log)
//!   facade, and [`MediaFile::resolve_sampling_rate`] return
//!   [`SAMPLE_RATE_UNRESOLVED`].
//! - Malformed side-file content is always an `Err`, because it points at
//!   an `ffmpeg` version whose output this crate does not understand.
//! - The `try_*` / [`MediaFile::sample_rate`] variants propagate every
//!   failure as a typed [`AutoEditError`].
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | `LoudnessFuture` and `SampleRateFuture` that run the tools on Tokio blocking threads |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! `ffmpeg` and `ffprobe` must be installed. They are looked up on `PATH`
//! unless `AUTOEDIT_FFMPEG` / `AUTOEDIT_FFPROBE` or an explicit
//! [`Toolchain`] say otherwise.

pub mod command;
pub mod configuration;
pub mod error;
pub mod ffmpeg;
pub mod loudness;
pub mod media;
pub mod probe;
pub mod progress;
pub mod sampler;
#[cfg(feature = "async")]
pub mod stream;

pub use command::{CommandOutput, CommandRunner, Invocation, SystemRunner, run_checked};
pub use configuration::{AnalysisOptions, RMS_LEVEL_KEY};
pub use error::AutoEditError;
pub use ffmpeg::{FFMPEG_ENV, FFPROBE_ENV, ToolLogLevel, Toolchain};
pub use loudness::{LoudnessRecord, SILENCE_LEVEL, parse_loudness_file, parse_loudness_records};
pub use media::MediaFile;
pub use probe::{ProbeReport, SAMPLE_RATE_UNRESOLVED, SamplingRateResolver, StreamDescriptor};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use sampler::{LoudnessSampler, escape_filter_value, loudness_filter, reset_cadence};
#[cfg(feature = "async")]
pub use stream::{LoudnessFuture, SampleRateFuture};
