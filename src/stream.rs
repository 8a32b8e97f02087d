//! Async wrappers for the probe and sampling stages.
//!
//! Both stages block on an external process. The futures in this module run
//! them on `tokio::task::spawn_blocking` threads so the async runtime stays
//! responsive while `ffprobe` / `ffmpeg` work.
//!
//! # Example
//!
//! ```no_run
//! use autoedit::{AutoEditError, MediaFile, Toolchain};
//!
//! # async fn example() -> Result<(), AutoEditError> {
//! let media = MediaFile::open("input.wav", Toolchain::from_env())?;
//! let rate = media.sample_rate_async().await?;
//! let records = media.sample_loudness_async().await?;
//! println!("{rate} Hz, {:?} records", records.map(|r| r.len()));
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::error::AutoEditError;
use crate::loudness::LoudnessRecord;
use crate::probe::SamplingRateResolver;
use crate::sampler::LoudnessSampler;

/// A future that resolves to the result of
/// [`LoudnessSampler::sample_loudness`].
///
/// Dropping the future does not stop the background analysis. Use a
/// [`CancellationToken`](crate::CancellationToken) in the sampler's
/// options for that. The side file is still removed when it finishes.
pub struct LoudnessFuture {
    handle: JoinHandle<Result<Option<Vec<LoudnessRecord>>, AutoEditError>>,
}

impl Future for LoudnessFuture {
    type Output = Result<Option<Vec<LoudnessRecord>>, AutoEditError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(AutoEditError::Cancelled)))
    }
}

/// A future that resolves to the result of
/// [`SamplingRateResolver::sample_rate`].
pub struct SampleRateFuture {
    handle: JoinHandle<Result<u32, AutoEditError>>,
}

impl Future for SampleRateFuture {
    type Output = Result<u32, AutoEditError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(AutoEditError::Cancelled)))
    }
}

pub(crate) fn create_loudness_future(sampler: LoudnessSampler, input: PathBuf) -> LoudnessFuture {
    let handle = tokio::task::spawn_blocking(move || sampler.sample_loudness(&input));
    LoudnessFuture { handle }
}

pub(crate) fn create_sample_rate_future(
    resolver: SamplingRateResolver,
    input: PathBuf,
) -> SampleRateFuture {
    let handle = tokio::task::spawn_blocking(move || resolver.sample_rate(&input));
    SampleRateFuture { handle }
}
