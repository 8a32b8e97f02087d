//! Per-frame loudness records and the side-file parser.
//!
//! FFmpeg's `ametadata=print:file=...` filter writes one pair of lines per
//! audio frame:
//!
//! ```text
//! frame:3    pts:1200    pts_time:0.5
//! lavfi.astats.Overall.RMS_level=-12.34
//! ```
//!
//! [`parse_loudness_records`] turns those pairs into [`LoudnessRecord`]s. The
//! grammar is strict: a line count that is odd or below two, a missing
//! header token, or a non-numeric value fails the whole parse rather than
//! dropping a record.
//!
//! # Example
//!
//! ```
//! use autoedit::{parse_loudness_records, SILENCE_LEVEL};
//!
//! let lines = [
//!     "frame:0    pts:0       pts_time:0",
//!     "lavfi.astats.Overall.RMS_level=-inf",
//!     "frame:1    pts:1024    pts_time:0.0232",
//!     "lavfi.astats.Overall.RMS_level=-21.5",
//! ];
//! let records = parse_loudness_records(&lines)?;
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[0].level, SILENCE_LEVEL);
//! assert_eq!(records[1].level, -21.5);
//! # Ok::<(), autoedit::AutoEditError>(())
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::error::AutoEditError;

/// Level assigned to frames whose RMS level is reported as `-inf`.
///
/// This is the most negative finite `f64`, so silent frames still order
/// below every measured frame and survive arithmetic without producing NaN.
pub const SILENCE_LEVEL: f64 = f64::MIN;

/// Marker the analysis tool prints for a level of negative infinity.
const NEGATIVE_INFINITY_MARKER: &str = "-inf";

/// Loudness of one analysed audio frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoudnessRecord {
    /// Frame index as counted by the analysis tool.
    pub frame: u64,
    /// Presentation timestamp in stream time-base units.
    pub pts: f64,
    /// Presentation time in seconds.
    pub pts_time: f64,
    /// RMS level in dB, or [`SILENCE_LEVEL`] for digital silence.
    pub level: f64,
}

impl LoudnessRecord {
    /// Returns `true` if the frame was reported as `-inf` dB.
    pub fn is_silent(&self) -> bool {
        self.level == SILENCE_LEVEL
    }
}

/// Parse the raw lines of a loudness side file.
///
/// Lines are consumed as (header, value) pairs, producing one record per
/// pair in input order.
///
/// # Errors
///
/// - [`AutoEditError::UnexpectedLineCount`] if there are fewer than two
///   lines or an odd number of lines.
/// - [`AutoEditError::MalformedLoudnessData`] if a header lacks one of its
///   three leading tokens, or any number fails to parse.
pub fn parse_loudness_records<S: AsRef<str>>(
    lines: &[S],
) -> Result<Vec<LoudnessRecord>, AutoEditError> {
    if lines.len() < 2 || lines.len() % 2 != 0 {
        return Err(AutoEditError::UnexpectedLineCount(lines.len()));
    }

    lines
        .chunks_exact(2)
        .enumerate()
        .map(|(pair, chunk)| {
            let header_line = pair * 2 + 1;
            parse_pair(
                chunk[0].as_ref(),
                header_line,
                chunk[1].as_ref(),
                header_line + 1,
            )
        })
        .collect()
}

/// Read a loudness side file from disk and parse it.
///
/// Useful for inspecting a side file produced by running `ffmpeg` by hand.
pub fn parse_loudness_file<P: AsRef<Path>>(path: P) -> Result<Vec<LoudnessRecord>, AutoEditError> {
    let contents = fs::read_to_string(path)?;
    let lines: Vec<&str> = contents.lines().collect();
    parse_loudness_records(&lines)
}

fn parse_pair(
    header: &str,
    header_line: usize,
    value: &str,
    value_line: usize,
) -> Result<LoudnessRecord, AutoEditError> {
    let mut tokens = header.split_whitespace();
    let mut next_field = |name: &str| {
        tokens
            .next()
            .map(field_value)
            .ok_or_else(|| malformed(header_line, format!("missing {name} token in {header:?}")))
    };

    let frame = next_field("frame")?;
    let pts = next_field("pts")?;
    let pts_time = next_field("pts_time")?;

    Ok(LoudnessRecord {
        frame: parse_number(frame, "frame", header_line)?,
        pts: parse_timestamp(pts, "pts", header_line)?,
        pts_time: parse_timestamp(pts_time, "pts_time", header_line)?,
        level: parse_level(value, value_line)?,
    })
}

/// The part of a `key:value` token after the last `:`.
fn field_value(token: &str) -> &str {
    token.rsplit(':').next().unwrap_or(token)
}

fn parse_level(line: &str, line_number: usize) -> Result<f64, AutoEditError> {
    let raw = line.rsplit('=').next().unwrap_or(line).trim();
    if raw == NEGATIVE_INFINITY_MARKER {
        return Ok(SILENCE_LEVEL);
    }

    let level: f64 = parse_number(raw, "level", line_number)?;
    if !level.is_finite() {
        return Err(malformed(
            line_number,
            format!("level {raw:?} is not a finite number"),
        ));
    }
    Ok(level)
}

fn parse_timestamp(raw: &str, field: &str, line: usize) -> Result<f64, AutoEditError> {
    let value: f64 = parse_number(raw, field, line)?;
    if !value.is_finite() {
        return Err(malformed(
            line,
            format!("{field} value {raw:?} is not a finite number"),
        ));
    }
    Ok(value)
}

fn parse_number<T: FromStr>(raw: &str, field: &str, line: usize) -> Result<T, AutoEditError> {
    raw.parse()
        .map_err(|_| malformed(line, format!("{field} value {raw:?} is not a valid number")))
}

fn malformed(line: usize, reason: String) -> AutoEditError {
    AutoEditError::MalformedLoudnessData { line, reason }
}
