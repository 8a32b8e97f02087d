//! Scripted stand-ins for `ffprobe` and `ffmpeg`.
//!
//! [`ScriptedRunner`] answers probe invocations with canned JSON and
//! simulates the analysis pass by writing (or not writing) the side file
//! named in the `-af` filter expression.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autoedit::{
    AnalysisOptions, AutoEditError, CommandOutput, CommandRunner, Invocation, MediaFile, Toolchain,
};

pub const WAV_PROBE_JSON: &str = r#"{
    "streams": [
        {
            "index": 0,
            "codec_name": "pcm_s16le",
            "codec_long_name": "PCM signed 16-bit little-endian",
            "codec_type": "audio",
            "codec_tag_string": "[1][0][0][0]",
            "codec_tag": "0x0001",
            "sample_fmt": "s16",
            "sample_rate": "48000",
            "channels": 2,
            "bits_per_sample": 16,
            "r_frame_rate": "0/0",
            "avg_frame_rate": "0/0",
            "time_base": "1/48000",
            "duration_ts": 2880000,
            "duration": "60.000000",
            "bit_rate": "1536000",
            "disposition": { "default": 0, "dub": 0, "original": 0 }
        }
    ]
}"#;

pub const SIDE_FILE_TWO_FRAMES: &str = "frame:0    pts:0       pts_time:0\n\
lavfi.astats.Overall.RMS_level=-inf\n\
frame:1    pts:1024    pts_time:0.0213333\n\
lavfi.astats.Overall.RMS_level=-23.456\n";

/// What the simulated `ffmpeg` does.
#[derive(Debug, Clone)]
pub enum Analysis {
    /// Write `contents` to the side file and exit 0.
    Write(String),
    /// Write `partial` to the side file, then exit with `code`.
    Fail { code: i32, partial: String },
    /// Remove the side file and exit 0.
    DeleteSideFile,
    /// Fail to launch.
    Launch,
    /// Write `partial` to the side file, then report cancellation.
    Cancelled { partial: String },
    /// Write `partial` to the side file, then report a timeout.
    TimedOut { partial: String },
}

pub struct ScriptedRunner {
    probe: CommandOutput,
    analysis: Analysis,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new(probe: CommandOutput, analysis: Analysis) -> Arc<Self> {
        Arc::new(Self {
            probe,
            analysis,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// A runner whose probe reports a 48 kHz stream and whose analysis
    /// writes `side_file`.
    pub fn writing(side_file: &str) -> Arc<Self> {
        Self::new(
            CommandOutput::success(WAV_PROBE_JSON),
            Analysis::Write(side_file.to_string()),
        )
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn analysis_calls(&self) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|call| call.program == Path::new("ffmpeg"))
            .collect()
    }

    /// Side-file paths of every analysis invocation so far.
    pub fn side_files(&self) -> Vec<PathBuf> {
        self.analysis_calls()
            .iter()
            .map(|call| side_file_of(call).expect("analysis call without side file"))
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        invocation: &Invocation,
        _options: &AnalysisOptions,
    ) -> Result<CommandOutput, AutoEditError> {
        self.calls.lock().unwrap().push(invocation.clone());

        if invocation.program == Path::new("ffprobe") {
            return Ok(self.probe.clone());
        }

        let side_file = side_file_of(invocation).expect("analysis call without side file");
        match &self.analysis {
            Analysis::Write(contents) => {
                fs::write(&side_file, contents)?;
                Ok(CommandOutput::success(""))
            }
            Analysis::Fail { code, partial } => {
                fs::write(&side_file, partial)?;
                Ok(CommandOutput::failure(*code, "Invalid data found when processing input"))
            }
            Analysis::DeleteSideFile => {
                fs::remove_file(&side_file)?;
                Ok(CommandOutput::success(""))
            }
            Analysis::Launch => Err(AutoEditError::ProcessLaunch {
                program: "ffmpeg".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            }),
            Analysis::Cancelled { partial } => {
                fs::write(&side_file, partial)?;
                Err(AutoEditError::Cancelled)
            }
            Analysis::TimedOut { partial } => {
                fs::write(&side_file, partial)?;
                Err(AutoEditError::Timeout {
                    program: "ffmpeg".to_string(),
                    timeout: Duration::from_secs(1),
                })
            }
        }
    }
}

/// Extract and unescape the `file=` option of the `-af` filter expression.
pub fn side_file_of(invocation: &Invocation) -> Option<PathBuf> {
    let filter = invocation.value_of("-af")?.to_string_lossy().into_owned();
    let escaped = &filter[filter.find(":file=")? + ":file=".len()..];

    let mut path = String::new();
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            path.extend(chars.next());
        } else {
            path.push(c);
        }
    }
    Some(PathBuf::from(path))
}

pub fn scripted_toolchain() -> Toolchain {
    Toolchain::unchecked("ffmpeg", "ffprobe")
}

/// A real (empty) input file plus a private side-file directory.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub input: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let input = dir.path().join("input.wav");
        fs::write(&input, b"RIFF").expect("Failed to write input");
        fs::create_dir(dir.path().join("side")).expect("Failed to create side dir");
        Self { dir, input }
    }

    pub fn side_dir(&self) -> PathBuf {
        self.dir.path().join("side")
    }

    pub fn options(&self) -> AnalysisOptions {
        AnalysisOptions::new().with_temp_dir(self.side_dir())
    }

    pub fn media(&self, runner: Arc<ScriptedRunner>) -> MediaFile {
        MediaFile::open_with_runner(&self.input, scripted_toolchain(), runner)
            .expect("Failed to open input")
            .with_options(self.options())
    }

    /// Write an executable shell script named `name` into the workspace.
    #[cfg(unix)]
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
        path
    }

    /// Number of entries left in the side-file directory.
    pub fn leftover_side_files(&self) -> usize {
        fs::read_dir(self.side_dir())
            .expect("Failed to list side dir")
            .count()
    }
}
