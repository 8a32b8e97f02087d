use std::{path::PathBuf, sync::Arc, time::Duration};

use autoedit::{
    AnalysisOptions, LoudnessRecord, MediaFile, OperationType, ProgressCallback, ProgressInfo,
    SAMPLE_RATE_UNRESOLVED, ToolLogLevel, Toolchain,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  autoedit probe input.wav --json\n  autoedit loudness input.mp4 --progress\n  autoedit loudness input.mp4 --json --reset 48 > levels.json\n  autoedit parse side-file.txt\n  autoedit completions zsh > _autoedit";

#[derive(Debug, Parser)]
#[command(
    name = "autoedit",
    version,
    about = "Measure per-frame audio loudness of media files with ffmpeg",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Path to the ffmpeg executable (default: $AUTOEDIT_FFMPEG or ffmpeg on PATH).
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe executable (default: $AUTOEDIT_FFPROBE or ffprobe on PATH).
    #[arg(long, global = true)]
    ffprobe: Option<PathBuf>,

    /// ffmpeg/ffprobe log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print each pipeline stage as it runs.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a spinner while the external tools run.
    #[arg(long, global = true)]
    progress: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the audio sample rate and stream list of a media file.
    #[command(
        about = "Probe sample rate and streams",
        visible_alias = "info",
        after_help = "Examples:\n  autoedit probe input.wav\n  autoedit probe input.mkv --json"
    )]
    Probe {
        /// Input media path.
        input: PathBuf,

        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Measure per-frame RMS loudness.
    #[command(
        about = "Measure per-frame loudness",
        after_help = "Examples:\n  autoedit loudness input.wav\n  autoedit loudness input.mp4 --json --timeout 600\n  autoedit loudness input.mp4 --silence-below -50"
    )]
    Loudness {
        /// Input media path.
        input: PathBuf,
        /// Output records as a JSON array.
        #[arg(long)]
        json: bool,
        /// Fixed astats reset cadence instead of sample_rate / 1000.
        #[arg(long)]
        reset: Option<u32>,
        /// Kill ffprobe/ffmpeg after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
        /// Count frames quieter than this level (dB) in the summary.
        #[arg(long, allow_hyphen_values = true)]
        silence_below: Option<f64>,
    },

    /// Parse a side file written by `ametadata=print:file=...`.
    #[command(
        about = "Parse an existing loudness side file",
        after_help = "Examples:\n  autoedit parse levels.txt --json"
    )]
    Parse {
        /// Side file path.
        file: PathBuf,
        /// Output records as a JSON array.
        #[arg(long)]
        json: bool,
        /// Count frames quieter than this level (dB) in the summary.
        #[arg(long, allow_hyphen_values = true)]
        silence_below: Option<f64>,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Aggregate figures printed after a loudness table.
#[derive(Debug, Clone, PartialEq)]
struct LoudnessSummary {
    frames: usize,
    silent_frames: usize,
    quiet_frames: Option<usize>,
    min_level: Option<f64>,
    max_level: Option<f64>,
    mean_level: Option<f64>,
}

fn summarize(records: &[LoudnessRecord], silence_below: Option<f64>) -> LoudnessSummary {
    let measured: Vec<f64> = records
        .iter()
        .filter(|record| !record.is_silent())
        .map(|record| record.level)
        .collect();

    let mean_level = (!measured.is_empty())
        .then(|| measured.iter().sum::<f64>() / measured.len() as f64);

    LoudnessSummary {
        frames: records.len(),
        silent_frames: records.len() - measured.len(),
        quiet_frames: silence_below.map(|threshold| {
            records
                .iter()
                .filter(|record| record.level < threshold)
                .count()
        }),
        min_level: measured.iter().copied().reduce(f64::min),
        max_level: measured.iter().copied().reduce(f64::max),
        mean_level,
    }
}

fn format_level(level: f64) -> String {
    if level == autoedit::SILENCE_LEVEL {
        "-inf".to_string()
    } else {
        format!("{level:.2}")
    }
}

fn build_toolchain(global: &GlobalOptions) -> Result<Toolchain, Box<dyn std::error::Error>> {
    let defaults = Toolchain::from_env();
    let ffmpeg = global
        .ffmpeg
        .clone()
        .unwrap_or_else(|| defaults.ffmpeg().to_path_buf());
    let ffprobe = global
        .ffprobe
        .clone()
        .unwrap_or_else(|| defaults.ffprobe().to_path_buf());

    // A fully explicit toolchain is validated up front; PATH lookups fail on launch.
    let toolchain = match (&global.ffmpeg, &global.ffprobe) {
        (Some(_), Some(_)) => Toolchain::new(ffmpeg, ffprobe)?,
        _ => Toolchain::unchecked(ffmpeg, ffprobe),
    };

    match &global.log_level {
        Some(level) => {
            let parsed =
                ToolLogLevel::parse(level).ok_or(format!("unsupported --log-level: {level}"))?;
            Ok(toolchain.with_log_level(parsed))
        }
        None => Ok(toolchain),
    }
}

fn base_options(
    global: &GlobalOptions,
) -> Result<(AnalysisOptions, Option<ProgressBar>), Box<dyn std::error::Error>> {
    let spinner = if global.progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
        bar.enable_steady_tick(Duration::from_millis(100));
        Some(bar)
    } else {
        None
    };

    let mut options = AnalysisOptions::new();
    if global.progress || global.verbose {
        options = options.with_progress(Arc::new(TerminalProgress {
            spinner: spinner.clone(),
            verbose: global.verbose,
        }));
    }
    Ok((options, spinner))
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "autoedit=debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

struct TerminalProgress {
    spinner: Option<ProgressBar>,
    verbose: bool,
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let stage = match info.operation {
            OperationType::Probe => "probing sample rate",
            OperationType::Analysis => "running ffmpeg analysis",
            OperationType::Parsing => "parsing loudness data",
            _ => "working",
        };

        if self.verbose {
            let state = if info.finished { "done" } else { "start" };
            let label = "stage".cyan().bold();
            match info.records {
                Some(records) => eprintln!(
                    "{label} {stage} {state} ({records} records, {:.2?})",
                    info.elapsed
                ),
                None => eprintln!("{label} {stage} {state} ({:.2?})", info.elapsed),
            }
        }

        if let Some(spinner) = &self.spinner {
            spinner.set_message(stage);
        }
    }
}

fn print_records(
    records: &[LoudnessRecord],
    json: bool,
    silence_below: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    println!(
        "{:>8} {:>12} {:>12} {:>10}",
        "frame".bold(),
        "pts".bold(),
        "time (s)".bold(),
        "level (dB)".bold()
    );
    for record in records {
        let level = format_level(record.level);
        let level = if record.is_silent() {
            level.dimmed().to_string()
        } else {
            level
        };
        println!(
            "{:>8} {:>12} {:>12.3} {:>10}",
            record.frame, record.pts, record.pts_time, level
        );
    }

    let summary = summarize(records, silence_below);
    eprintln!(
        "{} {} frames, {} silent",
        "summary".green().bold(),
        summary.frames,
        summary.silent_frames
    );
    if let (Some(min), Some(max), Some(mean)) =
        (summary.min_level, summary.max_level, summary.mean_level)
    {
        eprintln!("  level min {min:.2} dB, max {max:.2} dB, mean {mean:.2} dB");
    }
    if let (Some(quiet), Some(threshold)) = (summary.quiet_frames, silence_below) {
        eprintln!("  {quiet} frames below {threshold:.2} dB");
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match cli.command {
        Commands::Probe { input, json } => {
            let (options, spinner) = base_options(&cli.global)?;
            let media =
                MediaFile::open(&input, build_toolchain(&cli.global)?)?.with_options(options);
            let report = media.probe();
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            let report = report?;
            let rate = report
                .sample_rate()
                .map(i64::from)
                .unwrap_or(SAMPLE_RATE_UNRESOLVED);

            if json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "sample_rate": rate,
                    "streams": report.streams.iter().map(|stream| json!({
                        "index": stream.index,
                        "codec_type": stream.codec_type,
                        "codec_name": stream.codec_name,
                        "sample_rate": stream.sample_rate,
                        "channels": stream.channels,
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{}", input.display().to_string().bold());
                if rate == SAMPLE_RATE_UNRESOLVED {
                    println!("  sample rate: {}", "no audio stream".yellow());
                } else {
                    println!("  sample rate: {rate} Hz");
                }
                for stream in &report.streams {
                    println!("  {stream}");
                }
            }
        }
        Commands::Loudness {
            input,
            json,
            reset,
            timeout,
            silence_below,
        } => {
            let (mut options, spinner) = base_options(&cli.global)?;
            if let Some(reset) = reset {
                options = options.with_reset(reset);
            }
            if let Some(seconds) = timeout {
                options = options.with_timeout(Duration::from_secs(seconds));
            }

            let media =
                MediaFile::open(&input, build_toolchain(&cli.global)?)?.with_options(options);
            let records = media.sample_loudness();
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            match records? {
                Some(records) => print_records(&records, json, silence_below)?,
                None => {
                    return Err(format!(
                        "failed to get audio loudness info for {} (see the log above)",
                        input.display()
                    )
                    .into());
                }
            }
        }
        Commands::Parse {
            file,
            json,
            silence_below,
        } => {
            let records = autoedit::parse_loudness_file(&file)?;
            print_records(&records, json, silence_below)?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "autoedit", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use autoedit::{LoudnessRecord, SILENCE_LEVEL};

    use super::{format_level, summarize};

    fn record(frame: u64, level: f64) -> LoudnessRecord {
        LoudnessRecord {
            frame,
            pts: frame as f64 * 1024.0,
            pts_time: frame as f64 * 0.021,
            level,
        }
    }

    #[test]
    fn summarize_skips_silence_in_statistics() {
        let records = [
            record(0, SILENCE_LEVEL),
            record(1, -20.0),
            record(2, -10.0),
        ];
        let summary = summarize(&records, None);

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.silent_frames, 1);
        assert_eq!(summary.min_level, Some(-20.0));
        assert_eq!(summary.max_level, Some(-10.0));
        assert_eq!(summary.mean_level, Some(-15.0));
        assert_eq!(summary.quiet_frames, None);
    }

    #[test]
    fn summarize_counts_quiet_frames_including_silence() {
        let records = [
            record(0, SILENCE_LEVEL),
            record(1, -60.0),
            record(2, -10.0),
        ];
        let summary = summarize(&records, Some(-50.0));
        assert_eq!(summary.quiet_frames, Some(2));
    }

    #[test]
    fn summarize_all_silent() {
        let summary = summarize(&[record(0, SILENCE_LEVEL)], None);
        assert_eq!(summary.silent_frames, 1);
        assert_eq!(summary.mean_level, None);
        assert_eq!(summary.min_level, None);
    }

    #[test]
    fn format_level_marks_silence() {
        assert_eq!(format_level(SILENCE_LEVEL), "-inf");
        assert_eq!(format_level(-12.5), "-12.50");
    }
}
