//! Print the per-frame loudness of a media file.
//!
//! Usage:
//!   cargo run --example loudness -- <input_file>

use std::time::Duration;

use autoedit::{AnalysisOptions, MediaFile, Toolchain};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.wav".to_string());

    println!("Opening {input_path}...");
    let media = MediaFile::open(&input_path, Toolchain::from_env())?
        .with_options(AnalysisOptions::new().with_timeout(Duration::from_secs(600)));

    // Print the stream the sample rate comes from.
    let report = media.probe()?;
    if let Some(stream) = report.first_audio_stream() {
        println!("Audio stream: {stream}");
    }
    println!("Sample rate: {}", media.resolve_sampling_rate());

    let Some(records) = media.sample_loudness()? else {
        println!("ffmpeg could not analyse {input_path}");
        return Ok(());
    };

    let silent = records.iter().filter(|record| record.is_silent()).count();
    println!("{} frames, {silent} silent", records.len());

    for record in records.iter().take(20) {
        if record.is_silent() {
            println!("{:>6} {:>10.4}s   silence", record.frame, record.pts_time);
        } else {
            println!(
                "{:>6} {:>10.4}s {:>8.2} dB",
                record.frame, record.pts_time, record.level
            );
        }
    }

    println!("Done!");
    Ok(())
}
