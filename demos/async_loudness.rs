//! Async loudness sampling example (feature = "async").
//!
//! Usage:
//!   cargo run --features=async --example async_loudness -- <input_file>...

use std::error::Error;

use autoedit::{MediaFile, Toolchain};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let inputs: Vec<String> = std::env::args().skip(1).collect();
    if inputs.is_empty() {
        eprintln!("usage: async_loudness <input_file>...");
        return Ok(());
    }

    // Start every analysis before awaiting any of them.
    let mut pending = Vec::new();
    for input in &inputs {
        let media = MediaFile::open(input, Toolchain::from_env())?;
        pending.push((input, media.sample_loudness_async()));
    }

    for (input, future) in pending {
        match future.await? {
            Some(records) => {
                let loudest = records
                    .iter()
                    .filter(|record| !record.is_silent())
                    .map(|record| record.level)
                    .fold(f64::NEG_INFINITY, f64::max);
                println!("{input}: {} frames, loudest {loudest:.2} dB", records.len());
            }
            None => println!("{input}: no loudness data"),
        }
    }

    println!("Done!");
    Ok(())
}
