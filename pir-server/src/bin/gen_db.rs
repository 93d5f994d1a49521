//! Synthetic snapshot generator.
//!
//! Writes a seeded, reproducible database of 32-byte records plus a
//! `metadata.json` describing it. Useful for test and bench setups.

use clap::Parser;
use eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use plinko_core::db::PartitionParams;
use plinko_core::entry::ENTRY_SIZE;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a synthetic PIR snapshot")]
struct Args {
    /// Output directory for the snapshot and metadata
    #[arg(long, default_value = "data/synthetic")]
    output_dir: PathBuf,

    /// Number of 32-byte entries to generate
    #[arg(long, default_value_t = 100_000)]
    entries: u64,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_bytes = args.entries * ENTRY_SIZE as u64;

    println!("Synthetic snapshot generator");
    println!("  entries: {}", args.entries);
    println!("  size: {:.2} MB", total_bytes as f64 / (1024.0 * 1024.0));
    println!("  seed: {}", args.seed);

    std::fs::create_dir_all(&args.output_dir)?;
    let db_path = args.output_dir.join("database.bin");

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let file = File::create(&db_path)?;
    let mut writer = BufWriter::with_capacity(1024 * 1024, file);

    let pb = ProgressBar::new(args.entries);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut record = [0u8; ENTRY_SIZE];
    for i in 0..args.entries {
        rng.fill(&mut record);
        writer.write_all(&record)?;
        if i % 10_000 == 0 {
            pb.set_position(i);
        }
    }
    pb.finish_and_clear();
    writer.flush()?;

    let params = PartitionParams::derive(args.entries);
    let metadata = serde_json::json!({
        "synthetic": true,
        "seed": args.seed,
        "entry_size_bytes": ENTRY_SIZE,
        "total_entries": args.entries,
        "size_bytes": total_bytes,
        "chunk_size": params.chunk_size,
        "set_size": params.set_size,
    });
    let meta_path = args.output_dir.join("metadata.json");
    std::fs::write(&meta_path, serde_json::to_string_pretty(&metadata)?)?;

    println!("Wrote {:?} and {:?}", db_path, meta_path);
    println!(
        "Partition: chunk_size={} set_size={} capacity={}",
        params.chunk_size,
        params.set_size,
        params.capacity()
    );

    Ok(())
}
