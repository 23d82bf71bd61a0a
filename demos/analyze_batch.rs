//! Example: Detect the key of multiple audio files
//!
//! Usage:
//!   cargo run --release --example analyze_batch -- [--jobs N] [--json] [--no-cache] [--cache-dir DIR] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files (batch-level). Each file analysis is still single-threaded.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.
//! - Files are listed in the given order, followed by the key transitions between them.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tonic_dsp::{
    compute_transitions, AnalysisConfig, BatchAnalyzer, BatchOptions, DirectoryCache,
};

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

/// "Artist - Title.ext" → ("Artist", "Title"); otherwise the stem is the title
fn metadata_from_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.split_once(" - ") {
        Some((artist, title)) => (artist.trim().to_string(), title.trim().to_string()),
        None => ("Unknown".to_string(), stem),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut use_cache = true;
    let mut cache_dir: Option<PathBuf> = None;
    let mut jobs: Option<usize> = None;
    let mut paths: Vec<PathBuf> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--no-cache" => use_cache = false,
            "--cache-dir" => {
                let v = args.first().ok_or("--cache-dir requires a value")?.clone();
                args.remove(0);
                cache_dir = Some(PathBuf::from(v));
            }
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: analyze_batch [--jobs N] [--json] [--no-cache] [--cache-dir DIR] <file1> <file2> ...\n\
                     \n\
                     --jobs N          Parallel workers (default: CPU-1)\n\
                     --json            Emit one JSON object per line (JSONL)\n\
                     --no-cache        Do not read or write cached results\n\
                     --cache-dir DIR   Persist results as DIR/<checksum>.json\n"
                );
                return Ok(());
            }
            _ => paths.push(PathBuf::from(a)),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let mut analyzer = BatchAnalyzer::new(AnalysisConfig::default())?
        .with_options(BatchOptions { use_cache, jobs });
    if let Some(dir) = cache_dir {
        analyzer = analyzer.with_cache(DirectoryCache::new(dir)?);
    }

    let t0 = Instant::now();
    let progress = |done: usize, total: usize| eprintln!("[{}/{}]", done, total);
    let rows = analyzer.analyze_batch(&paths, &metadata_from_name, Some(&progress));
    let wall_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let transitions = compute_transitions(&rows);

    if json {
        for row in &rows {
            println!("{}", serde_json::to_string(row)?);
        }
        for t in &transitions {
            println!("{}", serde_json::to_string(t)?);
        }
    } else {
        for (idx, row) in rows.iter().enumerate() {
            let r = &row.result;
            if r.is_unknown() {
                println!("[{}/{}] {}: ERROR: could not analyze", idx + 1, rows.len(), row.file);
                continue;
            }
            let alternatives: Vec<String> = r
                .alternatives
                .iter()
                .map(|a| format!("{} ({:.2})", a.label, a.relative_confidence))
                .collect();
            println!(
                "[{}/{}] {}: Key={} (conf={:.3}) scale={} relative={} BPM={:.1} energy={:.3} brightness={:.0}Hz alt=[{}]",
                idx + 1,
                rows.len(),
                row.file,
                r.label(),
                r.confidence,
                r.scale,
                r.relative_key,
                r.tempo,
                r.energy,
                r.brightness,
                alternatives.join(", ")
            );
        }
        for t in &transitions {
            println!("{} -> {}: {} → {} (distance {})", t.position, t.position + 1, t.from, t.to, t.distance);
        }
    }

    let ok = rows.iter().filter(|r| !r.result.is_unknown()).count();
    eprintln!("Done: ok={}/{} wall={:.0}ms", ok, rows.len(), wall_ms);

    Ok(())
}
