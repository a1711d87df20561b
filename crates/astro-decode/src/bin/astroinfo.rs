use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use astro_decode::{sniff, DecodeOptions, Decoder, MetadataMap, OutputMode};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Print format, image geometry, metadata and pixel statistics of FITS and
/// XISF files.
#[derive(Parser, Debug)]
#[command(name = "astroinfo", version, about, long_about = None)]
struct Args {
    /// Files to inspect.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Compute statistics on the grayscale rendering (default).
    #[arg(long, conflicts_with = "rgb")]
    gray: bool,

    /// Compute statistics on the RGB rendering.
    #[arg(long)]
    rgb: bool,

    /// Only print these metadata keys, comma separated.
    #[arg(long, value_delimiter = ',', env = "ASTROINFO_KEYS")]
    keys: Vec<String>,

    /// Log decode steps at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "astro_decode=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_metadata(map: &MetadataMap, keys: &[String]) {
    if keys.is_empty() {
        for (key, value) in map {
            println!("  {key:<24} {value}");
        }
        return;
    }
    let keys: Vec<&str> = keys.iter().map(|k| k.trim()).collect();
    for (key, value) in map.select(&keys) {
        match value {
            Some(value) => println!("  {key:<24} {value}"),
            None => println!("  {key:<24} (absent)"),
        }
    }
}

fn report(path: &Path, decoder: &Decoder, keys: &[String]) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let format = sniff(&data).context("not a FITS or XISF file")?;
    let metadata = decoder.read_metadata(&data)?;

    println!("{}: {format}", path.display());
    match decoder.resolve_descriptor(&data) {
        Ok(d) => {
            println!(
                "  Image: {}x{}, {} channel(s), {:?}",
                d.width, d.height, d.channels, d.sample_format
            );
            let image = decoder.decode(&data)?;
            if let Some(s) = image.stats() {
                println!(
                    "  Pixels ({:?}): count {}, mean {:.2}, min {}, max {}, std-dev {:.2}",
                    image.mode, s.count, s.mean, s.min, s.max, s.std_dev
                );
            }
        }
        Err(e) => println!("  Image: {e}"),
    }
    println!("  Metadata ({} entries):", metadata.len());
    print_metadata(&metadata, keys);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let mode = if args.rgb && !args.gray {
        OutputMode::Rgb
    } else {
        OutputMode::Grayscale
    };
    let decoder = Decoder::new(DecodeOptions {
        mode,
        ..DecodeOptions::default()
    });

    let mut failed = false;
    for (i, path) in args.files.iter().enumerate() {
        if i > 0 {
            println!();
        }
        if let Err(e) = report(path, &decoder, &args.keys) {
            eprintln!("{}: {e:#}", path.display());
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
