use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use astro_decode::{DecodeOptions, Decoder, OutputMode};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Render a FITS or XISF image to an 8-bit PNG.
#[derive(Parser, Debug)]
#[command(name = "astroconv", version, about, long_about = None)]
struct Args {
    /// FITS or XISF input file.
    input: PathBuf,

    /// PNG file to write.
    output: PathBuf,

    /// Write a single-channel grayscale PNG (default).
    #[arg(long, conflicts_with = "rgb")]
    gray: bool,

    /// Write a three-channel RGB PNG.
    #[arg(long)]
    rgb: bool,

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

fn run(args: &Args) -> Result<()> {
    let mode = if args.rgb && !args.gray {
        OutputMode::Rgb
    } else {
        OutputMode::Grayscale
    };
    let decoder = Decoder::new(DecodeOptions {
        mode,
        ..DecodeOptions::default()
    });

    let decoded = decoder
        .decode_file(&args.input)
        .with_context(|| format!("decoding {}", args.input.display()))?;
    let rendered = decoded
        .to_dynamic_image()
        .context("pixel buffer does not match image geometry")?;
    rendered
        .save_with_format(&args.output, image::ImageFormat::Png)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "{} -> {} ({}x{}, {:?})",
        args.input.display(),
        args.output.display(),
        decoded.width,
        decoded.height,
        decoded.mode
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("astroconv: {e:#}");
            ExitCode::FAILURE
        }
    }
}
