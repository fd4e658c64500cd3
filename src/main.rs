//! blocksum - write the MD5 digest of every fixed-size block of a file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use blocksum::{DEFAULT_BLOCK_SIZE, Pipeline, PipelineConfig, default_concurrency};

#[derive(Debug, Parser)]
#[command(
    name = "blocksum",
    version,
    about = "Concurrent per-block MD5 digests, written in input order"
)]
struct Args {
    /// Path to the input file.
    #[arg(long, value_name = "PATH")]
    input_file: PathBuf,

    /// Path to the output file. Created or truncated.
    #[arg(long, value_name = "PATH")]
    output_file: PathBuf,

    /// Block size in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Number of digest workers. Defaults to the host parallelism.
    #[arg(short = 'j', long, value_name = "THREADS")]
    jobs: Option<usize>,

    /// Maximum number of blocks in flight. Defaults to the worker count.
    #[arg(long, value_name = "BLOCKS")]
    window: Option<usize>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("blocksum: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;

    let input_path = expand_path("input", &args.input_file)?;
    let output_path = expand_path("output", &args.output_file)?;

    let input = File::open(&input_path)
        .with_context(|| format!("could not read input file {}", input_path.display()))?;
    let output = File::create(&output_path)
        .with_context(|| format!("could not create output file {}", output_path.display()))?;

    let summary = Pipeline::new(config)?
        .run(input, output)
        .with_context(|| format!("digesting {}", input_path.display()))?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        blocks = summary.blocks,
        bytes = summary.bytes,
        "done"
    );
    Ok(())
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default()
        .with_block_size(args.block_size)
        .with_concurrency(args.jobs.unwrap_or_else(default_concurrency));
    if let Some(window) = args.window {
        config = config.with_window(window);
    }
    config.validate()?;
    Ok(config)
}

fn expand_path(role: &str, path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        bail!("{role} file is not specified");
    }
    std::path::absolute(path).with_context(|| format!("could not resolve {role} file path"))
}
