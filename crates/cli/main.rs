mod config;
mod progress;
mod report;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use loggen_core::{
    analyze_file, config::default_parallelism, Config, NoProgress, Pipeline, Report,
};
use progress::ProgressLine;
use std::{path::PathBuf, time::Instant};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn", env = "LOGGEN_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a synthetic server log file
    Generate(GenerateArgs),
    /// Summarize a generated log file
    Analyze(AnalyzeArgs),
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    /// JSON config file; defaults to config.json in the platform config dir
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file, truncated if it exists
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Approximate output size in megabytes
    #[arg(short, long)]
    size_mb: Option<u64>,

    /// Exact number of lines to request instead of a size
    #[arg(short, long)]
    lines: Option<u64>,

    /// Assumed average line length in bytes when sizing by megabytes
    #[arg(long)]
    avg_line_bytes: Option<u64>,

    /// Producer threads (default: available parallelism)
    #[arg(short = 'j', long)]
    producers: Option<usize>,

    /// Records per batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Batches the queue holds before producers block
    #[arg(short = 'q', long)]
    queue_capacity: Option<usize>,

    /// Writer poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Seed for reproducible field values
    #[arg(long)]
    seed: Option<u64>,

    /// Do not draw the progress line
    #[arg(long)]
    quiet: bool,
}

impl GenerateArgs {
    fn into_config(self) -> Result<Config> {
        let mut config = config::load(self.config.as_deref())?;

        if let Some(output) = self.output {
            config.output = output;
        }
        config.output = config::expand_path(&config.output);
        if let Some(size_mb) = self.size_mb {
            config.target_size_mb = size_mb;
        }
        if self.lines.is_some() {
            config.line_count = self.lines;
        }
        if let Some(avg) = self.avg_line_bytes {
            config.avg_line_bytes = avg;
        }
        if let Some(producers) = self.producers {
            config.producers = producers;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(poll) = self.poll_interval_ms {
            config.poll_interval_ms = poll;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

#[derive(ClapArgs, Debug)]
struct AnalyzeArgs {
    /// Log file to analyze
    file: PathBuf,

    /// Worker threads (default: available parallelism)
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn write_logs(pipeline: &Pipeline, quiet: bool) -> Result<Report> {
    let output = &pipeline.config().output;
    let report = if quiet {
        pipeline.generate_file(NoProgress)
    } else {
        pipeline.generate_file(ProgressLine::default())
    }
    .with_context(|| format!("cannot generate {}", output.display()))?;

    if !quiet {
        ProgressLine::finish(report.written_lines, report.requested_lines);
    }
    Ok(report)
}

fn generate(args: GenerateArgs) -> Result<()> {
    let quiet = args.quiet;
    let pipeline = Pipeline::new(args.into_config()?)?;
    let config = pipeline.config();

    match config.line_count {
        Some(lines) => println!(
            "Generating {lines} log lines with {} producer threads...",
            config.producers
        ),
        None => println!(
            "Generating ~{} MB log file with {} producer threads...",
            config.target_size_mb, config.producers
        ),
    }

    let report = write_logs(&pipeline, quiet)?;

    if report.dropped_lines > 0 {
        println!(
            "Note: {} requested lines were not generated \
             (each producer writes whole batches of {}).",
            report.dropped_lines, config.batch_size
        );
    }
    println!(
        "Successfully generated {} in {:.2} seconds.",
        config.output.display(),
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

fn analyze(args: AnalyzeArgs) -> Result<()> {
    let threads = args.threads.unwrap_or_else(default_parallelism);
    let path = config::expand_path(&args.file);
    println!("Starting analysis with {threads} threads...");

    let start = Instant::now();
    let analytics = analyze_file(&path, threads)?;
    print!("{}", report::render(&analytics, start.elapsed()));
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match args.command {
        Command::Generate(args) => generate(args),
        Command::Analyze(args) => analyze(args),
    }
}
