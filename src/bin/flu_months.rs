use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use flu_months::{about, config::PipelineConfig, pipeline::Pipeline};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use std::fs;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "flu_months",
    about = "Monthly rolling-window sampling of dated influenza sequences"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON configuration file; command-line flags take precedence
    #[arg(long, global = true)]
    config: Option<String>,

    /// Names the filtered FASTA (<prefix>.fasta) and the output directory
    #[arg(long, global = true)]
    run_prefix: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print version information
    #[arg(short = 'V', long)]
    version: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep unpassaged records, trimmed to their first open reading frame
    Filter {
        /// Source FASTA with all records
        #[arg(long)]
        source: Option<String>,
        /// Where to write the filtered FASTA
        #[arg(long)]
        output: Option<String>,
    },
    /// Order the filtered records by collection date and report counts
    Order {
        #[arg(long)]
        input: Option<String>,
    },
    /// Print the rolling-window cut points
    CutPoints {
        #[arg(long)]
        input: Option<String>,
        /// Write the table as CSV instead of printing JSON
        #[arg(long)]
        csv: Option<String>,
    },
    /// Run the whole pipeline and write one FASTA per window
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Run the passage filter on the source FASTA first
    #[arg(long)]
    filter_first: bool,
    #[arg(long)]
    input: Option<String>,
    #[arg(long)]
    output: Option<String>,
    #[arg(long)]
    sample_size: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Also write the JSON run report to this path
    #[arg(long)]
    report: Option<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_from_path(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(prefix) = &cli.run_prefix {
        config.run_prefix = prefix.clone();
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.version {
        println!("{}", about::version_cli_text());
        return Ok(());
    }
    let mut config = load_config(&cli)?;
    let Some(command) = cli.command else {
        bail!("Missing command, see --help");
    };

    match command {
        Commands::Filter { source, output } => {
            if let Some(source) = source {
                config.source_fasta = source;
            }
            if output.is_some() {
                config.input_fasta = output;
            }
            let pipeline = Pipeline::new(config)?;
            let report = pipeline
                .filter_source()
                .context("Passage filter failed")?;
            print_json(&report)
        }
        Commands::Order { input } => {
            if input.is_some() {
                config.input_fasta = input;
            }
            let pipeline = Pipeline::new(config)?;
            let timeline = pipeline.load_timeline()?;
            print_json(&timeline.to_report(&pipeline.config().input_path().to_string_lossy()))
        }
        Commands::CutPoints { input, csv } => {
            if input.is_some() {
                config.input_fasta = input;
            }
            let pipeline = Pipeline::new(config)?;
            let timeline = pipeline.load_timeline()?;
            let table = pipeline.cut_points(&timeline)?;
            match csv {
                Some(path) => {
                    table
                        .write_csv(&path)
                        .with_context(|| format!("Could not write cut points to '{path}'"))?;
                    println!("Wrote {} cut points to '{path}'", table.cut_points().len());
                    Ok(())
                }
                None => print_json(&table.rows()),
            }
        }
        Commands::Run(args) => {
            if args.input.is_some() {
                config.input_fasta = args.input;
            }
            if args.output.is_some() {
                config.output_dir = args.output;
            }
            if let Some(sample_size) = args.sample_size {
                config.sample_size = sample_size;
            }
            if args.seed.is_some() {
                config.seed = args.seed;
            }
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let pipeline = Pipeline::new(config)?;
            let report = pipeline.run(args.filter_first, &mut rng)?;
            if let Some(path) = &args.report {
                let text = serde_json::to_string_pretty(&report)?;
                fs::write(path, text)
                    .with_context(|| format!("Could not write run report '{path}'"))?;
            }
            print_json(&report)
        }
    }
}
