//! fastmks Command Line Interface
//!
//! Finds, for every query point, the k reference points with the largest
//! kernel value, reading points from CSV files.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use fastmks::api::MaxKernelSearch;
use fastmks::core::{Dataset, FastMksError, Result};
use fastmks::kernel::{CosineKernel, GaussianKernel, Kernel, LinearKernel, PolynomialKernel};
use fastmks::persistence::{write_table_csv, SerializableResults};
use fastmks::search::SearchResults;
use log::{error, info};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "fastmks")]
#[command(about = "Exact max-kernel search with kernel-space ball trees")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the k largest kernel values for every query point
    Search(SearchArgs),
    /// Display information about saved results
    Info(InfoArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Reference points (CSV)
    #[arg(short, long)]
    reference: PathBuf,

    /// Query points (CSV); the reference set is searched against itself if omitted
    #[arg(short, long)]
    query: Option<PathBuf>,

    /// Number of results per query
    #[arg(short)]
    k: usize,

    /// Kernel function
    #[arg(long, default_value = "linear")]
    kernel: CliKernel,

    /// Polynomial kernel degree
    #[arg(long, default_value = "2")]
    degree: u32,

    /// Polynomial kernel offset
    #[arg(long, default_value = "0.0")]
    offset: f64,

    /// Gaussian kernel bandwidth
    #[arg(long, default_value = "1.0")]
    bandwidth: f64,

    /// Use single-tree search
    #[arg(long)]
    single: bool,

    /// Use brute-force search
    #[arg(long)]
    naive: bool,

    /// Maximum number of points per tree leaf
    #[arg(long, default_value = "20")]
    leaf_size: usize,

    /// Run on a single thread
    #[arg(long)]
    sequential: bool,

    /// Write result indices as CSV, one line per query
    #[arg(long)]
    indices_file: Option<PathBuf>,

    /// Write result kernel values as CSV, one line per query
    #[arg(long)]
    kernels_file: Option<PathBuf>,

    /// Save results and metadata as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKernel {
    /// K(x, y) = x . y
    #[value(name = "linear")]
    Linear,
    /// K(x, y) = (x . y + offset)^degree
    #[value(name = "polynomial")]
    Polynomial,
    /// K(x, y) = x . y / (|x| |y|)
    #[value(name = "cosine")]
    Cosine,
    /// K(x, y) = exp(-|x - y|^2 / (2 bandwidth^2))
    #[value(name = "gaussian")]
    Gaussian,
}

#[derive(Args)]
struct InfoArgs {
    /// Results file written by `search --output`
    results: PathBuf,

    /// Export the saved indices as CSV, one line per query
    #[arg(long)]
    indices_file: Option<PathBuf>,

    /// Export the saved kernel values as CSV, one line per query
    #[arg(long)]
    kernels_file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Search(args) => search_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn search_command(args: SearchArgs) -> Result<()> {
    info!("Loading reference set from: {:?}", args.reference);
    let references = Dataset::from_csv(&args.reference)?;
    info!(
        "Loaded {} reference points with {} dimensions",
        references.len(),
        references.dim()
    );

    let queries = match &args.query {
        Some(path) => {
            info!("Loading query set from: {path:?}");
            Some(Dataset::from_csv(path)?)
        }
        None => None,
    };

    match args.kernel {
        CliKernel::Linear => run_search(&args, LinearKernel::new(), &references, queries.as_ref()),
        CliKernel::Polynomial => {
            if args.degree == 0 {
                return Err(FastMksError::InvalidArgument(
                    "Polynomial degree must be positive".to_string(),
                ));
            }
            if !(args.offset >= 0.0) {
                return Err(FastMksError::InvalidArgument(format!(
                    "Polynomial offset must be non-negative, got {}",
                    args.offset
                )));
            }
            let kernel = PolynomialKernel::with_offset(args.degree, args.offset);
            run_search(&args, kernel, &references, queries.as_ref())
        }
        CliKernel::Cosine => run_search(&args, CosineKernel::new(), &references, queries.as_ref()),
        CliKernel::Gaussian => {
            if !(args.bandwidth > 0.0) {
                return Err(FastMksError::InvalidArgument(format!(
                    "Bandwidth must be positive, got {}",
                    args.bandwidth
                )));
            }
            let kernel = GaussianKernel::from_bandwidth(args.bandwidth);
            run_search(&args, kernel, &references, queries.as_ref())
        }
    }
}

fn run_search<K: Kernel>(
    args: &SearchArgs,
    kernel: K,
    references: &Dataset,
    queries: Option<&Dataset>,
) -> Result<()> {
    info!("Kernel: {}", kernel.description());

    let engine = MaxKernelSearch::with_kernel(kernel)
        .with_single_mode(args.single)
        .with_naive_mode(args.naive)
        .with_leaf_size(args.leaf_size)
        .with_parallel(!args.sequential)
        .build(references)?;

    let results = match queries {
        Some(queries) => engine.search_queries(queries, args.k)?,
        None => engine.search(args.k)?,
    };
    info!(
        "Search completed: {} kernel evaluations, {} bound evaluations, {} prunes",
        results.stats.base_cases, results.stats.scores, results.stats.prunes
    );

    let mut written = false;
    if let Some(path) = &args.indices_file {
        write_table_csv(&results.indices, path)?;
        info!("Indices saved to: {path:?}");
        written = true;
    }
    if let Some(path) = &args.kernels_file {
        write_table_csv(&results.kernels, path)?;
        info!("Kernels saved to: {path:?}");
        written = true;
    }
    if !written {
        print_results(&results);
    }

    if let Some(path) = &args.output {
        SerializableResults::from_search(&engine, results).save_to_file(path)?;
        info!("Results saved to: {path:?}");
    }

    Ok(())
}

fn print_results(results: &SearchResults) {
    println!("# Top {} kernel values for {} queries", results.k(), results.n_queries());
    println!("# Format: query_index reference_index:kernel ...");
    for query in 0..results.n_queries() {
        let entries: Vec<String> = results
            .neighbors(query)
            .iter()
            .map(|(index, kernel)| format!("{index}:{kernel:.6}"))
            .collect();
        println!("{query} {}", entries.join(" "));
    }
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading results from: {:?}", args.results);
    let saved = SerializableResults::load_from_file(&args.results)?;
    saved.print_summary();

    let results = saved.into_results();
    if let Some(path) = &args.indices_file {
        write_table_csv(&results.indices, path)?;
        info!("Indices exported to: {path:?}");
    }
    if let Some(path) = &args.kernels_file {
        write_table_csv(&results.kernels, path)?;
        info!("Kernels exported to: {path:?}");
    }
    Ok(())
}
