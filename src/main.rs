use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use radio_harvester::config::HarvestConfig;
use radio_harvester::server::{self, ServerState};
use radio_harvester::sink::OutputWriter;
use radio_harvester::HarvestPipeline;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "radio-harvester",
    about = "Harvest radio places, channels and stream URLs into a flat dataset",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true, env = "RADIO_HARVESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog API root
    #[arg(long, global = true)]
    catalog_root: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl the catalog and write output.csv / output.json / places.json
    Harvest {
        /// Maximum number of places harvested concurrently
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Harvest only the first N places
        #[arg(long, conflicts_with = "sample")]
        limit: Option<usize>,

        /// Harvest N randomly chosen places
        #[arg(long)]
        sample: Option<usize>,

        /// Stop admitting new places after this many seconds
        #[arg(long)]
        deadline: Option<u64>,
    },

    /// Serve the raw catalog payloads over HTTP
    Serve {
        /// Listen address
        #[arg(long)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let mut config = HarvestConfig::load(args.config.as_deref())?;
    if let Some(root) = args.catalog_root {
        config.catalog_root = root;
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }

    match args.command {
        Commands::Harvest {
            concurrency,
            output_dir,
            limit,
            sample,
            deadline,
        } => {
            if let Some(n) = concurrency {
                config.concurrency = n;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if limit.is_some() || sample.is_some() {
                config.limit = limit;
                config.sample = sample;
            }
            if deadline.is_some() {
                config.deadline_secs = deadline;
            }
            harvest(config).await
        }
        Commands::Serve { addr } => {
            if let Some(addr) = addr {
                config.server_addr = addr;
            }
            serve(config).await
        }
    }
}

async fn harvest(config: HarvestConfig) -> Result<()> {
    info!("**** Starting crawl ****");

    let writer = OutputWriter::new(&config.output_dir);
    writer
        .prepare()
        .with_context(|| format!("preparing {}", config.output_dir.display()))?;

    let client = config.build_client().context("building HTTP client")?;

    // Ctrl-C stops admitting new places; finished ones are still written.
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling harvest");
            ctrl_c.cancel();
        }
    });

    let mut pipeline = HarvestPipeline::new(Arc::new(client), config.concurrency)
        .with_selection(config.selection()?)
        .with_cancellation(cancel);
    if let Some(deadline) = config.deadline() {
        pipeline = pipeline.with_deadline(deadline);
    }

    let result = pipeline.execute().await?;

    writer.write_places(&result.places)?;
    writer.write_rows(&result.rows)?;

    println!(
        "Successfully got {}/{} ({:.2}%) places, {} rows ({} streams unresolved)",
        result.stats.places_succeeded,
        result.stats.places_attempted,
        result.stats.success_percent(),
        result.rows.len(),
        result.stats.streams_unresolved,
    );
    if !result.errors.is_empty() {
        println!("Errors:");
        for err in &result.errors {
            println!("  !! - {}", err);
        }
    }
    if result.cancelled {
        warn!("Run was cancelled; output is partial");
    }
    Ok(())
}

async fn serve(config: HarvestConfig) -> Result<()> {
    let addr: SocketAddr = config
        .server_addr
        .parse()
        .with_context(|| format!("invalid listen address '{}'", config.server_addr))?;
    let client = config.build_client().context("building HTTP client")?;
    server::serve(addr, ServerState::new(client, config.default_place_id.as_str())).await?;
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
