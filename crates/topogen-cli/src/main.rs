use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;

use topogen_core::storage::Backend;
use topogen_core::{write_samples, Config, MetricSynthesizer, TopologyGenerator};

#[derive(Parser)]
#[command(name = "topogen")]
#[command(
    about = "Populate a resource graph with synthetic cluster topology and traffic metrics",
    long_about = None
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the topology graph and write metric samples
    Generate {
        /// Storage backend to use (native or bkbase)
        #[arg(long)]
        backend: Option<String>,

        /// Where to write the metric samples document
        #[arg(long)]
        output: Option<PathBuf>,

        /// Fixed seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Verify backend configuration and connectivity
    Check {
        /// Storage backend to use (native or bkbase)
        #[arg(long)]
        backend: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Generate {
            backend,
            output,
            seed,
        } => generate(backend.as_deref(), output, seed).await,
        Commands::Check { backend } => check(backend.as_deref()).await,
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn log_config(config: &Config, backend: Backend) {
    info!("Storage backend: {backend}");
    match backend {
        Backend::Native => {
            info!(
                "  SurrealDB: {} (ns={}, db={})",
                config.surreal.url, config.surreal.namespace, config.surreal.database
            );
        }
        Backend::BkBase => {
            info!("  BKBase API: {}", config.bkbase.api_url);
            info!("  Result table id: {}", config.bkbase.result_table_id);
        }
    }
    info!(
        "Business: {} (id={}), cluster {}, namespace {}",
        config.topology.biz_name,
        config.topology.biz_id,
        config.topology.cluster_id,
        config.topology.namespace
    );
}

async fn check(backend: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(backend)?;
    let backend = config.storage_backend()?;
    log_config(&config, backend);

    let client = backend.build(&config)?;
    client.ping().await?;
    info!("Connection successful");
    Ok(())
}

async fn generate(
    backend: Option<&str>,
    output: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(backend)?;
    let backend = config.storage_backend()?;
    log_config(&config, backend);

    let client = backend.build(&config)?;
    client.ping().await?;
    info!("Connection successful");

    let mut generator = match seed {
        Some(seed) => TopologyGenerator::with_seed(client, &config, seed),
        None => TopologyGenerator::new(client, &config),
    };
    generator.generate_all().await?;
    generator.log_summary();

    let mut synthesizer = match seed {
        Some(seed) => MetricSynthesizer::with_seed(&config, generator.window(), seed),
        None => MetricSynthesizer::new(&config, generator.window()),
    };
    let series = synthesizer.synthesize(generator.traffic_relations());
    info!("Generated {} metric time series", series.len());

    let path = output.unwrap_or_else(|| PathBuf::from(&config.metrics.output_path));
    write_samples(&path, &series)?;
    info!("Metric samples saved to {}", path.display());

    Ok(())
}
