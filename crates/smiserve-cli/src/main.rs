use anyhow::Result;
use clap::{Parser, Subcommand};
use smiserve_core::{catalog, MetricsCollector, MetricsDocument, NvidiaSmi, SmiConfig, PROCESS_FIELDS};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smiserve")]
#[command(about = "smiserve - nvidia-smi telemetry as JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query all GPUs once and print the JSON document
    Snapshot {
        /// Print single-line JSON instead of indented output
        #[arg(long)]
        compact: bool,

        /// Path to the nvidia-smi executable (defaults to $NVIDIA_SMI_BIN or nvidia-smi)
        #[arg(long)]
        nvidia_smi: Option<String>,
    },

    /// List the fields queried from nvidia-smi
    Fields,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Snapshot {
            compact,
            nvidia_smi,
        } => cmd_snapshot(compact, nvidia_smi)?,
        Commands::Fields => cmd_fields(),
    }

    Ok(())
}

fn cmd_snapshot(compact: bool, nvidia_smi: Option<String>) -> Result<()> {
    let config = nvidia_smi
        .map(SmiConfig::new)
        .unwrap_or_else(SmiConfig::from_env);
    let collector = MetricsCollector::new(NvidiaSmi::new(&config));

    println!("{}", render(&collector.collect(), compact)?);
    Ok(())
}

fn render(document: &MetricsDocument, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(document)?
    } else {
        serde_json::to_string_pretty(document)?
    };
    Ok(json)
}

fn cmd_fields() {
    for spec in catalog() {
        println!("{}\t{}", spec.group.label(), spec.name);
    }
    for field in PROCESS_FIELDS {
        println!("process\t{}", field);
    }
}
