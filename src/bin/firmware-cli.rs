use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use firmware_ledger::config::{load_or_default, AppConfig};
use firmware_ledger::lifecycle::startup;
use firmware_ledger::observability::logging;
use firmware_ledger::workflows::digest::to_hex;
use firmware_ledger::workflows::{self, DeployRequest, PublishRequest};

#[derive(Parser)]
#[command(name = "firmware-cli")]
#[command(about = "Operator CLI for the firmware registry", long_about = None)]
struct Cli {
    /// Path to the TOML config file; defaults apply when it is missing.
    #[arg(short, long, default_value = "firmware-ledger.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the registry program and record its address
    Deploy {
        /// Replace a live deployment (its version history is not carried over)
        #[arg(long)]
        force: bool,
    },
    /// Publish the next firmware version for a device class
    Publish {
        #[arg(long = "device-type")]
        device_type: String,
        /// Artifact locator stored on the ledger, e.g. ipfs://<cid>
        #[arg(long)]
        uri: String,
        /// Local copy of the artifact bytes to hash
        #[arg(long)]
        artifact: PathBuf,
    },
    /// Show the latest firmware record for a device class
    Latest {
        #[arg(long = "device-type")]
        device_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.observability);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Deploy { force } => {
            let client = startup::connect(config).await?;
            let request = DeployRequest {
                bytecode: PathBuf::from(&config.registry.bytecode_file),
                abi: Some(PathBuf::from(&config.registry.abi_file)),
                address_file: PathBuf::from(&config.registry.address_file),
                force,
            };
            let outcome = workflows::deploy(&client, &request, &config.gas.deploy).await?;

            println!("Registry deployed");
            println!("  address:  {}", outcome.address);
            println!("  tx:       {}", outcome.tx_hash);
            println!("  gas used: {}", outcome.gas_used);
            if let Some(previous) = outcome.replaced {
                println!("  replaced: {}", previous);
            }
            println!("  saved to: {}", request.address_file.display());
        }
        Commands::Publish {
            device_type,
            uri,
            artifact,
        } => {
            let registry = startup::open_registry(config).await?;
            let request = PublishRequest {
                device_type,
                uri,
                artifact,
            };
            let outcome = workflows::publish(&registry, &request, &config.gas.publish).await?;

            println!("Firmware published");
            println!("  device type: {}", outcome.device_type);
            println!("  version:     {} -> {}", outcome.previous_version, outcome.record.version);
            println!("  uri:         {}", outcome.record.uri);
            println!("  sha256:      {}", to_hex(&outcome.record.digest));
            println!("  tx:          {}", outcome.tx_hash);
            println!("  gas used:    {}", outcome.gas_used);
        }
        Commands::Latest { device_type } => {
            let registry = startup::open_registry(config).await?;
            let device_type =
                device_type.unwrap_or_else(|| config.gateway.default_device_type.clone());
            let record = registry.get_latest(&device_type).await?;

            if record.is_unpublished() {
                println!("No firmware published for {}", device_type);
            } else {
                println!("Latest firmware for {}", device_type);
                println!("  version: {}", record.version);
                println!("  uri:     {}", record.uri);
                println!("  sha256:  {}", to_hex(&record.digest));
            }
        }
    }
    Ok(())
}
