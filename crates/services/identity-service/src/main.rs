//! Identity Service - credential record tooling.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use domain::{IdentityRecord, SignUp};
use identity_service_lib::config::IdentityServiceConfig;

#[derive(Parser)]
#[command(name = "identity-service")]
#[command(about = "Identity credential tooling")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash credentials and print a storable identity record as JSON
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, env = "IDENTITY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Verify a password against a stored identity record
    Verify {
        /// Path to a JSON identity record
        #[arg(long)]
        record: PathBuf,
        #[arg(long, env = "IDENTITY_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = IdentityServiceConfig::from_env();

    init_tracing(cli.verbose, &config.service.log_level);
    tracing::debug!(service = %config.service.service_name, "Configuration loaded");

    match cli.command {
        Commands::Create {
            email,
            first_name,
            last_name,
            password,
        } => {
            let sign_up = SignUp {
                email,
                first_name,
                last_name,
                password,
            };
            let record = identity_service_lib::create_record(&config, &sign_up)
                .map_err(|e| e.user_message())?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Verify { record, password } => {
            let contents = std::fs::read_to_string(&record)?;
            let record: IdentityRecord = serde_json::from_str(&contents)?;

            if identity_service_lib::verify_record(record, &password) {
                println!("match");
            } else {
                println!("no match");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(verbose: bool, log_level: &str) {
    let filter = if verbose { "debug" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
