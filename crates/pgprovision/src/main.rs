use anyhow::{Context, Result};
use clap::Parser;
use pgprovision_core::{ProvisionConfig, Server};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod error;
mod progress;

use cli::{Cli, OutputFormat};
use error::CliDiagnostic;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            CliDiagnostic::error("Failed to load configuration")
                .detail(&format!("{:#}", e))
                .print();
            return ExitCode::FAILURE;
        }
    };

    let reporter = progress::reporter(cli.quiet);
    match pgprovision_core::run(&config, |var| std::env::var(var).ok(), Some(reporter)).await {
        Ok(server) => {
            if let Err(e) = print_server(&server, cli.output) {
                CliDiagnostic::error("Failed to print result")
                    .detail(&format!("{:#}", e))
                    .print();
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            CliDiagnostic::from_provision_error(&e).print();
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "pgprovision=warn,pgprovision_core=warn",
            1 => "pgprovision=info,pgprovision_core=info",
            2 => "pgprovision=debug,pgprovision_core=debug",
            _ => "pgprovision=trace,pgprovision_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}

/// Load the config file (explicit path or default location) and apply flags
fn load_config(cli: &Cli) -> Result<ProvisionConfig> {
    let mut config = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        ProvisionConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        ProvisionConfig::load().context("Failed to load default configuration")?
    };
    cli.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;
    info!(
        "Provisioning server {} in resource group {} ({})",
        config.server.name, config.resource_group, config.location
    );
    Ok(config)
}

fn print_server(server: &Server, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(server)?);
        }
        OutputFormat::Text => {
            let properties = server.properties.as_ref();
            println!("Server:   {}", server.name.as_deref().unwrap_or("-"));
            println!("Location: {}", server.location.as_deref().unwrap_or("-"));
            println!(
                "Host:     {}",
                properties
                    .and_then(|p| p.fully_qualified_domain_name.as_deref())
                    .unwrap_or("-")
            );
            println!(
                "State:    {}",
                properties
                    .and_then(|p| p.user_visible_state.as_deref())
                    .unwrap_or("-")
            );
            println!(
                "Version:  {}",
                properties.and_then(|p| p.version.as_deref()).unwrap_or("-")
            );
        }
    }
    Ok(())
}
