//! sqlproc-gateway - Main entry point.
//!
//! Runs one stored procedure against SQL Server and prints the result on
//! stdout. Logs go to stderr.

use clap::Parser;
use sqlproc_gateway::auth::AzureAdProvider;
use sqlproc_gateway::config::{Command, Config};
use sqlproc_gateway::db::{ConnectionFactory, TiberiusDriver};
use sqlproc_gateway::format::{render_result_set, render_row_count, render_table};
use sqlproc_gateway::Gateway;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn build_gateway(config: &Config) -> Result<Gateway, Box<dyn std::error::Error>> {
    let connection = config.connection_config()?;
    let provider = AzureAdProvider::with_endpoints(&config.authority_url, config.resource.as_str())?;

    info!(
        connection = %connection.masked_connection_string(),
        token_auth = connection.uses_token_auth(),
        "Configured SQL Server connection"
    );

    let factory = ConnectionFactory::new(
        connection,
        Arc::new(TiberiusDriver::new()),
        Arc::new(provider),
    )
    .with_refresh_skew(config.token_refresh_skew());
    Ok(Gateway::from_factory(factory))
}

async fn run(config: &Config) -> Result<String, Box<dyn std::error::Error>> {
    let gateway = build_gateway(config)?;
    let args = config.command.procedure_args();
    let params = args.procedure_params();

    let output = match &config.command {
        Command::FetchTable(_) => {
            let table = gateway.fetch_table(&args.procedure, &params).await?;
            render_table(&table, config.format)?
        }
        Command::FetchAll(_) => {
            let result = gateway.fetch_all(&args.procedure, &params).await?;
            render_result_set(&result, config.format)?
        }
        Command::Execute(_) => {
            let rows_affected = gateway.execute(&args.procedure, &params).await?;
            render_row_count(rows_affected, config.format)
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        procedure = %config.command.procedure_args().procedure,
        format = %config.format,
        "Starting sqlproc-gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run(&config).await {
        Ok(output) => {
            println!("{}", output.trim_end());
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Procedure call failed");
            Err(e)
        }
    }
}
