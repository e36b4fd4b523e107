use std::error::Error;

use tracing_subscriber::EnvFilter;

mod app;
mod browser;
mod cli;
mod config;
mod error;
mod processor;
mod scraping;
mod session;
mod shutdown;

use app::{App, RunStatus};
use cli::CliArgs;
use shutdown::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args = CliArgs::parse_args();
    cli_args.validate()?;

    // RUST_LOG wins over --log-level so single modules can be turned up
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli_args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting talent-scout");

    let config = config::AppConfig::load_with_cli_args(&cli_args)?;
    let shutdown = ShutdownSignal::new();
    let app = App::new_with_config(config, shutdown.clone());

    let status = tokio::select! {
        status = app.run(&cli_args.command) => status,
        _ = shutdown.forced() => RunStatus::Failed("aborted by user".to_string()),
    };

    println!("{}", status);
    if !status.is_success() {
        tracing::warn!("Finished with status: {:?}", status);
        std::process::exit(status.exit_code());
    }

    tracing::info!("Finished");
    Ok(())
}
