use anyhow::Context;
use clap::Parser;
use clinic_assist::cli::{self, Cli};
use clinic_assist::config::{AppConfig, LoggingConfig};
use clinic_assist::service::ClinicService;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    init_logging(&config.logging);

    info!(config_dir = %cli.config.display(), "starting clinic-assist");
    let service = ClinicService::from_config(&config).context("Invalid configuration")?;

    let response = cli::run(&service, &cli.command)?;
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if response.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!(status = response.status, "command failed");
        Ok(ExitCode::FAILURE)
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},clinic_assist=debug", logging.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
