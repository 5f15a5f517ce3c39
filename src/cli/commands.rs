//! CLI command implementations

use std::io::Write;
use std::path::Path;

use super::args::Command;
use super::errors::{CliError, CliResult};
use crate::config::ServiceConfig;
use crate::http_server::HttpServer;
use crate::logging::init_logging;
use crate::routes::{index_report, mount_all, IndexReport};
use crate::store::MemoryStore;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(&config),
        Command::Indexes { config } => indexes(&config),
    }
}

/// Load config, seed collections and serve HTTP until the process exits
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = ServiceConfig::load(config_path)?;
    init_logging(&config.log_level, config.log_json)?;
    tracing::info!(config = %config_path.display(), "Starting matapi");

    let store = MemoryStore::new();
    let mounted = mount_all(&store, &config)?;
    let server = HttpServer::with_config(&config, &mounted);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Print every resource's indexes to stdout
pub fn indexes(config_path: &Path) -> CliResult<()> {
    let config = ServiceConfig::load(config_path)?;
    let report = collect_indexes(&config)?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report)?;
    writeln!(stdout)?;
    Ok(())
}

/// Index report without seeding any collection
pub fn collect_indexes(config: &ServiceConfig) -> CliResult<Vec<IndexReport>> {
    let config = ServiceConfig {
        data_dir: None,
        ..config.clone()
    };
    let store = MemoryStore::new();
    Ok(index_report(&mount_all(&store, &config)?))
}
