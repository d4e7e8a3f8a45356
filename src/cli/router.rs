//! Command routing and execution

use crate::cli::args::Commands;
use crate::cli::commands::*;
use crate::config::EngineConfig;
use anyhow::Result;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands, config: EngineConfig) -> Result<()> {
    match command {
        Commands::Combine {
            location,
            date,
            classes,
            json,
        } => run_combine(config, location, date, classes, json).await,
        Commands::Batch { table, skip_rows } => run_batch(config, &table, skip_rows).await,
        Commands::View {
            location,
            class,
            out,
            shade_undefined,
        } => run_view(&config, &location, &class, &out, shade_undefined),
        Commands::Performance { location, json } => run_performance(&config, &location, json),
    }
}
