use clap::Parser;
use mask_consensus::app::{handle_fatal_error, init_logging, AppConfig};
use mask_consensus::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let config = match cli.engine_config() {
        Ok(config) => config,
        Err(e) => {
            init_logging(&AppConfig::new(verbose));
            handle_fatal_error(e.into(), verbose)
        }
    };
    init_logging(&AppConfig::new(verbose).with_log_filter(config.log_level.clone()));

    if let Err(e) = execute_command(cli.command, config).await {
        handle_fatal_error(e, verbose)
    }
}
