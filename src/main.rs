use std::process::ExitCode;

use clap::Parser;
use facegan::cli::{Cli, Commands};
use facegan::config::AppConfig;
use facegan::error::Result;
use tracing::error;

mod main_commands;
mod main_runtime;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match AppConfig::load_from(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration from {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = main_runtime::init_logging(&config.logging);

    let result = match &cli.command {
        Commands::Train(args) => main_commands::run_train(config, args),
        Commands::Sample {
            checkpoint,
            output,
            grid,
        } => main_commands::run_sample(config, checkpoint, output, *grid),
        Commands::Inspect => main_commands::run_inspect(config),
    };

    ExitCode::from(exit_status(&result))
}

/// Log a failed command once and map it to a process exit status
fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facegan::error::GanError;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&Ok(())), 0);
        assert_eq!(exit_status(&Err(GanError::EmptyDataset("data".to_string()))), 1);
    }
}
