//! Obsidian CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use obsidian_cli::cli::{Cli, Commands};
use obsidian_cli::commands::{
    build_console, AuthCommand, LogsCommand, ServicesCommand, StatusCommand, WatchCommand,
};
use obsidian_cli::output::OutputFormat;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // One event loop for the whole session.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), obsidian_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let console = build_console(&cli)?;
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Login { token } => {
            AuthCommand::new(&console).login(&mut stdout, &format, token)?;
        }
        Commands::Logout => {
            AuthCommand::new(&console).logout(&mut stdout, &format)?;
        }
        Commands::Status => {
            StatusCommand::new(&console)
                .execute(&mut stdout, &format)
                .await?;
        }
        Commands::Services { command } => {
            ServicesCommand::new(&console)
                .execute(&mut stdout, &format, command)
                .await?;
        }
        Commands::Logs(args) => {
            LogsCommand::new(&console)
                .execute(&mut stdout, &format, args)
                .await?;
        }
        Commands::Watch(args) => {
            WatchCommand::new(&console)
                .execute(&mut stdout, &format, args)
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use obsidian_cli::cli::Format;

    #[test]
    fn cli_parses_status() {
        let cli = Cli::parse_from(["obsidian", "status"]);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn cli_respects_format_flag() {
        let cli = Cli::parse_from(["obsidian", "--format", "json", "status"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[tokio::test]
    async fn run_with_invalid_api_url_fails() {
        let cli = Cli::parse_from(["obsidian", "--api-url", "not a url", "status"]);
        assert!(run(cli).await.is_err());
    }
}
