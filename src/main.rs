use anyhow::Result;
use clap::Parser;
use scpilot::cli::commands::{Cli, Commands};
use scpilot::cli::handlers::{handle_analyze_command, handle_patterns_command};
use scpilot::cli::utils::{init_logging, print_info};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, &cli.log_format);

    // Execute command
    match cli.command {
        Commands::Analyze {
            snapshot,
            report,
            output,
            patterns_dir,
            jobs,
            probe_timeout,
            keep_extracted,
        } => {
            handle_analyze_command(
                snapshot,
                report,
                output,
                patterns_dir,
                jobs,
                probe_timeout,
                keep_extracted,
                cli.verbose,
            )
            .await
        }

        Commands::Patterns { action } => handle_patterns_command(action).await,

        Commands::Info => {
            print_info();
            Ok(())
        }
    }
}
