// Entrypoint for the CLI application.
// - Keeps `main` small: load settings, create the analysis client and hand
//   it to the interactive loop.
// - Returns `anyhow::Result` so unexpected failures exit non-zero.

use docintel_cli::api::AnalysisClient;
use docintel_cli::config::Config;
use docintel_cli::ui::{Session, TerminalPrompter, APP_TITLE};
use std::io::{self, IsTerminal};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // A missing .env is fine: the variables may already be exported.
    let _ = dotenvy::dotenv();

    // Diagnostics go to stderr; RUST_LOG=debug shows every poll.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let rule = "=".repeat(40);
    println!("\n{rule}\n{APP_TITLE}\n{rule}\n");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {e}");
            println!("Please check your .env file configuration");
            return Ok(());
        }
    };

    let client = AnalysisClient::from_config(&config)?;
    println!("Connected to Azure Document Intelligence at: {}", client.endpoint());

    let stdout = io::stdout();
    let styled = stdout.is_terminal();
    // Blocks until the user is done.
    Session::new(client, TerminalPrompter, stdout, config.output_dir.clone())
        .styled(styled)
        .run()
}
