use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let parsed = cli::Cli::parse();

    match parsed.dispatch().await {
        Ok(()) => Ok(()),
        Err(err) => {
            // Configuration problems exit with 2, like usage errors
            if let Some(slidekit_core::errors::SlidekitError::Config(config_error)) =
                err.downcast_ref::<slidekit_core::errors::SlidekitError>()
            {
                eprintln!("Error: {}", config_error);
                std::process::exit(2);
            }

            Err(err)
        }
    }
}
