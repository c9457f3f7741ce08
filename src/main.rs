use clap::Parser;

use tax_forms::cli::{execute, Cli};
use tax_forms::{config, init_telemetry};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&config.observability) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    match execute(cli, config).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
