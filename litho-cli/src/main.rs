use std::process::ExitCode;

use clap::Parser;
use litho_cli::{logger, run, Cli};
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    if cli.print_settings {
        return match cli.resolve_settings().and_then(|s| s.to_json()) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("{err:#}");
                ExitCode::FAILURE
            }
        };
    }

    match run(&cli) {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
