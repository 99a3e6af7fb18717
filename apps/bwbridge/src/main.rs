use bwbridge::app;
use bwbridge::cli::Cli;

use std::process::ExitCode;

use clap::Parser;
use log::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match app::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("bwbridge: {e}");
            ExitCode::FAILURE
        }
    }
}
