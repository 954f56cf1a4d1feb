mod app;
mod report;
mod report_loader;

use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = app::Cli::parse();

    match app::run_app(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(app::AppError::Usage) => {
            println!("{}", app::USAGE);
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
