//! Verdict CLI
//!
//! Runs and checks rule programs given as JSON parse trees.

use verdict::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
