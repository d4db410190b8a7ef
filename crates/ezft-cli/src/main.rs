mod cli;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.run().await {
        if ezft_core::is_cancelled(&err) {
            eprintln!("ezft: download cancelled");
            std::process::exit(130);
        }
        eprintln!("ezft error: {:#}", err);
        std::process::exit(1);
    }
}
