use clap::Parser;
use portal_sync::cli::{run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let outcome = run(cli).await;

    if outcome.success {
        println!("{}", outcome.message);
    } else {
        eprintln!("{}", outcome.message);
        std::process::exit(1);
    }
}
