use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = tokenrelay::cli::Cli::parse();
    if let Err(e) = tokenrelay::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
