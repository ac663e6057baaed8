use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = routekeeper::cli::Cli::parse();
    if let Err(e) = routekeeper::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
