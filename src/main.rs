#[tokio::main]
async fn main() {
    if let Err(e) = btc_custody_sync::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
