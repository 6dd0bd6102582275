use keyshelf::{cli, logging};

#[tokio::main]
async fn main() {
    logging::init();
    if let Err(e) = cli::run().await {
        eprintln!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}
