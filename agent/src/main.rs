mod network;
mod sim;

use clap::Parser;
use network::Agent;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Simulated boot duration in milliseconds
    #[arg(long, default_value = "3000")]
    boot_delay: u64,

    /// Simulated graceful shutdown duration in milliseconds
    #[arg(long, default_value = "2000")]
    stop_delay: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut agent = Agent::bind(
        &addr,
        Duration::from_millis(args.boot_delay),
        Duration::from_millis(args.stop_delay),
    )
    .await?;

    agent.run().await
}
