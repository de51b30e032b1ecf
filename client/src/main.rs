use clap::Parser;
use client::network::Session;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent address to connect to
    #[arg(short = 'a', long, default_value = "127.0.0.1:8080")]
    agent: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting panel client...");
    info!("Connecting to agent: {}", args.agent);
    info!("Commands: start, stop (again to kill), restart, kill, status, quit");

    let mut session = Session::new(&args.agent).await?;
    session.run().await?;

    Ok(())
}
