//! habitlog - Habit Tracker
//!
//! Opens the habit database and serves the JSON API until Ctrl+C.

use clap::Parser;
use habitlog::database::Database;
use habitlog::server::{self, DEFAULT_PORT};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "habitlog", version, about = "Habit tracking API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value_t = SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)))]
    listen: SocketAddr,

    /// SQLite database path. Defaults to the user data directory.
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("habitlog=info")),
        )
        .init();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              habitlog - Habit Tracker                      ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    println!("🔧 Initializing database...");
    let db_path = args.db.unwrap_or_else(Database::default_path);
    let db = Database::open(&db_path)?;
    println!("   ✓ Database ready at {}", db_path.display());

    println!("🔧 Starting HTTP server...");
    println!("   ✓ Listening on http://{}", args.listen);
    println!();
    println!("Press Ctrl+C to stop.");

    server::serve(args.listen, db).await?;

    tracing::info!("habitlog stopped");
    Ok(())
}
