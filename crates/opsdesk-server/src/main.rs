use std::net::SocketAddr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use opsdesk_server::{auth, reminders};
use opsdesk_store::StoreConfig;

#[derive(Parser)]
#[command(name = "opsdesk-server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new API key
    Keygen {
        /// Human-readable name for the key
        #[arg(long, default_value = "")]
        name: String,
    },
    /// List all API keys (metadata only, no secrets)
    ListKeys,
    /// Revoke (delete) an API key by ID
    RevokeKey {
        /// The API key ID to revoke
        id: String,
    },
    /// Populate an empty database with demo data
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let db = opsdesk_db::Db::open_default()?;

    match cli.command {
        Some(Commands::Keygen { name }) => {
            let raw_key = auth::generate_api_key();
            let hash = auth::sha256_hex(&raw_key);
            let api_key = db.insert_api_key(&name, &hash)?;
            eprintln!("Created API key (id: {})", api_key.id);
            if !name.is_empty() {
                eprintln!("  name: {name}");
            }
            // Print the raw key to stdout so it can be captured
            println!("{raw_key}");
            eprintln!("\nSave this key — it cannot be retrieved again.");
        }
        Some(Commands::ListKeys) => {
            let keys = db.list_api_keys()?;
            if keys.is_empty() {
                eprintln!("No API keys found.");
            } else {
                println!("{:<38} {:<20} {:<28} LAST USED", "ID", "NAME", "CREATED");
                for key in keys {
                    println!(
                        "{:<38} {:<20} {:<28} {}",
                        key.id,
                        if key.name.is_empty() { "-" } else { &key.name },
                        key.created_at,
                        key.last_used_at.as_deref().unwrap_or("never"),
                    );
                }
            }
        }
        Some(Commands::RevokeKey { id }) => {
            db.delete_api_key(&id)?;
            eprintln!("Revoked API key {id}");
        }
        Some(Commands::Seed) => {
            db.seed_demo()?;
            eprintln!("Seeded demo data.");
        }
        None => {
            // Default: start server
            let bind = std::env::var("OPSDESK_BIND").unwrap_or_else(|_| "0.0.0.0".into());
            let port: u16 = std::env::var("OPSDESK_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4170);

            let addr = SocketAddr::new(bind.parse()?, port);

            let auth = auth::build_auth_config(&db);
            if auth.is_some() {
                info!("authentication enabled");
            } else {
                info!("authentication disabled (no OPSDESK_API_KEY or DB keys)");
            }

            let store = opsdesk_store::create_store(&StoreConfig::from_env())
                .map_err(|e| anyhow::anyhow!("object store init: {e}"))?;

            let interval: u64 = std::env::var("OPSDESK_REMINDER_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300);
            if interval > 0 {
                tokio::spawn(reminders::run_reminder_scan(db.clone(), interval));
            } else {
                info!("reminder scan disabled");
            }

            let listener = TcpListener::bind(addr).await?;
            info!("opsdesk-server listening on http://{addr}");

            opsdesk_server::serve(listener, db, auth, store).await?;
        }
    }

    Ok(())
}
