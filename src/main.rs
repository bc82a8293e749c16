use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use fuelpay_admin::repositories::{Datastore, MemoryStore, PgStore};
use fuelpay_admin::services;
use fuelpay_admin::settings::{Backend, Settings};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "fuelpay.toml")]
    config: String,
    #[arg(short, long)]
    listen: Option<String>,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let settings = Settings::load(&args.config)?;

    init_logging(&args.log4rs)?;
    log::info!("Starting FuelPay admin service.");

    let store: Arc<dyn Datastore> = match settings.store.backend {
        Backend::Postgres => {
            let postgres = settings
                .postgres
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("postgres backend selected without [postgres] settings"))?;

            let store = PgStore::connect(&postgres.url, postgres.max_connections).await?;
            store.migrate().await?;
            log::info!("Connected to Postgres.");
            Arc::new(store)
        }
        Backend::Memory => {
            log::warn!("Using the in-memory store, data is lost on restart.");
            Arc::new(MemoryStore::new())
        }
    };

    let channels = services::start_services(store, &settings).await?;

    let listen = args.listen.unwrap_or(settings.server.listen);
    services::http::start_http_server(channels, &listen).await
}

fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if !Path::new("logs").exists() {
        fs::create_dir("logs")?;
    }

    match log4rs::init_file(path, Default::default()) {
        Ok(_) => {
            println!("[*] Logging initialized successfully.");
            Ok(())
        }
        Err(e) => {
            println!("[ERROR] Failed to initialize logging: {}", e);
            Err(anyhow::anyhow!("Could not initialize logging: {}", e))
        }
    }
}
