use clap::Parser;
use colored::Colorize;
use labdash_cache::api::LabApi;
use labdash_cache::config::Settings;
use labdash_cache::utils::display::DisplayFormatter;
use labdash_cache::{
    AggregateCache, Dashboard, DashboardService, FileStore, MemoryStore, Store, SystemClock,
};
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::parse();
    info!("Starting lab dashboard cache");

    let store: Arc<dyn Store> = match &settings.cache_dir {
        Some(dir) => Arc::new(FileStore::open(dir).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let cache = Arc::new(
        AggregateCache::new(store, Arc::new(SystemClock)).with_single_flight(!settings.no_coalesce),
    );
    let service = DashboardService::new(cache, Arc::new(LabApi::new(&settings.source_url)))
        .with_ttl(settings.ttl)
        .with_producer_timeout(settings.producer_timeout());
    let display = DisplayFormatter::new();

    println!("=== Lab Dashboard Statistics ===");
    println!("Commands:");
    println!("  <dashboard> - Show statistics for a dashboard");
    println!("  list        - Show dashboards");
    println!("  stats       - Show cache counters");
    println!("  exit        - Exit the program");

    let mut input = String::new();
    loop {
        input.clear();
        print!("> ");
        io::stdout().flush()?;
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let command = input.trim();
        match command {
            "" => continue,
            "exit" => {
                debug!("Received exit command");
                break;
            }
            "list" => println!("{}", display.format_dashboard_list()),
            "stats" => println!("{}", display.format_cache_stats(&service.cache_stats())),
            name => match name.parse::<Dashboard>() {
                Ok(dashboard) => {
                    if let Err(e) = service.fetch_and_display(dashboard).await {
                        println!("{}", format!("Error: {}", e).red());
                    }
                }
                Err(e) => println!("{}", e.yellow()),
            },
        }
    }

    info!("Shutting down");
    Ok(())
}
