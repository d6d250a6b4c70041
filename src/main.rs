//! Nutribase
//!
//! Builds the nutrient database from the data and agile workbooks.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use nutribase::build_info;
use nutribase::ingest::{Pipeline, PipelineConfig};

/// Get the database path from environment or use default
fn get_database_path() -> PathBuf {
    std::env::var("NUTRIBASE_DATABASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            // Go up from target/release or target/debug to project root
            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(parent) = path.parent() {
                    if let Some(grandparent) = parent.parent() {
                        path = grandparent.to_path_buf();
                    }
                }
            }

            path.push("data");
            path.push("nutribase.db");
            path
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutribase=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <data.xlsx> <agile.xlsx>", args[0]);
        std::process::exit(2);
    }

    let config = PipelineConfig {
        dat_path: PathBuf::from(&args[1]),
        agile_path: PathBuf::from(&args[2]),
        database_path: get_database_path(),
        usda_lookup_url: std::env::var("NUTRIBASE_USDA_URL").ok(),
    };
    eprintln!("Database path: {}", config.database_path.display());

    match Pipeline::new(config).run().await {
        Ok(summary) => {
            eprintln!(
                "Done: {} nutrients, {} foods, {} regions",
                summary.nutrients, summary.foods, summary.regions
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("build failed: {}", e);
            std::process::exit(1);
        }
    }
}
