//! Lucent CLI - ingest CSV datasets and print analytics reports

use anyhow::{bail, Context, Result};
use lucent_backend::analytics::trend::ClosedFormOls;
use lucent_backend::analytics::{
    catalog, energy, expense, fraud, inventory, revenue, risk, simulation,
};
use lucent_backend::ingestion::schema::SchemaRegistry;
use lucent_backend::ingestion::{ingest_file, DatasetType};
use lucent_backend::store;
use sqlx::SqlitePool;
use std::env;
use std::path::Path;
use tracing::{error, info};

struct Config {
    database_url: String,
}

impl Config {
    fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://lucent.db?mode=rwc".to_string()),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let db = store::connect(&config.database_url).await?;
    info!("Database connected");

    let result = match args[1].as_str() {
        "ingest" => run_ingest(&db, &args[2..]).await,
        "report" => run_report(&db, &args[2..]).await,
        "simulate" => run_simulate(&db, &args[2..]).await,
        other => {
            print_usage();
            bail!("unknown command: {other}");
        }
    };

    match result {
        Ok(()) => {
            info!("✓ {} complete", args[1]);
            Ok(())
        }
        Err(e) => {
            error!("✗ {} failed: {}", args[1], e);
            Err(e)
        }
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  lucent ingest <inventory|expense|fraud|energy> <file.csv>");
    eprintln!("  lucent report <vendors|products|inventory|forecast|expenses|fraud|energy|revenue|risk>");
    eprintln!("  lucent simulate [sales expense fraud delay reorder]");
}

async fn run_ingest(db: &SqlitePool, args: &[String]) -> Result<()> {
    let [dataset_type, path] = args else {
        bail!("usage: lucent ingest <dataset_type> <file.csv>");
    };

    let dataset_type: DatasetType = dataset_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let filename = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path.as_str());
    let content =
        std::fs::read(path).with_context(|| format!("failed to read upload file {path}"))?;

    let registry = SchemaRegistry::new();
    let outcome = ingest_file(db, &registry, dataset_type, filename, &content).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn run_report(db: &SqlitePool, args: &[String]) -> Result<()> {
    let [name] = args else {
        bail!("usage: lucent report <name>");
    };

    let estimator = ClosedFormOls;
    let json = match name.as_str() {
        "vendors" => serde_json::to_string_pretty(&catalog::list_vendors_with_rating(db).await?)?,
        "products" => serde_json::to_string_pretty(&catalog::list_products_with_demand(db).await?)?,
        "inventory" => serde_json::to_string_pretty(&inventory::inventory_summary(db).await?)?,
        "status" => serde_json::to_string_pretty(&inventory::inventory_status(db).await?)?,
        "forecast" => {
            serde_json::to_string_pretty(&inventory::inventory_forecast(db, &estimator).await?)?
        }
        "expenses" => serde_json::to_string_pretty(&expense::expense_summary(db).await?)?,
        "fraud" => serde_json::to_string_pretty(&fraud::fraud_insights(db).await?)?,
        "energy" => serde_json::to_string_pretty(&energy::green_grid_overview(db).await?)?,
        "revenue" => serde_json::to_string_pretty(&revenue::analyze_revenue(db, &estimator).await?)?,
        "risk" => serde_json::to_string_pretty(&risk::unified_risk(db, &estimator).await?)?,
        other => bail!("unknown report: {other}"),
    };

    println!("{json}");
    Ok(())
}

async fn run_simulate(db: &SqlitePool, args: &[String]) -> Result<()> {
    let mut levers = [1.0f64; 5];
    for (i, arg) in args.iter().take(5).enumerate() {
        levers[i] = arg
            .parse()
            .with_context(|| format!("lever {} must be a number, got {arg}", i + 1))?;
    }

    let params = simulation::SimulationParams::new(
        levers[0], levers[1], levers[2], levers[3], levers[4],
    );
    let baseline = simulation::baseline_from_store(db).await?;
    let report = simulation::run_simulation(&params, &baseline);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
