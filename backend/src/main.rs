//! Warehouse Stock Management Platform - Reconciliation Runner
//!
//! The one maintenance entry point for stock drift: audits or repairs the
//! ledger/lot/aggregate agreement per product or across the whole
//! warehouse. Runs on demand or from a scheduler.
//!
//! Usage:
//!   wsm-reconcile --all [--dry-run]
//!   wsm-reconcile --barcode <code> [--dry-run]

use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warehouse_stock_backend::services::{ProductService, ReconciliationService};
use warehouse_stock_backend::Config;

enum Target {
    All,
    Barcode(String),
}

struct CliArgs {
    target: Target,
    dry_run: bool,
}

fn usage() -> ! {
    eprintln!("Usage: wsm-reconcile (--all | --barcode <code>) [--dry-run]");
    std::process::exit(2);
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut barcode: Option<String> = None;
    let mut all = false;
    let mut dry_run = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--all" => all = true,
            "--dry-run" => dry_run = true,
            "--barcode" => match iter.next() {
                Some(code) => barcode = Some(code.clone()),
                None => usage(),
            },
            _ => usage(),
        }
    }

    let target = match (all, barcode) {
        (true, None) => Target::All,
        (false, Some(code)) => Target::Barcode(code),
        _ => usage(),
    };

    CliArgs { target, dry_run }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wsm_reconcile=info,warehouse_stock_backend=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = parse_args();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting stock reconciliation run");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
    }

    let products = ProductService::new(db_pool.clone(), config.locking.clone());
    let reconciler = ReconciliationService::new(
        db_pool.clone(),
        config.locking.clone(),
        config.reconciliation.clone(),
    );

    let mut drifted = 0usize;
    let mut unrepaired = 0usize;

    match (&cli.target, cli.dry_run) {
        (Target::All, true) => {
            for audit in reconciler.audit_all().await? {
                if !audit.is_clean() {
                    drifted += 1;
                    unrepaired += 1;
                    tracing::warn!(
                        barcode = %audit.barcode,
                        ledger_balance = audit.ledger_balance,
                        lot_sum = audit.lot_sum,
                        stock = audit.stock,
                        "drift detected (dry run, nothing repaired)"
                    );
                }
            }
        }
        (Target::All, false) => {
            for outcome in reconciler.reconcile_all().await? {
                if !outcome.is_clean() {
                    drifted += 1;
                    report_outcome(&outcome);
                }
                if outcome.has_unrepaired_drift() {
                    unrepaired += 1;
                }
            }
        }
        (Target::Barcode(code), dry_run) => {
            let product = products.find_by_barcode(code).await?;
            if dry_run {
                let audit = reconciler.audit_product(product.id).await?;
                if !audit.is_clean() {
                    drifted += 1;
                    unrepaired += 1;
                    tracing::warn!(
                        barcode = %audit.barcode,
                        ledger_balance = audit.ledger_balance,
                        lot_sum = audit.lot_sum,
                        stock = audit.stock,
                        "drift detected (dry run, nothing repaired)"
                    );
                }
            } else {
                let outcome = reconciler.reconcile_product(product.id).await?;
                if !outcome.is_clean() {
                    drifted += 1;
                    report_outcome(&outcome);
                }
                if outcome.has_unrepaired_drift() {
                    unrepaired += 1;
                }
            }
        }
    }

    tracing::info!(drifted, unrepaired, "reconciliation run finished");

    // Leave a failing exit code for the scheduler when drift survives the run
    if unrepaired > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn report_outcome(outcome: &warehouse_stock_backend::services::reconcile::ReconcileOutcome) {
    tracing::info!(
        barcode = %outcome.barcode,
        adjustment = outcome.adjustment,
        corrected_stock = outcome.corrected_stock,
        "product reconciled"
    );
}
