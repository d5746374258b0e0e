use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tierwatch_cli::{load_config, logging, resolve_range, select_products, Pipeline, RunOptions};
use tierwatch_client::PricingClient;
use tierwatch_core::ProductType;
use tierwatch_storage::FileStore;
use tierwatch_tiers::{PriceKind, TierMapper};
use tracing::{error, info};

/// Fetch theme-park ticket prices, bucket them into tiers, store the results.
#[derive(Parser, Debug)]
#[command(name = "tierwatch", version, about)]
struct Args {
    /// First visit date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last visit date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Range length in months when no end date is given
    #[arg(long, default_value_t = 6)]
    months_ahead: u32,

    /// Product to process; repeat or comma-separate. Defaults to all.
    #[arg(long = "product", value_delimiter = ',')]
    products: Vec<ProductType>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for snapshots and mapped exports
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Re-map today's stored snapshot instead of fetching when one exists
    #[arg(long)]
    reuse_today: bool,

    /// Delete snapshots older than the retention window before running
    #[arg(long)]
    clean: bool,

    /// Price to summarize per month: adult or child
    #[arg(long, default_value = "adult")]
    price: PriceKind,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = logging::init(&args.log_level, args.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<bool> {
    let config = load_config(args.config.as_deref(), args.data_dir).context("loading configuration")?;
    let now = Local::now().naive_local();
    let range = resolve_range(args.start, args.end, args.months_ahead, now.date())?;

    let store = FileStore::from_config(&config.storage)?;
    if args.clean {
        let deleted = store
            .clean_old_snapshots(config.storage.days_to_keep, now)
            .context("cleaning old snapshots")?;
        info!(deleted, days_to_keep = config.storage.days_to_keep, "Retention pass done");
    }

    let client = PricingClient::from_config(&config)?;
    let mapper = TierMapper::from_config(&config.tiers).context("building tier mapper")?;
    let pipeline = Pipeline::new(&client, &store, &config.alerts).with_mapper(mapper);

    let options = RunOptions {
        range,
        products: select_products(&args.products),
        reuse_today: args.reuse_today,
        now,
        price_kind: args.price,
    };
    info!(start = %range.start, end = %range.end, products = options.products.len(), "Starting run");

    let report = pipeline.run(&options);
    print!("{report}");

    let failed = report.failures().len();
    if failed > 0 {
        error!(failed, "Run finished with failures");
    }
    Ok(failed == 0)
}
