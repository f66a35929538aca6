use dexter_tx_rs::{ClientSettings, Config, DexterApi, PairListing};
use dexter_tx_rs::models::Address;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct PairExport {
    address: String,
    symbol: String,
    stable: bool,
    reserve0: String,
    reserve1: String,
    tvl: String,
    tbv: String,
    gauge: Option<String>,
}

fn pair_to_export(listing: &PairListing) -> PairExport {
    PairExport {
        address: listing.pair.address.to_string(),
        symbol: listing.pair.symbol(),
        stable: listing.pair.stable,
        reserve0: listing.pair.reserve0.to_string(),
        reserve1: listing.pair.reserve1.to_string(),
        tvl: listing.tvl.to_string(),
        tbv: listing.tbv.to_string(),
        gauge: listing.pair.gauge_address().map(|g| g.to_string()),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(std::env::var("DEXTER_LOG_LEVEL").unwrap_or_else(|_| "info".into()))
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage(bin: &str) {
    eprintln!("Usage:");
    eprintln!("  {} [--config <file>] <command> [args]", bin);
    eprintln!();
    eprintln!("  pairs [all|stable|volatile]     → list pairs as JSON");
    eprintln!("  quote <from> <to> <raw_amount>  → best route for an exact-in swap");
    eprintln!("  resolve <name>                  → resolve a name to an address");
    eprintln!();
    eprintln!("  Without a filter, `pairs` uses the saved table filter.");
    eprintln!("  Example:");
    eprintln!("    cargo run --release -- quote 0x7f5c764cbc14f9669b88837ca1490cca17c31607 0x9560e827af36c94d2ac33a39bce1fe78631088db 1000000");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let raw_args: Vec<String> = std::env::args().collect();

    // Parse --config flag and positional command args
    let mut config_path: Option<String> = None;
    let mut args: Vec<String> = Vec::new();
    let mut i = 1;
    while i < raw_args.len() {
        if raw_args[i] == "--config" {
            i += 1;
            if i >= raw_args.len() {
                eprintln!("--config requires a value");
                std::process::exit(1);
            }
            config_path = Some(raw_args[i].clone());
        } else {
            args.push(raw_args[i].clone());
        }
        i += 1;
    }

    let config = match &config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("[config] {}; falling back to defaults", e);
            Config::default()
        }),
    };
    let api = DexterApi::new(&config.network)?;

    let bin = raw_args.first().map(String::as_str).unwrap_or("dexter-tx-rs");
    match args.first().map(String::as_str) {
        Some("pairs") => {
            let mut settings = ClientSettings::load_or_default(&config.settings_path);
            if let Some(filter) = args.get(1) {
                settings.table_filter = filter.clone();
                if let Err(e) = settings.save(&config.settings_path) {
                    warn!("[settings] {}", e);
                }
            }
            list_pairs(&api, &settings.table_filter).await?;
        }
        Some("quote") if args.len() == 4 => {
            let from: Address = args[1].parse()?;
            let to: Address = args[2].parse()?;
            let quote = api.quote(&from, &to, &args[3]).await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Some("resolve") if args.len() == 2 => match api.resolve(&args[1]).await? {
            Some(address) => println!("{}", address),
            None => {
                error!("No address registered for {}", args[1]);
                std::process::exit(1);
            }
        },
        _ => {
            print_usage(bin);
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn list_pairs(api: &DexterApi, filter: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Fetching pairs (filter: {})...", filter);
    let response = api.pairs().await?;
    let mut exports: Vec<PairExport> = response
        .data
        .iter()
        .filter(|l| match filter {
            "stable" => l.pair.stable,
            "volatile" => !l.pair.stable,
            _ => true,
        })
        .map(pair_to_export)
        .collect();
    exports.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    info!("Found {} pair(s).", exports.len());
    println!("{}", serde_json::to_string_pretty(&exports)?);
    Ok(())
}
