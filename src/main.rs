//! Single-exchange triangular arbitrage bot entry point.

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use triarb::arbitrage::calculator::{ask_route_factor, bid_route_factor};
use triarb::config::{Config, KeyFile};
use triarb::engine::Engine;
use triarb::exchange;
use triarb::metrics;

/// Single-exchange triangular arbitrage bot.
#[derive(Parser, Debug)]
#[command(name = "triarb")]
#[command(about = "Triangular arbitrage bot for a single A->B->C->A loop")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a JSON configuration file (defaults to environment variables).
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,

    /// Place real orders instead of logging them.
    #[arg(long)]
    live: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the main trading loop (default).
    Run {
        /// Place real orders instead of logging them.
        #[arg(long)]
        live: bool,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Check exchange connectivity and balances.
    CheckBalance,

    /// Fetch the route's order books and price both directions once.
    ShowBooks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("triarb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Initialize metrics
    metrics::init_metrics();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(args.config.as_deref()).await,
        Some(Command::CheckBalance) => cmd_check_balance(args.config.as_deref()).await,
        Some(Command::ShowBooks) => cmd_show_books(args.config.as_deref()).await,
        Some(Command::Run { live }) => cmd_run(args.config.as_deref(), live).await,
        None => cmd_run(args.config.as_deref(), args.live).await,
    }
}

/// Load configuration from a file when given, otherwise from the environment.
fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    Ok(config)
}

/// Run the main trading loop.
async fn cmd_run(config_path: Option<&str>, live: bool) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let mut config = load_config(config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Override with CLI args if provided
    if live {
        config.mock = false;
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!(
        "Mode: {}",
        if config.mock { "MOCK" } else { "LIVE TRADING" }
    );

    // Expose Prometheus scrape endpoint
    if config.metrics_enabled {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.metrics_port))
            .install()?;
        info!("Prometheus scrape endpoint on port {}", config.metrics_port);
    }

    // Connect the exchange adapter and run
    let adapter = exchange::connect(&config)?;
    let mut engine = Engine::new(config, adapter);
    engine.run().await?;

    Ok(())
}

/// Check configuration validity.
async fn cmd_check_config(config_path: Option<&str>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TRIARB - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match load_config(config_path) {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Check credentials
    print!("Checking key file... ");
    match &config.key_file {
        Some(path) => match KeyFile::load(path) {
            Ok(_) => println!("OK"),
            Err(e) => {
                println!("FAILED");
                println!("  Error: {}", e);
                return Err(anyhow::anyhow!("Key file invalid"));
            }
        },
        None => {
            println!("not configured");
            println!("  WARNING: {} needs a key file to connect!", config.exchange);
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Exchange: {}", config.exchange);
    println!(
        "  Route: {} -> {} -> {} -> {}",
        config.ticker_a, config.ticker_b, config.ticker_c, config.ticker_a
    );
    println!(
        "  Pairs: {} / {} / {}",
        config.ticker_pair_a, config.ticker_pair_b, config.ticker_pair_c
    );
    println!("  Fee Ratio: {}", config.fee_ratio);
    println!(
        "  Min Profit: {} {}",
        config.min_profit, config.valuation_currency
    );
    println!("  Mock: {}", config.mock);
    println!("  Sleep: {}s", config.sleep_secs);
    println!("  Stale Order Checks: {}", config.stale_order_checks);
    println!(
        "  Metrics: {}",
        if config.metrics_enabled {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Check exchange connectivity and balances.
async fn cmd_check_balance(config_path: Option<&str>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TRIARB - BALANCE CHECK");
    println!("======================================================================");

    // Load configuration
    let config = load_config(config_path)?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    println!("Exchange: {}", config.exchange);
    println!(
        "Tickers: {} / {} / {}",
        config.ticker_a, config.ticker_b, config.ticker_c
    );
    println!("======================================================================");

    // Connect adapter
    print!("\n1. Connecting... ");
    let adapter = exchange::connect(&config)?;
    println!("OK");

    // Get balances
    print!("\n2. Fetching balances... ");
    match adapter.get_balance(&config.tickers()).await {
        Ok(balance) => {
            println!("OK");
            for ticker in config.tickers() {
                println!("   {}: {}", ticker, balance.available(ticker));
            }
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    // List open orders
    print!("\n3. Listing open orders... ");
    match adapter.list_open_orders().await {
        Ok(orders) => {
            println!("OK");
            println!("   Open orders: {}", orders.len());
            for order_id in orders.iter().take(5) {
                println!("   - {}", order_id);
            }
            if orders.len() > 5 {
                println!("   ... and {} more", orders.len() - 5);
            }
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    println!("\n======================================================================");
    println!("BALANCE CHECK COMPLETED");
    println!("======================================================================");

    Ok(())
}

/// Fetch the route's order books and price both directions once.
async fn cmd_show_books(config_path: Option<&str>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TRIARB - ORDER BOOKS");
    println!("======================================================================");

    let config = load_config(config_path)?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let adapter = exchange::connect(&config)?;

    println!(
        "\nFetching top of book for {} / {} / {}...\n",
        config.ticker_pair_a, config.ticker_pair_b, config.ticker_pair_c
    );

    let (book_a, book_b, book_c) = tokio::try_join!(
        adapter.get_book_top(&config.ticker_pair_a),
        adapter.get_book_top(&config.ticker_pair_b),
        adapter.get_book_top(&config.ticker_pair_c),
    )?;

    let books = [book_a, book_b, book_c];
    for book in &books {
        println!("{}", book);
        println!("  spread: {}", book.spread());
    }

    println!("----------------------------------------------------------------------");
    println!("Bid route factor: {}", bid_route_factor(&books));
    println!("Ask route factor: {}", ask_route_factor(&books));
    println!("(a factor above 1 means that direction is profitable before fees)");
    println!("======================================================================");

    Ok(())
}
