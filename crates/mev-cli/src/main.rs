use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use mev_classify::{DeployedContracts, TraceClassifier};
use mev_data::blocks::BlockFetcher;
use mev_data::provider::create_from_block_number;
use mev_data::Store;
use mev_inspect::config::load_json;
use mev_inspect::{
    run_listener, BatchReport, InspectionSummary, Inspector, InspectorConfig, ListenerConfig,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct AppContext {
    db_path: String,
    rpc_url: Option<String>,
    inspector: InspectorConfig,
    deployed_contracts: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(name = "mev-inspect")]
#[command(about = "Derive MEV events from Ethereum block traces")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[arg(long, global = true, default_value = "data/mev.sqlite")]
    db_path: String,

    /// Archive node with the `trace_` namespace (falls back to MEV_RPC_URL).
    #[arg(long, global = true)]
    rpc: Option<String>,

    /// JSON file with inspector settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip persisting classified traces.
    #[arg(long, global = true)]
    no_classified_traces: bool,

    /// JSON map of factory-deployed contract address to protocol.
    #[arg(long, global = true)]
    deployed_contracts: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect one block and replace its stored events.
    InspectBlock(InspectBlockArgs),
    /// Inspect every block after AFTER up to and including BEFORE.
    InspectMany(InspectManyArgs),
    /// Fetch one block with traces and receipts and print it as JSON.
    FetchBlock(FetchBlockArgs),
    /// Follow the chain head, inspecting settled blocks.
    Listen(ListenArgs),
}

#[derive(Args, Debug)]
struct InspectBlockArgs {
    block_number: u64,
}

#[derive(Args, Debug)]
struct InspectManyArgs {
    after_block: u64,

    before_block: u64,

    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    request_timeout: Option<u64>,
}

#[derive(Args, Debug)]
struct FetchBlockArgs {
    block_number: u64,
}

#[derive(Args, Debug)]
struct ListenArgs {
    /// Blocks to stay behind the head.
    #[arg(long, default_value_t = 5)]
    lag: u64,

    /// Seconds to sleep when no block is ready.
    #[arg(long, default_value_t = 5)]
    poll_interval: u64,

    /// URL to GET after each inspected block (falls back to LISTENER_HEALTHCHECK_URL).
    #[arg(long)]
    healthcheck_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let mut inspector = match &cli.config {
        Some(path) => load_json::<InspectorConfig>(path)?,
        None => InspectorConfig::default(),
    };
    if cli.no_classified_traces {
        inspector.write_classified_traces = false;
    }

    let ctx = AppContext {
        db_path: cli.db_path,
        rpc_url: cli.rpc.or_else(|| std::env::var("MEV_RPC_URL").ok()),
        inspector,
        deployed_contracts: cli.deployed_contracts,
    };

    match cli.command {
        Commands::InspectBlock(args) => handle_inspect_block(&ctx, args).await,
        Commands::InspectMany(args) => handle_inspect_many(&ctx, args).await,
        Commands::FetchBlock(args) => handle_fetch_block(&ctx, args).await,
        Commands::Listen(args) => handle_listen(&ctx, args).await,
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn connect(ctx: &AppContext) -> Result<BlockFetcher> {
    let rpc_url = ctx
        .rpc_url
        .as_deref()
        .ok_or_else(|| eyre!("--rpc or MEV_RPC_URL is required"))?;
    BlockFetcher::new(rpc_url).await
}

async fn build_inspector(
    ctx: &AppContext,
    config: InspectorConfig,
) -> Result<Inspector<BlockFetcher>> {
    let fetcher = connect(ctx).await?;

    ensure_parent_dir(Path::new(&ctx.db_path))?;
    let store = Store::new(&ctx.db_path).wrap_err("failed to open SQLite store")?;

    let deployed = match &ctx.deployed_contracts {
        Some(path) => DeployedContracts::load(path)?,
        None => DeployedContracts::new(),
    };
    let classifier = TraceClassifier::with_defaults(Arc::new(deployed));

    Ok(Inspector::new(
        Arc::new(fetcher),
        Arc::new(store),
        Arc::new(classifier),
        config,
    ))
}

async fn handle_inspect_block(ctx: &AppContext, args: InspectBlockArgs) -> Result<()> {
    let inspector = build_inspector(ctx, ctx.inspector.clone()).await?;

    let summary = inspector
        .inspect_single_block(args.block_number)
        .await
        .wrap_err_with(|| format!("failed to inspect block {}", args.block_number))?;

    print_summary_table(&summary);
    Ok(())
}

async fn handle_inspect_many(ctx: &AppContext, args: InspectManyArgs) -> Result<()> {
    let mut config = ctx.inspector.clone();
    if let Some(max_concurrency) = args.max_concurrency {
        config.max_concurrency = max_concurrency;
    }
    if let Some(request_timeout) = args.request_timeout {
        config.request_timeout_secs = request_timeout;
    }

    let inspector = build_inspector(ctx, config).await?;
    let report = inspector
        .inspect_many_blocks(args.after_block, args.before_block)
        .await?;

    print_batch_table(&report);
    info!(
        after_block = args.after_block,
        before_block = args.before_block,
        db_path = %ctx.db_path,
        "inspect-many command finished"
    );
    Ok(())
}

async fn handle_fetch_block(ctx: &AppContext, args: FetchBlockArgs) -> Result<()> {
    let fetcher = connect(ctx).await?;
    let block = create_from_block_number(
        &fetcher,
        args.block_number,
        ctx.inspector.request_timeout(),
    )
    .await?;

    let json = serde_json::to_string_pretty(&block).wrap_err("failed to serialize block")?;
    println!("{}", json);
    Ok(())
}

async fn handle_listen(ctx: &AppContext, args: ListenArgs) -> Result<()> {
    let inspector = build_inspector(ctx, ctx.inspector.clone()).await?;
    let config = ListenerConfig {
        lag: args.lag,
        poll_interval_secs: args.poll_interval,
        healthcheck_url: args
            .healthcheck_url
            .or_else(|| std::env::var("LISTENER_HEALTHCHECK_URL").ok()),
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let signal_flag = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested, finishing current block");
            signal_flag.store(true, Ordering::SeqCst);
        }
    });

    run_listener(&inspector, &config, &shutdown).await
}

fn print_summary_table(summary: &InspectionSummary) {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Kind", "Rows"]);

    for (kind, rows) in [
        ("transactions", summary.transactions),
        ("traces", summary.traces),
        ("transfers", summary.transfers),
        ("swaps", summary.swaps),
        ("arbitrages", summary.arbitrages),
        ("liquidations", summary.liquidations),
        ("punk snipes", summary.punk_snipes),
        ("miner payments", summary.miner_payments),
    ] {
        table.add_row(vec![kind.to_string(), rows.to_string()]);
    }

    println!("Block {}\n{}", summary.block_number, table);
}

fn print_batch_table(report: &BatchReport) {
    println!(
        "Attempted {} blocks: {} succeeded, {} failed",
        report.attempted,
        report.succeeded.len(),
        report.failed.len()
    );
    if report.failed.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Block", "Error"]);
    for (block_number, error) in &report.failed {
        table.add_row(vec![block_number.to_string(), error.clone()]);
    }
    println!("{}", table);
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create directory {}", parent.display())),
        _ => Ok(()),
    }
}
