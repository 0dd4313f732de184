use anyhow::{anyhow, bail, Context, Result};
use coinvote::{
    arguments::{get_query_request, is_help_requested, is_scheduler_disabled, print_help},
    config,
    gateway::Gateway,
    logger::{self, LogTag},
    paths,
    scheduler::tasks::schedule_default_tasks,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Notify;

#[tokio::main]
async fn main() {
    // Directories must exist before the logger opens its file
    if let Err(e) = paths::ensure_all_directories() {
        eprintln!("Failed to create required directories: {}", e);
        std::process::exit(1);
    }

    logger::init();

    if is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            logger::error(LogTag::System, &format!("Fatal: {:#}", e));
            1
        }
    };

    logger::flush();
    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    logger::info(LogTag::System, "Starting coinvote gateway");

    let config = config::load_config().map_err(|e| anyhow!(e)).context("loading configuration")?;
    let scheduler_config = config.scheduler.clone();
    let gateway = Arc::new(Gateway::new(config).context("building gateway")?);

    if let Some(request) = get_query_request() {
        let outcome = run_query(&gateway, &request).await;
        gateway.shutdown().await;
        return outcome;
    }

    if is_scheduler_disabled() {
        logger::info(LogTag::Scheduler, "Background tasks disabled via --no-scheduler");
    } else {
        let armed = schedule_default_tasks(&gateway, &scheduler_config).map_err(|e| anyhow!(e))?;
        logger::info(LogTag::Scheduler, &format!("Armed {} background tasks", armed));
    }

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    ctrlc::set_handler(move || signal.notify_one()).context("installing Ctrl-C handler")?;

    logger::info(LogTag::System, "Gateway running, press Ctrl-C to stop");
    shutdown.notified().await;

    logger::info(LogTag::System, "Shutdown signal received");
    gateway.shutdown().await;
    logger::info(LogTag::System, "Gateway stopped");
    Ok(())
}

fn parse_number(args: &[String], index: usize, default: u32) -> Result<u32> {
    match args.get(index) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("'{}' is not a valid number", raw)),
        None => Ok(default),
    }
}

fn required<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing <{}> argument", name))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run one `--query` request and print its envelope
async fn run_query(gateway: &Gateway, request: &[String]) -> Result<()> {
    let (name, args) = match request.split_first() {
        Some(split) => split,
        None => bail!("--query needs a query name"),
    };

    match name.as_str() {
        "top-coins" => {
            let page = parse_number(args, 0, 1)?;
            let per_page = parse_number(args, 1, 100)?;
            print_json(&gateway.get_top_coins(page, per_page).await)
        }
        "trending" => print_json(&gateway.get_trending_coins().await),
        "listings" => {
            let limit = parse_number(args, 0, 100)?;
            let start = parse_number(args, 1, 1)?;
            print_json(&gateway.get_latest_listings(limit, start).await)
        }
        "gainers" => {
            let limit = parse_number(args, 0, 10)?;
            print_json(&gateway.get_gainers_losers(limit).await)
        }
        "pools" => {
            let chain = required(args, 0, "chain")?;
            let address = required(args, 1, "address")?;
            print_json(&gateway.get_token_pools(chain, address).await)
        }
        "search" => {
            let text = args.join(" ");
            print_json(&gateway.search(&text).await)
        }
        "votes" => {
            let subject = required(args, 0, "subject")?;
            print_json(&gateway.get_votes(subject).await)
        }
        "status" => print_json(&gateway.status().await),
        other => bail!("unknown query '{}' (see --help)", other),
    }
}
