//! dht-crawler daemon
//!
//! Crawls the DHT and prints every harvested announce to stdout as
//! `<info-hash hex> <ip:port>`.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dht_crawler::{Crawler, CrawlerConfig, Inspector, MetaSource};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// BitTorrent DHT crawler
#[derive(Parser, Debug)]
#[command(name = "dht-crawler", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// UDP address to listen on
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Bootstrap node; repeat to list several (replaces the configured list)
    #[arg(short, long = "bootstrap", value_name = "HOST:PORT")]
    bootstrap: Vec<String>,
}

fn load_config(args: &Args) -> Result<CrawlerConfig, dht_crawler::ConfigError> {
    let mut config = match &args.config {
        Some(path) => CrawlerConfig::load_file(path)?,
        None => CrawlerConfig::default(),
    };

    if let Some(listen) = &args.listen {
        config.listen_addr = listen.clone();
    }
    if !args.bootstrap.is_empty() {
        config.bootstrap_nodes = args.bootstrap.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn drain(mut records: mpsc::Receiver<MetaSource>) {
    while let Some(record) = records.recv().await {
        let written = writeln!(
            std::io::stdout().lock(),
            "{} {}",
            hex::encode(record.info_hash),
            record.addr
        );
        if let Err(e) = written {
            warn!("stdout closed, no longer printing announces: {}", e);
            break;
        }
    }
}

async fn report(inspector: Arc<Inspector>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let stats = inspector.snapshot();
        info!(
            sent_find_node = stats.sent_find_node,
            responses = stats.received_responses,
            errors = stats.received_errors,
            unreplied = stats.unreplied.len(),
            expired = stats.expired_requests,
            ping = stats.received_ping,
            find_node = stats.received_find_node,
            get_peers = stats.received_get_peers,
            announce_peer = stats.received_announce_peer,
            harvested = stats.harvested_peers,
            "crawl stats"
        );
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    // stdout carries the harvested records, so logs go to stderr.
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        listen = %config.listen_addr,
        bootstrap = ?config.bootstrap_nodes,
        "dht-crawler starting"
    );

    let inspector = Arc::new(Inspector::new());
    let (sink, records) = mpsc::channel(config.sink_capacity);
    let stats_interval = config.stats_interval();

    let crawler = match Crawler::bind(config, inspector.clone(), sink).await {
        Ok(crawler) => crawler,
        Err(e) => {
            error!("Failed to bind crawler: {}", e);
            std::process::exit(1);
        }
    };

    tokio::spawn(drain(records));
    tokio::spawn(report(inspector, stats_interval));

    if let Err(e) = crawler.run().await {
        error!("Crawler stopped: {}", e);
        std::process::exit(1);
    }
}
