//! piproto-node — the PiProtocol backend server.
//!
//! Startup sequence:
//!   1. Parse flags / environment
//!   2. Open the account store (sled on disk, or in-memory)
//!   3. Load the news feed
//!   4. Serve HTTP until Ctrl-C

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use piproto_api::{ApiServer, ApiServerState};
use piproto_core::constants::MANUAL_MINING_COOLDOWN_MS;
use piproto_core::types::Amount;
use piproto_news::NewsFeed;
use piproto_state::{ConversionRates, EngineConfig, MemoryStore, StateDb, StateEngine, StateStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Memory,
    Sled,
}

#[derive(Parser, Debug)]
#[command(name = "piproto-node", version, about = "PiProtocol mining backend")]
struct Args {
    /// Directory for the persistent account store.
    #[arg(long, env = "PIPROTO_DATA_DIR", default_value = "~/.piproto/data")]
    data_dir: PathBuf,

    /// Account store backend.
    #[arg(long, env = "PIPROTO_STORE", value_enum, default_value_t = StoreKind::Sled)]
    store: StoreKind,

    /// HTTP listen address.
    #[arg(long, env = "PIPROTO_LISTEN", default_value = "0.0.0.0:3000")]
    listen: SocketAddr,

    /// Port override for the listen address.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// JSON array of news items. Built-in announcements when absent.
    #[arg(long, env = "PIPROTO_NEWS_FILE")]
    news_file: Option<PathBuf>,

    /// Minimum gap between manual-mining claims (milliseconds).
    #[arg(long, env = "PIPROTO_MANUAL_COOLDOWN_MS", default_value_t = MANUAL_MINING_COOLDOWN_MS)]
    manual_cooldown_ms: i64,

    /// Coins per pi. With --pi-per-usdt, enables server-side conversion rates.
    #[arg(long, env = "PIPROTO_COINS_PER_PI", requires = "pi_per_usdt")]
    coins_per_pi: Option<f64>,

    /// Pi per usdt. With --coins-per-pi, enables server-side conversion rates.
    #[arg(long, env = "PIPROTO_PI_PER_USDT", requires = "coins_per_pi")]
    pi_per_usdt: Option<f64>,

    /// Activate a user's referral edge when they start mining.
    #[arg(long, env = "PIPROTO_ACTIVATE_ON_MINING")]
    activate_on_mining: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,piproto=debug")),
        )
        .init();

    let args = Args::parse();
    info!("PiProtocol node starting");

    // ── Account store ─────────────────────────────────────────────────────────
    let store = open_store(&args)?;

    // ── Engine ────────────────────────────────────────────────────────────────
    let config = engine_config(&args)?;
    if config.rates.is_none() {
        warn!("no conversion rates configured; trusting client-supplied conversion amounts");
    }
    let engine = Arc::new(StateEngine::new(Arc::clone(&store), config));

    // ── News ──────────────────────────────────────────────────────────────────
    let news = match &args.news_file {
        Some(path) => NewsFeed::load(&expand_tilde(path))
            .with_context(|| format!("loading news feed from {}", path.display()))?,
        None => NewsFeed::builtin(chrono::Utc::now()),
    };

    // ── HTTP server ───────────────────────────────────────────────────────────
    let mut addr = args.listen;
    if let Some(port) = args.port {
        addr.set_port(port);
    }
    let state = Arc::new(ApiServerState { engine, news: Arc::new(news) });
    let handle = ApiServer::new(state)
        .start(addr)
        .await
        .context("starting HTTP server")?;

    info!(addr = %handle.local_addr, "node ready");
    tokio::select! {
        res = handle.task => {
            res.context("HTTP server task panicked")?.context("HTTP server failed")?;
        }
        res = tokio::signal::ctrl_c() => {
            res.context("listening for Ctrl-C")?;
            info!("shutdown requested");
        }
    }

    store.flush().context("flushing account store")?;
    Ok(())
}

/// Open the configured store. Any failure here is fatal: the node never
/// serves requests on top of a store it could not open.
fn open_store(args: &Args) -> anyhow::Result<Arc<dyn StateStore>> {
    match args.store {
        StoreKind::Memory => {
            warn!("using in-memory store; accounts will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::Sled => {
            let data_dir = expand_tilde(&args.data_dir);
            std::fs::create_dir_all(&data_dir)
                .with_context(|| format!("creating data dir {}", data_dir.display()))?;
            let db = StateDb::open(&data_dir).context("opening account store")?;

            if db.get_meta("initialized_at").context("reading store metadata")?.is_none() {
                info!(path = %data_dir.display(), "fresh account store");
                let now = chrono::Utc::now().timestamp_millis().to_be_bytes();
                db.put_meta("initialized_at", &now).context("writing store metadata")?;
            } else {
                let accounts = db.account_count();
                info!(path = %data_dir.display(), accounts, "existing account store found");
            }
            Ok(Arc::new(db))
        }
    }
}

fn engine_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let rates = match (args.coins_per_pi, args.pi_per_usdt) {
        (Some(coins_per_pi), Some(pi_per_usdt)) => {
            let coins_per_pi = Amount::from_f64(coins_per_pi).context("--coins-per-pi")?;
            let pi_per_usdt = Amount::from_f64(pi_per_usdt).context("--pi-per-usdt")?;
            anyhow::ensure!(
                !coins_per_pi.is_zero() && !pi_per_usdt.is_zero(),
                "conversion rates must be greater than zero"
            );
            info!(%coins_per_pi, %pi_per_usdt, "server-side conversion rates enabled");
            Some(ConversionRates { coins_per_pi, pi_per_usdt })
        }
        _ => None,
    };
    anyhow::ensure!(args.manual_cooldown_ms >= 0, "--manual-cooldown-ms must not be negative");
    Ok(EngineConfig {
        manual_cooldown_ms: args.manual_cooldown_ms,
        rates,
        activate_on_mining: args.activate_on_mining,
    })
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
