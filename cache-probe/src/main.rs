mod backend;

use backend::BackendKind;
use cache_aside::{CacheAside, Error};
use serde::{Deserialize, Serialize};
use shared::config::Config;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{Level, error, info};

const PROBE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct ProbeValue {
    pid: u32,
    written_at: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    // Load environment variables from .env file (if exists)
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    match run().await {
        Ok(()) => {
            info!("Probe passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Probe failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let kind = BackendKind::from_env()?;
    let config = Config::from_env();

    // ============================================
    // STEP 1: Connect the configured backend
    // ============================================
    info!("Probing {} backend", kind);
    let backend = kind.build(&config).await?;
    let cache = CacheAside::new(backend).with_default_ttl(PROBE_TTL);

    // ============================================
    // STEP 2: Miss, then hit, on a private key
    // ============================================
    let key = format!("cache-probe:{}", std::process::id());
    let computed = AtomicUsize::new(0);
    let compute = || async {
        computed.fetch_add(1, Ordering::SeqCst);
        let written_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok::<_, Error>(ProbeValue {
            pid: std::process::id(),
            written_at,
        })
    };

    let first: ProbeValue = cache.remember_default(&key, compute).await?;
    info!("First read computed {:?}", first);

    let second: ProbeValue = cache.remember_default(&key, compute).await?;

    if computed.load(Ordering::SeqCst) != 1 {
        return Err(format!("{key} was recomputed, the {kind} backend did not keep it").into());
    }
    if first != second {
        return Err(format!("{key} read back as {second:?}, expected {first:?}").into());
    }
    info!("Second read served from cache");

    // ============================================
    // STEP 3: Clean up
    // ============================================
    cache.delete(&key).await?;
    match cache.get::<ProbeValue>(&key).await {
        Err(Error::NotFound) => info!("Deleted {}", key),
        Ok(_) => return Err(format!("{key} still present after delete").into()),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
