//! Background sweep of expired cache entries and idle per-user locks.
//!
//! Reads already ignore expired entries; the sweep only reclaims space.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::services::AppServices;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub cache_entries_purged: u64,
    pub user_locks_pruned: usize,
}

pub async fn run_sweep_cycle(services: &AppServices) -> anyhow::Result<SweepReport> {
    let cache_entries_purged = services.bounded(services.cache.purge_expired()).await?;
    let user_locks_pruned = services.locks.prune().await;
    Ok(SweepReport {
        cache_entries_purged,
        user_locks_pruned,
    })
}

pub async fn run_cache_sweep_loop(
    services: Arc<AppServices>,
    interval_minutes: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let interval = tokio::time::Duration::from_secs(interval_minutes.max(1) * 60);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!("Cache sweep loop started (interval: {}min)", interval_minutes);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_sweep_cycle(&services).await {
                    Ok(report) => {
                        if report.cache_entries_purged > 0 {
                            tracing::info!(
                                "Cache sweep: {} expired entries purged, {} idle locks pruned",
                                report.cache_entries_purged,
                                report.user_locks_pruned
                            );
                        } else {
                            tracing::debug!("Cache sweep: nothing expired");
                        }
                    }
                    Err(e) => tracing::warn!("Cache sweep error (non-fatal): {}", e),
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Cache sweep loop shutting down");
                break;
            }
        }
    }
}
