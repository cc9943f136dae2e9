//! Background expiry of stale upload sessions.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::service::UploadService;

/// Spawn a task that sweeps stale sessions every `interval`.
///
/// Sessions idle for longer than `ttl` are dropped together with their
/// staged chunks, as are staging directories left behind by a restart.
pub fn spawn_sweeper(service: UploadService, ttl: Duration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match service.sweep(ttl).await {
                Ok(report) if report.expired_sessions > 0 || report.orphaned_dirs > 0 => {
                    tracing::info!(
                        expired_sessions = report.expired_sessions,
                        orphaned_dirs = report.orphaned_dirs,
                        "Swept stale uploads"
                    );
                }
                Ok(_) => {
                    tracing::debug!("No stale uploads to sweep");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to sweep stale uploads");
                }
            }
        }
    })
}
