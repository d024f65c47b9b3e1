//! Background purge of expired sessions.

use parley_conversation::ConversationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Purges expired sessions once, logging the outcome.
///
/// Returns the number of sessions removed, or `None` if the purge failed.
pub async fn purge_expired(store: &dyn ConversationStore) -> Option<u64> {
    match store.purge_expired_sessions().await {
        Ok(count) => {
            if count > 0 {
                tracing::info!(deleted_sessions = count, "Cleaned up expired sessions");
            }
            Some(count)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to cleanup expired sessions");
            None
        }
    }
}

/// Spawns a task that purges expired sessions every `every` until
/// `shutdown` flips to `true` or its sender is dropped.
///
/// The first purge runs one full interval after spawning.
pub fn spawn_session_cleanup(
    store: Arc<dyn ConversationStore>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    purge_expired(store.as_ref()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Session cleanup stopped");
                        break;
                    }
                }
            }
        }
    })
}
