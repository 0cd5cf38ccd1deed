//! Pull handler.

use crate::clock::Clock;
use crate::context::SyncContext;
use crate::error::ServerResult;
use std::sync::Arc;
use tallysync_core::{time, EntityKind};
use tallysync_storage::SyncStore;
use tallysync_sync_protocol::{PullRequest, PullResponse};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, Instrument};

/// Computes per-kind deltas after a watermark.
pub struct PullHandler {
    store: Arc<dyn SyncStore>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl PullHandler {
    /// Creates a pull handler running at most `concurrency` queries at once.
    pub fn new(store: Arc<dyn SyncStore>, clock: Arc<dyn Clock>, concurrency: usize) -> Self {
        Self {
            store,
            clock,
            concurrency: concurrency.max(1),
        }
    }

    /// Collects the rows of every kind changed after the watermark.
    ///
    /// `serverTime` is read before the queries run, so a row written while
    /// the pull is in flight is returned again by the next pull rather than
    /// missed.
    pub async fn pull(&self, ctx: &SyncContext, request: PullRequest) -> ServerResult<PullResponse> {
        let since = request.watermark();
        let span = tracing::info_span!("sync_pull", tenant = %ctx.tenant, since = %time::format(&since));
        self.collect(ctx, since).instrument(span).await
    }

    async fn collect(
        &self,
        ctx: &SyncContext,
        since: chrono::DateTime<chrono::Utc>,
    ) -> ServerResult<PullResponse> {
        let mut response = PullResponse::new(self.clock.now());
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for kind in EntityKind::ALL {
            let store = Arc::clone(&self.store);
            let permits = Arc::clone(&permits);
            let tenant = ctx.tenant;
            join_set.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let rows =
                    tokio::task::spawn_blocking(move || store.changed_since(tenant, kind, since))
                        .await;
                (kind, rows)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let (kind, rows) = joined?;
            let rows = rows??;
            debug!(entity = %kind, rows = rows.len(), "pulled kind");
            response.changes.insert(kind, rows);
        }

        info!(rows = response.total(), "pull completed");
        Ok(response)
    }
}

impl std::fmt::Debug for PullHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullHandler")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}
