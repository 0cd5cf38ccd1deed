//! Main sync server.

use crate::audit::{AuditSink, TracingAuditSink};
use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::conflict::{ConflictResolver, LastWriteWins};
use crate::context::SyncContext;
use crate::dispatch::DispatchTable;
use crate::error::ServerResult;
use crate::ledger::IdempotencyLedger;
use crate::pull::PullHandler;
use crate::push::PushHandler;
use std::sync::Arc;
use tallysync_core::{EntityKind, OperationRecord, TenantId};
use tallysync_storage::{EntityCounts, SyncStore};
use tallysync_sync_protocol::{PullRequest, PullResponse, PushRequest, PushResponse};

/// The sync server.
///
/// Owns the store and every collaborator explicitly; nothing is global, so
/// tests can run many servers side by side.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tallysync_storage::MemoryStore;
/// use tallysync_sync_server::{ServerConfig, SyncContext, SyncServer};
/// use tallysync_sync_protocol::PullRequest;
/// use tallysync_core::TenantId;
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let server = SyncServer::new(Arc::new(MemoryStore::new()), ServerConfig::default());
/// let ctx = SyncContext::new(TenantId::generate(), "admin");
/// let response = rt.block_on(server.pull(&ctx, PullRequest::full())).unwrap();
/// assert_eq!(response.total(), 0);
/// ```
pub struct SyncServer {
    store: Arc<dyn SyncStore>,
    config: ServerConfig,
    dispatch: Arc<DispatchTable>,
    resolver: Arc<dyn ConflictResolver>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    push: Arc<PushHandler>,
    pull: PullHandler,
}

impl SyncServer {
    /// Creates a server with the standard dispatch table, last-write-wins
    /// resolution, the system clock and tracing audit output.
    pub fn new(store: Arc<dyn SyncStore>, config: ServerConfig) -> Self {
        Self::assemble(
            store,
            config,
            Arc::new(DispatchTable::standard()),
            Arc::new(LastWriteWins),
            Arc::new(TracingAuditSink),
            Arc::new(SystemClock::new()),
        )
    }

    fn assemble(
        store: Arc<dyn SyncStore>,
        config: ServerConfig,
        dispatch: Arc<DispatchTable>,
        resolver: Arc<dyn ConflictResolver>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let push = Arc::new(PushHandler::new(
            Arc::clone(&store),
            Arc::clone(&dispatch),
            Arc::clone(&resolver),
            Arc::clone(&audit),
            Arc::clone(&clock),
            config.clone(),
        ));
        let pull = PullHandler::new(Arc::clone(&store), Arc::clone(&clock), config.pull_concurrency);
        Self {
            store,
            config,
            dispatch,
            resolver,
            audit,
            clock,
            push,
            pull,
        }
    }

    fn rebuild(self) -> Self {
        Self::assemble(
            self.store,
            self.config,
            self.dispatch,
            self.resolver,
            self.audit,
            self.clock,
        )
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self.rebuild()
    }

    /// Replaces the audit sink.
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self.rebuild()
    }

    /// Replaces the conflict resolver.
    pub fn with_conflict_resolver(mut self, resolver: Arc<dyn ConflictResolver>) -> Self {
        self.resolver = resolver;
        self.rebuild()
    }

    /// Replaces the dispatch table.
    pub fn with_dispatch(mut self, dispatch: DispatchTable) -> Self {
        self.dispatch = Arc::new(dispatch);
        self.rebuild()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<dyn SyncStore> {
        &self.store
    }

    /// Handles a push request.
    ///
    /// # Errors
    ///
    /// Fails only when the envelope breaks the configured limits or the
    /// worker task dies; per-operation failures are `ERROR` entries.
    pub async fn push(&self, ctx: &SyncContext, request: PushRequest) -> ServerResult<PushResponse> {
        request.check(&self.config.envelope_limits())?;
        let handler = Arc::clone(&self.push);
        let ctx = ctx.clone();
        let results = tokio::task::spawn_blocking(move || {
            handler.apply_batch(&ctx, &request.operations)
        })
        .await?;
        Ok(PushResponse { results })
    }

    /// Decodes a JSON push body and handles it.
    pub async fn push_json(&self, ctx: &SyncContext, body: &str) -> ServerResult<PushResponse> {
        let request = PushRequest::from_json(body, &self.config.envelope_limits())?;
        self.push(ctx, request).await
    }

    /// Applies a push on the calling thread.
    pub fn push_blocking(
        &self,
        ctx: &SyncContext,
        request: &PushRequest,
    ) -> ServerResult<PushResponse> {
        request.check(&self.config.envelope_limits())?;
        Ok(PushResponse {
            results: self.push.apply_batch(ctx, &request.operations),
        })
    }

    /// Handles a pull request.
    pub async fn pull(&self, ctx: &SyncContext, request: PullRequest) -> ServerResult<PullResponse> {
        self.pull.pull(ctx, request).await
    }

    /// Lists the ledger of a tenant.
    pub fn ledger(&self, tenant: TenantId) -> ServerResult<Vec<OperationRecord>> {
        Ok(IdempotencyLedger::list(self.store.as_ref(), tenant)?)
    }

    /// Counts live and tombstoned rows of every kind.
    pub fn counts(&self, tenant: TenantId) -> ServerResult<Vec<(EntityKind, EntityCounts)>> {
        self.dispatch
            .kinds()
            .map(|kind| Ok((kind, self.store.counts(tenant, kind)?)))
            .collect()
    }
}

impl std::fmt::Debug for SyncServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncServer")
            .field("config", &self.config)
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}
