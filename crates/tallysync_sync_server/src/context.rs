//! Request context.

use tallysync_core::TenantId;

/// Identity of an already-authenticated caller.
///
/// Every push and pull is scoped to `tenant`; `actor` is recorded as the
/// last writer of the rows it touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    /// Tenant whose data the request reads and writes.
    pub tenant: TenantId,
    /// User or service performing the request.
    pub actor: String,
}

impl SyncContext {
    /// Creates a context.
    pub fn new(tenant: TenantId, actor: impl Into<String>) -> Self {
        Self {
            tenant,
            actor: actor.into(),
        }
    }
}
