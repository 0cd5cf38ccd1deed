//! Pull command implementation.

use tallysync_sync_protocol::PullRequest;
use tallysync_sync_server::{SyncContext, SyncServer};

/// Runs the pull command.
pub async fn run(
    server: &SyncServer,
    ctx: &SyncContext,
    since: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = PullRequest::from_query(since)?;
    let response = server.pull(ctx, request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    tracing::info!(rows = response.total(), "pull finished");
    Ok(())
}
