//! Push command implementation.

use std::path::Path;
use tallysync_core::OpStatus;
use tallysync_sync_protocol::PushResponse;
use tallysync_sync_server::{SyncContext, SyncServer};

/// Runs the push command.
pub async fn run(
    server: &SyncServer,
    ctx: &SyncContext,
    file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = std::fs::read_to_string(file)
        .map_err(|e| format!("Cannot read {}: {e}", file.display()))?;
    let response = server.push_json(ctx, &body).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    let (ok, conflict, error) = tally(&response);
    tracing::info!(ok, conflict, error, "push finished");
    Ok(())
}

fn tally(response: &PushResponse) -> (usize, usize, usize) {
    response
        .statuses()
        .into_iter()
        .fold((0, 0, 0), |(ok, conflict, error), status| match status {
            OpStatus::Ok => (ok + 1, conflict, error),
            OpStatus::Conflict => (ok, conflict + 1, error),
            OpStatus::Error => (ok, conflict, error + 1),
        })
}
