//! Ledger dump command implementation.

use tallysync_core::{time, OperationRecord, TenantId};
use tallysync_sync_server::SyncServer;

/// Runs the ledger command.
pub fn run(
    server: &SyncServer,
    tenant: TenantId,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut entries = server.ledger(tenant)?;
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => {
            println!("Ledger of tenant {tenant} ({} entries)", entries.len());
            println!();
            for entry in &entries {
                println!("{}", format_entry(entry));
            }
        }
    }
    Ok(())
}

fn format_entry(entry: &OperationRecord) -> String {
    format!(
        "{} {:<8} {:<6} {}/{} device={} claimed={}",
        time::format(&entry.processed_at),
        entry.status.as_str(),
        entry.op_type.as_str(),
        entry.entity,
        entry.entity_id,
        entry.device_id,
        time::format(&entry.client_updated_at),
    )
}
