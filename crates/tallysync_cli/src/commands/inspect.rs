//! Inspect command implementation.

use serde::Serialize;
use tallysync_core::TenantId;
use tallysync_sync_server::SyncServer;

/// Row counts of one tenant.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Tenant inspected.
    pub tenant: String,
    /// Ledger entries.
    pub ledger_entries: usize,
    /// Per-kind statistics.
    pub kinds: Vec<KindStats>,
}

/// Statistics for a single kind.
#[derive(Debug, Serialize)]
pub struct KindStats {
    /// Kind identifier.
    pub kind: String,
    /// Rows without a tombstone.
    pub live: u64,
    /// Tombstoned rows.
    pub deleted: u64,
}

/// Runs the inspect command.
pub fn run(
    server: &SyncServer,
    tenant: TenantId,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let kinds = server
        .counts(tenant)?
        .into_iter()
        .map(|(kind, counts)| KindStats {
            kind: kind.to_string(),
            live: counts.live,
            deleted: counts.deleted,
        })
        .collect();
    let result = InspectResult {
        tenant: tenant.to_string(),
        ledger_entries: server.ledger(tenant)?.len(),
        kinds,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("TallySync Tenant Inspection");
    println!("===========================");
    println!();
    println!("Tenant:  {}", result.tenant);
    println!("Ledger:  {} entries", result.ledger_entries);
    println!();
    println!("{:<22} {:>8} {:>8}", "Kind", "Live", "Deleted");
    for stats in &result.kinds {
        println!("{:<22} {:>8} {:>8}", stats.kind, stats.live, stats.deleted);
    }
    let live: u64 = result.kinds.iter().map(|k| k.live).sum();
    let deleted: u64 = result.kinds.iter().map(|k| k.deleted).sum();
    println!("{:<22} {:>8} {:>8}", "Total", live, deleted);
}
