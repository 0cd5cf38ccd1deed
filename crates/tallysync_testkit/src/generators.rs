//! Property-based test generators using proptest.
//!
//! Strategies produce payload values the registry accepts and operation
//! scripts that exercise last-write-wins across a few shared rows.

use crate::fixtures::{epoch, OpBuilder};
use chrono::Duration;
use proptest::prelude::*;
use tallysync_core::EntityKind;
use tallysync_sync_protocol::PushOperation;
use uuid::Uuid;

/// Strategy for any entity kind.
pub fn entity_kind_strategy() -> impl Strategy<Value = EntityKind> {
    prop::sample::select(EntityKind::ALL.to_vec())
}

/// Strategy for money strings with up to two decimals (`"12"`, `"3.5"`, `"0.07"`).
pub fn money_strategy() -> impl Strategy<Value = String> {
    (0u64..10_000_000, 0u8..3).prop_map(|(cents, decimals)| match decimals {
        0 => (cents / 100).to_string(),
        1 => format!("{}.{}", cents / 100, (cents % 100) / 10),
        _ => format!("{}.{:02}", cents / 100, cents % 100),
    })
}

/// Strategy for display names within the usual 1..=200 bound.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,40}").expect("Invalid regex")
}

/// Strategy for a claimed-time offset from the fixture epoch, in minutes.
pub fn offset_strategy() -> impl Strategy<Value = i64> {
    0i64..10_000
}

/// One step of a generated sync script.
#[derive(Debug, Clone)]
pub enum SyncStep {
    /// Upsert a customer in `slot`.
    Upsert {
        /// Which of the shared rows to touch.
        slot: usize,
        /// Claimed time, in minutes after the epoch.
        offset: i64,
        /// Customer name to write.
        name: String,
    },
    /// Delete the customer in `slot`.
    Delete {
        /// Which of the shared rows to touch.
        slot: usize,
        /// Claimed time, in minutes after the epoch.
        offset: i64,
    },
    /// Resubmit an earlier step unchanged.
    Resubmit {
        /// Index into the steps produced so far.
        index: usize,
    },
}

/// Strategy for a single step over `slots` shared rows.
pub fn sync_step_strategy(slots: usize) -> impl Strategy<Value = SyncStep> {
    prop_oneof![
        4 => (0..slots, offset_strategy(), name_strategy())
            .prop_map(|(slot, offset, name)| SyncStep::Upsert { slot, offset, name }),
        2 => (0..slots, offset_strategy()).prop_map(|(slot, offset)| SyncStep::Delete { slot, offset }),
        1 => any::<usize>().prop_map(|index| SyncStep::Resubmit { index }),
    ]
}

/// Strategy for a sequence of steps.
pub fn sync_script_strategy(
    slots: usize,
    min_steps: usize,
    max_steps: usize,
) -> impl Strategy<Value = Vec<SyncStep>> {
    prop::collection::vec(sync_step_strategy(slots), min_steps..max_steps)
}

/// Turns a script into push operations over the given row ids.
///
/// A `Resubmit` repeats the operation at `index % produced`, or is skipped
/// when nothing has been produced yet.
pub fn script_operations(steps: &[SyncStep], ids: &[Uuid]) -> Vec<PushOperation> {
    let mut ops: Vec<PushOperation> = Vec::with_capacity(steps.len());
    for step in steps {
        let op = match step {
            SyncStep::Upsert { slot, offset, name } => {
                OpBuilder::upsert(EntityKind::Customers, ids[slot % ids.len()])
                    .payload(serde_json::json!({ "name": name }))
                    .at_time(epoch() + Duration::minutes(*offset))
                    .build()
            }
            SyncStep::Delete { slot, offset } => {
                OpBuilder::delete(EntityKind::Customers, ids[slot % ids.len()])
                    .at_time(epoch() + Duration::minutes(*offset))
                    .build()
            }
            SyncStep::Resubmit { index } => {
                if ops.is_empty() {
                    continue;
                }
                ops[index % ops.len()].clone()
            }
        };
        ops.push(op);
    }
    ops
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
