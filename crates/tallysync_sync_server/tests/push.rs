//! Push behaviour against every store implementation.

use chrono::Duration;
use tallysync_core::EntityRecord;
use tallysync_sync_server::{AuditAction, STORE_ERROR_MESSAGE};
use tallysync_testkit::prelude::*;

async fn current(server: &TestServer, ctx: &SyncContext, kind: EntityKind, id: Uuid) -> EntityRecord {
    server
        .row(ctx, kind, id)
        .await
        .unwrap_or_else(|| panic!("[{}] row {id} missing", server.label()))
}

#[tokio::test]
async fn acme_scenario() {
    for server in TestServer::all() {
        let ctx = server.context();
        let x = Uuid::new_v4();
        let create = OpBuilder::upsert(EntityKind::Customers, x)
            .payload(json!({"name": "Acme"}))
            .at("2025-01-01T00:00:00Z")
            .build();

        let first = server.push_ops(&ctx, vec![create.clone()]).await;
        assert_eq!(first.statuses(), vec![OpStatus::Ok], "[{}]", server.label());
        let created = current(&server, &ctx, EntityKind::Customers, x).await;
        assert_eq!(created.field("name"), Some(&json!("Acme")));

        let again = server.push_ops(&ctx, vec![create]).await;
        assert_eq!(again.statuses(), vec![OpStatus::Ok]);
        assert_eq!(current(&server, &ctx, EntityKind::Customers, x).await, created);

        let stale_delete = OpBuilder::delete(EntityKind::Customers, x)
            .at("2024-01-01T00:00:00Z")
            .build();
        let response = server.push_ops(&ctx, vec![stale_delete]).await;
        assert_eq!(response.statuses(), vec![OpStatus::Conflict]);
        assert_eq!(response.results[0].entity(), Some(&created));
        assert!(!current(&server, &ctx, EntityKind::Customers, x).await.is_deleted());
    }
}

#[tokio::test]
async fn resubmission_does_not_touch_row_or_ledger() {
    for server in TestServer::all() {
        let ctx = server.context();
        let op = OpBuilder::upsert(EntityKind::Products, Uuid::new_v4())
            .sample()
            .at("2030-01-01T00:00:00Z")
            .build();

        let first = server.push_ops(&ctx, vec![op.clone()]).await;
        let second = server.push_ops(&ctx, vec![op.clone(), op]).await;

        assert_eq!(second.statuses(), vec![OpStatus::Ok, OpStatus::Ok]);
        assert_eq!(second.results[0].entity(), first.results[0].entity());
        assert_eq!(second.results[1].entity(), first.results[0].entity());
        assert_eq!(first.results[0].entity().map(|row| row.version), Some(1));
        assert_eq!(server.ledger(ctx.tenant).unwrap().len(), 1);
        assert_eq!(server.audit.len(), 1);
    }
}

#[tokio::test]
async fn tie_goes_to_client() {
    for server in TestServer::all() {
        let ctx = server.context();
        let id = Uuid::new_v4();
        let created = server
            .push_ops(&ctx, vec![OpBuilder::upsert(EntityKind::Customers, id).sample().build()])
            .await;
        let changed_at = created.results[0].entity().unwrap().effective_changed_at();

        let older = OpBuilder::upsert(EntityKind::Customers, id)
            .payload(json!({"name": "Older"}))
            .at_time(changed_at - Duration::milliseconds(1))
            .build();
        let tied = OpBuilder::upsert(EntityKind::Customers, id)
            .payload(json!({"name": "Tied"}))
            .at_time(changed_at)
            .build();
        let response = server.push_ops(&ctx, vec![older, tied]).await;

        assert_eq!(response.statuses(), vec![OpStatus::Conflict, OpStatus::Ok]);
        let row = current(&server, &ctx, EntityKind::Customers, id).await;
        assert_eq!(row.field("name"), Some(&json!("Tied")));
        assert_eq!(row.version, 2);
    }
}

#[tokio::test]
async fn tombstone_then_resurrection() {
    for server in TestServer::all() {
        let ctx = server.context();
        let id = Uuid::new_v4();
        server
            .push_ops(&ctx, vec![OpBuilder::upsert(EntityKind::Technicians, id).sample().build()])
            .await;

        let deleted = server
            .push_ops(
                &ctx,
                vec![OpBuilder::delete(EntityKind::Technicians, id)
                    .at("2030-01-01T00:00:00Z")
                    .build()],
            )
            .await;
        assert_eq!(deleted.statuses(), vec![OpStatus::Ok]);
        let tombstone = deleted.results[0].entity().unwrap().clone();
        assert!(tombstone.is_deleted());
        assert_eq!(tombstone.deleted_at, Some(tombstone.updated_at));

        let stale = OpBuilder::upsert(EntityKind::Technicians, id)
            .sample()
            .at_time(tombstone.updated_at - Duration::seconds(1))
            .build();
        let revived = OpBuilder::upsert(EntityKind::Technicians, id)
            .payload(json!({"name": "Back", "specialty": "Fiber", "status": "active"}))
            .at("2030-01-01T00:00:00Z")
            .build();
        let response = server.push_ops(&ctx, vec![stale, revived]).await;

        assert_eq!(response.statuses(), vec![OpStatus::Conflict, OpStatus::Ok]);
        assert_eq!(response.results[0].entity(), Some(&tombstone));
        let row = current(&server, &ctx, EntityKind::Technicians, id).await;
        assert!(!row.is_deleted());
        assert_eq!(row.field("name"), Some(&json!("Back")));
        assert_eq!(row.version, 3);
    }
}

#[tokio::test]
async fn delete_of_missing_row_is_ok_without_audit() {
    for server in TestServer::all() {
        let ctx = server.context();
        let op = OpBuilder::delete(EntityKind::Punches, Uuid::new_v4()).build();
        let response = server.push_ops(&ctx, vec![op]).await;

        assert_eq!(response.statuses(), vec![OpStatus::Ok]);
        assert_eq!(response.results[0].server_entity, Some(None));
        let wire = serde_json::to_value(&response.results[0]).unwrap();
        assert_eq!(wire["serverEntity"], serde_json::Value::Null);
        assert!(server.audit.is_empty());
        assert_eq!(server.ledger(ctx.tenant).unwrap().len(), 1);
    }
}

#[tokio::test]
async fn invalid_operation_does_not_stop_batch() {
    for server in TestServer::all() {
        let ctx = server.context();
        let ops = vec![
            OpBuilder::upsert(EntityKind::Customers, Uuid::new_v4()).sample().build(),
            OpBuilder::upsert(EntityKind::Customers, Uuid::new_v4())
                .payload(json!({"email": "not-an-email"}))
                .build(),
            OpBuilder::upsert(EntityKind::Customers, Uuid::new_v4()).sample().build(),
        ];
        let response = server.push_ops(&ctx, ops.clone()).await;

        assert_eq!(
            response.statuses(),
            vec![OpStatus::Ok, OpStatus::Error, OpStatus::Ok]
        );
        assert!(response.results[1].message.is_some());
        let ledger = server.ledger(ctx.tenant).unwrap();
        let ledgered: Vec<Uuid> = ledger.iter().map(|entry| entry.op_id).collect();
        assert_eq!(ledgered, vec![ops[0].op_id, ops[2].op_id]);
    }
}

#[tokio::test]
async fn ledgered_conflict_replays_as_ok_with_latest_row() {
    for server in TestServer::all() {
        let ctx = server.context();
        let id = Uuid::new_v4();
        server
            .push_ops(&ctx, vec![OpBuilder::upsert(EntityKind::Employees, id).sample().build()])
            .await;
        let stale = OpBuilder::upsert(EntityKind::Employees, id)
            .sample()
            .at("2000-01-01T00:00:00Z")
            .build();
        let first = server.push_ops(&ctx, vec![stale.clone()]).await;
        assert_eq!(first.statuses(), vec![OpStatus::Conflict]);

        server
            .push_ops(
                &ctx,
                vec![OpBuilder::upsert(EntityKind::Employees, id)
                    .payload(json!({"name": "Renamed", "role": "lead"}))
                    .at("2030-01-01T00:00:00Z")
                    .build()],
            )
            .await;

        let replay = server.push_ops(&ctx, vec![stale]).await;
        assert_eq!(replay.statuses(), vec![OpStatus::Ok]);
        let row = replay.results[0].entity().unwrap();
        assert_eq!(row.field("name"), Some(&json!("Renamed")));
        assert_eq!(replay.results[0].message, None);
        assert_eq!(server.ledger(ctx.tenant).unwrap().len(), 3);
    }
}

#[tokio::test]
async fn replay_of_tombstoned_row_returns_null_entity() {
    for server in TestServer::all() {
        let ctx = server.context();
        let id = Uuid::new_v4();
        let create = OpBuilder::upsert(EntityKind::Customers, id).sample().build();
        server.push_ops(&ctx, vec![create.clone()]).await;
        server
            .push_ops(
                &ctx,
                vec![OpBuilder::delete(EntityKind::Customers, id)
                    .at("2030-01-01T00:00:00Z")
                    .build()],
            )
            .await;

        let replay = server.push_ops(&ctx, vec![create]).await;
        assert_eq!(replay.statuses(), vec![OpStatus::Ok], "[{}]", server.label());
        assert_eq!(replay.results[0].server_entity, Some(None));
        assert!(current(&server, &ctx, EntityKind::Customers, id).await.is_deleted());
    }
}

#[tokio::test]
async fn stale_operation_conflicts_before_payload_is_validated() {
    for server in TestServer::all() {
        let ctx = server.context();
        let id = Uuid::new_v4();
        let created = server
            .push_ops(&ctx, vec![OpBuilder::upsert(EntityKind::Customers, id).sample().build()])
            .await;
        let row = created.results[0].entity().unwrap().clone();

        let stale_and_invalid = OpBuilder::upsert(EntityKind::Customers, id)
            .payload(json!({"email": "not-an-email"}))
            .at("2024-01-01T00:00:00Z")
            .build();
        let response = server.push_ops(&ctx, vec![stale_and_invalid.clone()]).await;

        assert_eq!(response.statuses(), vec![OpStatus::Conflict], "[{}]", server.label());
        assert_eq!(response.results[0].entity(), Some(&row));
        let ledger = server.ledger(ctx.tenant).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[1].op_id, stale_and_invalid.op_id);
        assert_eq!(ledger[1].status, OpStatus::Conflict);

        let fresh_and_invalid = OpBuilder::upsert(EntityKind::Customers, id)
            .payload(json!({"email": "not-an-email"}))
            .at("2030-01-01T00:00:00Z")
            .build();
        let response = server.push_ops(&ctx, vec![fresh_and_invalid]).await;
        assert_eq!(response.statuses(), vec![OpStatus::Error]);
        assert_eq!(server.ledger(ctx.tenant).unwrap().len(), 2);
    }
}

#[tokio::test]
async fn deleting_a_tombstone_restamps_it() {
    for server in TestServer::all() {
        let ctx = server.context();
        let id = Uuid::new_v4();
        server
            .push_ops(&ctx, vec![OpBuilder::upsert(EntityKind::Products, id).sample().build()])
            .await;
        let first = server
            .push_ops(
                &ctx,
                vec![OpBuilder::delete(EntityKind::Products, id)
                    .at("2030-01-01T00:00:00Z")
                    .build()],
            )
            .await;
        let first = first.results[0].entity().unwrap().clone();

        server.clock.advance(Duration::seconds(5));
        let second = server
            .push_ops(
                &ctx,
                vec![OpBuilder::delete(EntityKind::Products, id)
                    .at("2030-01-02T00:00:00Z")
                    .device("tablet-2")
                    .build()],
            )
            .await;

        assert_eq!(second.statuses(), vec![OpStatus::Ok], "[{}]", server.label());
        let restamped = current(&server, &ctx, EntityKind::Products, id).await;
        assert!(restamped.is_deleted());
        assert!(restamped.deleted_at > first.deleted_at);
        assert_eq!(restamped.deleted_at, Some(restamped.updated_at));
        assert_eq!(restamped.version, first.version + 1);
        assert_eq!(restamped.device_id.as_deref(), Some("tablet-2"));
        assert_eq!(second.results[0].entity(), Some(&restamped));
        assert_eq!(server.audit.len(), 3);
    }
}

#[tokio::test]
async fn tenants_are_isolated() {
    for server in TestServer::all() {
        let a = server.context();
        let b = server.context();
        let id = Uuid::new_v4();
        let op = OpBuilder::upsert(EntityKind::Customers, id)
            .payload(json!({"name": "Tenant A"}))
            .build();
        server.push_ops(&a, vec![op.clone()]).await;

        assert_eq!(server.pull_since(&b, None).await.total(), 0);

        let mut reused = op;
        reused.payload = Some(json!({"name": "Tenant B"}));
        let response = server.push_ops(&b, vec![reused]).await;
        assert_eq!(response.statuses(), vec![OpStatus::Ok]);
        assert_eq!(response.results[0].entity().unwrap().owner_id, b.tenant);

        let row_a = current(&server, &a, EntityKind::Customers, id).await;
        assert_eq!(row_a.field("name"), Some(&json!("Tenant A")));
        assert_eq!(server.ledger(a.tenant).unwrap().len(), 1);
        assert_eq!(server.ledger(b.tenant).unwrap().len(), 1);
    }
}

#[tokio::test]
async fn store_failure_is_retryable() {
    let server = TestServer::memory();
    let store = server.memory.clone().unwrap();
    let ctx = server.context();
    let op = OpBuilder::upsert(EntityKind::Sales, Uuid::new_v4()).sample().build();

    store.fail_writes(EntityKind::Sales);
    let failed = server.push_ops(&ctx, vec![op.clone()]).await;
    assert_eq!(failed.statuses(), vec![OpStatus::Error]);
    assert_eq!(failed.results[0].message.as_deref(), Some(STORE_ERROR_MESSAGE));
    assert!(server.ledger(ctx.tenant).unwrap().is_empty());
    assert!(server.audit.is_empty());

    store.heal();
    let retried = server.push_ops(&ctx, vec![op]).await;
    assert_eq!(retried.statuses(), vec![OpStatus::Ok]);
    assert_eq!(server.ledger(ctx.tenant).unwrap().len(), 1);
}

#[tokio::test]
async fn audit_records_sync_actions() {
    for server in TestServer::all() {
        let ctx = server.context();
        let id = Uuid::new_v4();
        server
            .push_ops(
                &ctx,
                vec![
                    OpBuilder::upsert(EntityKind::Quotes, id).sample().build(),
                    OpBuilder::delete(EntityKind::Quotes, id)
                        .at("2030-01-01T00:00:00Z")
                        .device("tablet-7")
                        .build(),
                ],
            )
            .await;

        let events = server.audit.events();
        let actions: Vec<AuditAction> = events.iter().map(|event| event.action).collect();
        assert_eq!(actions, vec![AuditAction::SyncUpsert, AuditAction::SyncDelete]);
        assert_eq!(events[1].device_id.as_deref(), Some("tablet-7"));
        assert_eq!(events[1].actor_id, ctx.actor);
        assert!(events.iter().all(|event| event.entity_id == id));
    }
}

#[tokio::test]
async fn every_kind_accepts_its_sample() {
    for server in TestServer::all() {
        let ctx = server.context();
        let ops: Vec<_> = EntityKind::ALL
            .iter()
            .map(|kind| OpBuilder::upsert(*kind, Uuid::new_v4()).sample().build())
            .collect();
        let response = server.push_ops(&ctx, ops).await;
        assert!(
            response.statuses().iter().all(|status| *status == OpStatus::Ok),
            "[{}] {:?}",
            server.label(),
            response.results
        );

        let counts = server.counts(ctx.tenant).unwrap();
        assert_eq!(counts.len(), EntityKind::ALL.len());
        assert!(counts.iter().all(|(_, count)| count.live == 1 && count.deleted == 0));
    }
}

#[tokio::test]
async fn oversized_batch_is_rejected_whole() {
    let server = TestServer::memory();
    let ctx = server.context();
    let ops: Vec<_> = (0..501)
        .map(|_| OpBuilder::upsert(EntityKind::Customers, Uuid::new_v4()).sample().build())
        .collect();

    let err = server.push(&ctx, PushRequest::new(ops)).await.unwrap_err();
    assert!(err.is_client_error());
    assert!(server.ledger(ctx.tenant).unwrap().is_empty());
}

#[tokio::test]
async fn json_body_is_decoded_and_applied() {
    let server = TestServer::sqlite();
    let ctx = server.context();
    let body = json!([{
        "opId": "5b0f3c8e-1a2d-4e6f-9a0b-1c2d3e4f5a6b",
        "entity": "customers",
        "entityId": "6c1a4d9f-2b3e-4f70-8b1c-2d3e4f5a6b7c",
        "type": "UPSERT",
        "payload": {"name": "Acme", "email": "sales@acme.test"},
        "clientUpdatedAt": "2025-01-01T00:00:00Z",
        "deviceId": "pos-1"
    }]);

    let response = server.push_json(&ctx, &body.to_string()).await.unwrap();
    assert_eq!(response.statuses(), vec![OpStatus::Ok]);
    let row = response.results[0].entity().unwrap();
    assert_eq!(row.field("email"), Some(&json!("sales@acme.test")));
    assert_eq!(row.device_id.as_deref(), Some("pos-1"));
}
