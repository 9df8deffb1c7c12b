use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::{json, Value};

use super::testing::{harness, RecordedCall};
use super::*;
use crate::models::{
    Budget, BudgetPeriod, Category, EntityKind, Goal, NewTodo, NewTransaction, Priority, Todo,
    TodoUpdate, Transaction, TransactionType, Wallet, WalletUpdate,
};
use crate::storage::{KeyValueMedium, STORAGE_KEY_PREFIX};

fn new_todo(text: &str) -> NewTodo {
    NewTodo {
        text: text.to_string(),
        due_date: None,
        priority: Priority::Medium,
        category: Category::Work,
    }
}

fn todo_row(id: &str, text: &str) -> Value {
    json!({
        "id": id,
        "text": text,
        "completed": false,
        "created_at": 1_700_000_000_000_i64,
        "priority": "low",
        "category": "general",
        "username": "ana",
    })
}

fn cached_data(medium: &dyn KeyValueMedium, key: &str) -> Value {
    let raw = medium
        .get(STORAGE_KEY_PREFIX, key)
        .unwrap()
        .expect("cache slot");
    serde_json::from_str::<Value>(&raw).unwrap()["data"].clone()
}

fn methods(calls: &[RecordedCall]) -> Vec<(&'static str, Vec<String>)> {
    calls
        .iter()
        .filter(|call| call.method != "get_all")
        .map(|call| (call.method, call.ids.clone()))
        .collect()
}

async fn wait_for_empty_queue(overlay: &SyncOverlay, username: &str) {
    for _ in 0..200 {
        if overlay.pending_count(username).unwrap() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("pending queue for {} never drained", username);
}

#[tokio::test]
async fn repeated_online_reads_leave_identical_cache() {
    let h = harness(true);
    h.remote.seed(
        EntityKind::Todo,
        vec![todo_row("t-2", "second"), todo_row("t-1", "first")],
    );

    let first = h.overlay.get_all::<Todo>("ana").await.unwrap();
    let first_cache = cached_data(h.medium.as_ref(), "todos_ana");
    let second = h.overlay.get_all::<Todo>("ana").await.unwrap();
    let second_cache = cached_data(h.medium.as_ref(), "todos_ana");

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(
        serde_json::to_string(&first_cache).unwrap(),
        serde_json::to_string(&second_cache).unwrap()
    );
}

#[tokio::test]
async fn failed_add_returns_local_candidate_and_caches_it() {
    let h = harness(true);
    h.remote.set_failing(true);

    let added = h.overlay.add::<Todo>("ana", new_todo("buy milk")).await.unwrap();
    assert!(!added.id.is_empty());
    assert!(!added.completed);
    assert_eq!(added.text, "buy milk");

    h.tracker.went_offline();
    let listed = h.overlay.get_all::<Todo>("ana").await.unwrap();
    assert_eq!(listed, vec![added.clone()]);

    let pending = h.overlay.store().get_pending_operations("ana").unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(
        pending[0].operation,
        OperationKind::Todo(EntityOperation::Add(added))
    );
}

#[tokio::test]
async fn reconnect_replays_queue_in_enqueue_order() {
    let h = harness(false);
    h.overlay.session().sign_in("ana").unwrap();
    let listener = h.overlay.spawn_replay_on_reconnect();

    let todo = h.overlay.add::<Todo>("ana", new_todo("draft")).await.unwrap();
    let status = h
        .overlay
        .update::<Todo>("ana", &todo.id, TodoUpdate::complete(1_700_000_000_500))
        .await
        .unwrap();
    assert_eq!(status.outcome, MutationOutcome::Queued);
    h.overlay.delete::<Todo>("ana", &todo.id).await.unwrap();
    assert_eq!(h.overlay.pending_count("ana").unwrap(), 3);
    assert!(h.remote.calls().is_empty());

    assert_eq!(h.tracker.went_online(), Some(ConnectivityEdge::CameOnline));
    wait_for_empty_queue(&h.overlay, "ana").await;

    assert_eq!(
        methods(&h.remote.calls()),
        vec![
            ("create", vec![todo.id.clone()]),
            ("update", vec![todo.id.clone()]),
            ("delete", vec![todo.id.clone()]),
        ]
    );
    assert!(h.remote.rows(EntityKind::Todo).is_empty());

    drop(h.tracker);
    listener.await.unwrap();
}

#[tokio::test]
async fn failed_replay_entry_stays_queued_and_later_entries_still_run() {
    let h = harness(false);
    h.overlay
        .update::<Todo>("ana", "t-1", TodoUpdate::reopen())
        .await
        .unwrap();
    h.overlay
        .update::<Todo>("ana", "t-2", TodoUpdate::reopen())
        .await
        .unwrap();
    let queued = h.overlay.store().get_pending_operations("ana").unwrap();

    h.remote.fail_id("t-1");
    h.tracker.went_online();
    let report = h.overlay.sync_pending_operations_for("ana").await.unwrap();

    assert_eq!(report.status, ReplayStatus::Partial);
    assert_eq!((report.attempted, report.synced, report.failed), (2, 1, 1));
    assert_eq!(
        h.overlay.store().get_pending_operations("ana").unwrap(),
        vec![queued[0].clone()]
    );
    assert_eq!(
        methods(&h.remote.calls()),
        vec![
            ("update", vec!["t-1".to_string()]),
            ("update", vec!["t-2".to_string()]),
        ]
    );

    h.remote.heal_id("t-1");
    let retry = h.overlay.sync_pending_operations_for("ana").await.unwrap();
    assert_eq!(retry.status, ReplayStatus::Completed);
    assert_eq!(h.overlay.pending_count("ana").unwrap(), 0);
}

#[tokio::test]
async fn update_merges_only_the_patched_field() {
    for online in [true, false] {
        let h = harness(true);
        h.remote.seed(
            EntityKind::Todo,
            vec![todo_row("t-1", "walk"), todo_row("t-2", "read")],
        );
        h.overlay.get_all::<Todo>("ana").await.unwrap();
        let before = cached_data(h.medium.as_ref(), "todos_ana");
        h.tracker.set_online(online);

        let patch = TodoUpdate {
            text: Some("walk the dog".to_string()),
            ..Default::default()
        };
        let status = h.overlay.update::<Todo>("ana", "t-1", patch).await.unwrap();
        assert_eq!(status.is_synced(), online);

        let after = cached_data(h.medium.as_ref(), "todos_ana");
        let mut expected = before.clone();
        expected[0]["text"] = json!("walk the dog");
        assert_eq!(after, expected);
        assert_eq!(after[1], before[1]);
    }
}

#[tokio::test]
async fn bulk_delete_removes_exactly_the_present_targets() {
    let h = harness(true);
    h.remote.seed(
        EntityKind::Todo,
        (1..=5)
            .map(|n| todo_row(&format!("t-{}", n), "task"))
            .collect(),
    );
    h.overlay.get_all::<Todo>("ana").await.unwrap();
    h.tracker.went_offline();

    let targets = vec!["t-1".to_string(), "t-3".to_string(), "t-9".to_string()];
    let status = h.overlay.bulk_delete::<Todo>("ana", &targets).await.unwrap();
    assert_eq!(
        status.message,
        "Todo bulk deleted locally, will sync when online"
    );

    let remaining = h.overlay.cached::<Todo>("ana").unwrap();
    assert_eq!(remaining.len(), 5 - 2);
    assert_eq!(
        remaining.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
        vec!["t-2", "t-4", "t-5"]
    );
}

#[tokio::test]
async fn bulk_update_touches_only_targets() {
    let h = harness(true);
    h.remote.seed(
        EntityKind::Todo,
        vec![todo_row("t-1", "a"), todo_row("t-2", "b"), todo_row("t-3", "c")],
    );
    h.overlay.get_all::<Todo>("ana").await.unwrap();

    let ids = vec!["t-1".to_string(), "t-3".to_string()];
    let status = h
        .overlay
        .bulk_update::<Todo>("ana", &ids, TodoUpdate::complete(42))
        .await
        .unwrap();
    assert!(status.is_synced());

    let cached = h.overlay.cached::<Todo>("ana").unwrap();
    let completed = cached
        .iter()
        .map(|t| (t.id.as_str(), t.completed, t.completed_at))
        .collect::<Vec<_>>();
    assert_eq!(
        completed,
        vec![
            ("t-1", true, Some(42)),
            ("t-2", false, None),
            ("t-3", true, Some(42)),
        ]
    );
    assert_eq!(h.overlay.pending_count("ana").unwrap(), 0);
}

#[tokio::test]
async fn replayed_add_keeps_a_single_cached_entity() {
    let h = harness(false);
    let added = h.overlay.add::<Todo>("ana", new_todo("offline task")).await.unwrap();

    h.tracker.went_online();
    let report = h.overlay.sync_pending_operations_for("ana").await.unwrap();
    assert_eq!(report.synced, 1);

    let cached = h.overlay.cached::<Todo>("ana").unwrap();
    assert_eq!(cached, vec![added.clone()]);

    let refreshed = h.overlay.get_all::<Todo>("ana").await.unwrap();
    assert_eq!(refreshed.len(), 1);
    assert_eq!(refreshed[0].id, added.id);
    assert_eq!(h.remote.rows(EntityKind::Todo).len(), 1);
}

#[tokio::test]
async fn online_add_caches_server_row() {
    let h = harness(true);
    let added = h.overlay.add::<Todo>("ana", new_todo("synced")).await.unwrap();

    assert_eq!(h.overlay.pending_count("ana").unwrap(), 0);
    let cached = cached_data(h.medium.as_ref(), "todos_ana");
    assert_eq!(cached[0]["id"], json!(added.id));
    assert_eq!(cached[0]["username"], json!("ana"));
}

#[tokio::test]
async fn reads_without_cache() {
    let h = harness(false);
    assert!(h.overlay.get_all::<Todo>("ana").await.unwrap().is_empty());

    h.tracker.went_online();
    h.remote.set_failing(true);
    let err = h.overlay.get_all::<Todo>("ana").await.unwrap_err();
    assert!(err.as_remote().is_some_and(|e| e.is_retryable()));
}

#[tokio::test]
async fn failed_online_read_falls_back_to_cache() {
    let h = harness(true);
    h.remote.seed(EntityKind::Todo, vec![todo_row("t-1", "cached")]);
    h.overlay.get_all::<Todo>("ana").await.unwrap();

    h.remote.set_failing(true);
    let listed = h.overlay.get_all::<Todo>("ana").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].text, "cached");
}

#[tokio::test]
async fn replay_reports_idle_and_missing_session() {
    let h = harness(true);
    let report = h.overlay.sync_pending_operations().await.unwrap();
    assert_eq!(report.status, ReplayStatus::NoSession);

    h.overlay.session().sign_in("ana").unwrap();
    let report = h.overlay.sync_pending_operations().await.unwrap();
    assert_eq!(report.status, ReplayStatus::Idle);
    assert_eq!(report.attempted, 0);
}

#[tokio::test]
async fn status_queries_track_cache_and_queue() {
    let h = harness(false);
    assert_eq!(h.overlay.last_synced_at("ana", EntityKind::Todo).unwrap(), None);

    h.overlay.add::<Todo>("ana", new_todo("one")).await.unwrap();
    h.overlay.add::<Todo>("ana", new_todo("two")).await.unwrap();

    assert_eq!(h.overlay.pending_count("ana").unwrap(), 2);
    assert_eq!(h.overlay.pending_count("ben").unwrap(), 0);
    assert!(h
        .overlay
        .last_synced_at("ana", EntityKind::Todo)
        .unwrap()
        .is_some());
    assert_eq!(
        h.overlay
            .cached::<Todo>("ana")
            .unwrap()
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>(),
        vec!["two", "one"]
    );
}

#[tokio::test]
async fn reconnect_without_queue_sends_nothing() {
    let h = harness(true);
    h.overlay.session().sign_in("ana").unwrap();
    let listener = h.overlay.spawn_replay_on_reconnect();

    h.tracker.went_offline();
    h.tracker.went_online();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(h.remote.calls().is_empty());

    drop(h.tracker);
    listener.await.unwrap();
}

#[tokio::test]
async fn null_columns_read_as_defaults_instead_of_dropping_rows() {
    let h = harness(true);
    h.remote.seed(
        EntityKind::Budget,
        vec![json!({
            "id": "b-1", "category": "Food", "limit_amount": 300,
            "spent": null, "period": null, "created_at": 1, "username": "ana",
        })],
    );
    h.remote.seed(
        EntityKind::Goal,
        vec![json!({
            "id": "g-1", "name": "Bike", "target_amount": 800, "saved_amount": null,
            "color": null, "created_at": 1, "username": "ana",
        })],
    );
    h.remote.seed(
        EntityKind::Transaction,
        vec![json!({
            "id": "tx-1", "type": "expense", "amount": 9.5, "category": "Food",
            "description": null, "date": "2026-10-01", "wallet_id": "w-1",
            "tags": null, "username": "ana",
        })],
    );
    h.remote.seed(
        EntityKind::Wallet,
        vec![json!({
            "id": "w-1", "name": "Cash", "type": "cash", "balance": 40,
            "color": null, "created_at": 1, "username": "ana",
        })],
    );

    let budgets = h.overlay.get_all::<Budget>("ana").await.unwrap();
    let goals = h.overlay.get_all::<Goal>("ana").await.unwrap();
    let transactions = h.overlay.get_all::<Transaction>("ana").await.unwrap();
    let wallets = h.overlay.get_all::<Wallet>("ana").await.unwrap();

    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets[0].spent, dec!(0));
    assert_eq!(budgets[0].period, BudgetPeriod::Monthly);
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].saved_amount, dec!(0));
    assert_eq!(goals[0].color, "");
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].description, "");
    assert!(transactions[0].tags.is_empty());
    assert_eq!(wallets.len(), 1);
    assert_eq!(wallets[0].color, "");

    h.tracker.set_online(false);
    assert_eq!(h.overlay.cached::<Budget>("ana").unwrap().len(), 1);
    let goal = h.overlay.find_cached::<Goal>("ana", "g-1").unwrap();
    assert_eq!(goal.map(|g| g.id), Some("g-1".to_string()));
}

#[tokio::test]
async fn reopening_a_todo_clears_completion_in_cache_and_backend() {
    for online in [true, false] {
        let h = harness(true);
        let mut done = todo_row("t-1", "file taxes");
        done["completed"] = json!(true);
        done["completed_at"] = json!(1_700_000_000_900_i64);
        h.remote.seed(EntityKind::Todo, vec![done]);
        h.overlay.get_all::<Todo>("ana").await.unwrap();
        h.tracker.set_online(online);

        let status = h
            .overlay
            .update::<Todo>("ana", "t-1", TodoUpdate::reopen())
            .await
            .unwrap();
        assert_eq!(status.is_synced(), online);

        let cached = h.overlay.find_cached::<Todo>("ana", "t-1").unwrap().unwrap();
        assert!(!cached.completed);
        assert_eq!(cached.completed_at, None);

        h.tracker.set_online(true);
        h.overlay.sync_pending_operations_for("ana").await.unwrap();
        let row = &h.remote.rows(EntityKind::Todo)[0];
        assert_eq!(row["completed"], json!(false));
        assert_eq!(row["completed_at"], Value::Null);
    }
}

#[tokio::test]
async fn bulk_reopen_without_explicit_clear_still_clears_completion() {
    let h = harness(true);
    let mut rows = vec![todo_row("t-1", "a"), todo_row("t-2", "b")];
    for row in rows.iter_mut() {
        row["completed"] = json!(true);
        row["completed_at"] = json!(77);
    }
    h.remote.seed(EntityKind::Todo, rows);
    h.overlay.get_all::<Todo>("ana").await.unwrap();
    h.tracker.set_online(false);

    let ids = vec!["t-1".to_string(), "t-2".to_string()];
    let patch = TodoUpdate {
        completed: Some(false),
        ..Default::default()
    };
    h.overlay.bulk_update::<Todo>("ana", &ids, patch).await.unwrap();

    let cached = h.overlay.cached::<Todo>("ana").unwrap();
    assert!(cached.iter().all(|t| !t.completed && t.completed_at.is_none()));

    let queued = h.overlay.store().get_pending_operations("ana").unwrap();
    match &queued[0].operation {
        OperationKind::Todo(EntityOperation::BulkUpdate { updates, .. }) => {
            assert_eq!(updates.completed_at, Some(None));
        }
        other => panic!("unexpected queued operation {:?}", other),
    }
}

#[tokio::test]
async fn remote_failure_applies_every_mutation_locally_and_queues_it() {
    let h = harness(true);
    h.remote.seed(
        EntityKind::Todo,
        vec![
            todo_row("t-1", "a"),
            todo_row("t-2", "b"),
            todo_row("t-3", "c"),
            todo_row("t-4", "d"),
        ],
    );
    h.overlay.get_all::<Todo>("ana").await.unwrap();
    h.remote.set_failing(true);

    let patch = TodoUpdate {
        text: Some("a2".to_string()),
        ..Default::default()
    };
    let updated = h.overlay.update::<Todo>("ana", "t-1", patch).await.unwrap();
    let deleted = h.overlay.delete::<Todo>("ana", "t-2").await.unwrap();
    let bulk_updated = h
        .overlay
        .bulk_update::<Todo>("ana", &["t-3".to_string()], TodoUpdate::complete(9))
        .await
        .unwrap();
    let bulk_deleted = h
        .overlay
        .bulk_delete::<Todo>("ana", &["t-4".to_string()])
        .await
        .unwrap();

    assert_eq!(updated.message, "Todo updated locally, will sync when online");
    assert_eq!(deleted.message, "Todo deleted locally, will sync when online");
    assert_eq!(
        bulk_updated.message,
        "Todo bulk updated locally, will sync when online"
    );
    assert_eq!(
        bulk_deleted.message,
        "Todo bulk deleted locally, will sync when online"
    );

    let cached = h.overlay.cached::<Todo>("ana").unwrap();
    let summary = cached
        .iter()
        .map(|t| (t.id.as_str(), t.text.as_str(), t.completed))
        .collect::<Vec<_>>();
    assert_eq!(summary, vec![("t-1", "a2", false), ("t-3", "c", true)]);

    let labels = h
        .overlay
        .store()
        .get_pending_operations("ana")
        .unwrap()
        .iter()
        .map(|op| op.label())
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        vec!["update_todo", "delete_todo", "bulk_update_todo", "bulk_delete_todo"]
    );
}

#[tokio::test]
async fn queued_wallet_and_transaction_replay_to_their_collections() {
    let h = harness(true);
    h.remote.seed(
        EntityKind::Wallet,
        vec![json!({
            "id": "w-1", "name": "Cash", "type": "cash", "balance": 100,
            "color": "", "created_at": 1, "username": "ana",
        })],
    );
    h.overlay.get_all::<Wallet>("ana").await.unwrap();
    h.tracker.set_online(false);

    h.overlay
        .update::<Wallet>("ana", "w-1", WalletUpdate::balance(dec!(87.45)))
        .await
        .unwrap();
    let tx = h
        .overlay
        .add::<Transaction>(
            "ana",
            NewTransaction {
                kind: TransactionType::Expense,
                amount: dec!(12.55),
                category: "Food".to_string(),
                description: "groceries".to_string(),
                date: "2026-10-18".to_string(),
                wallet_id: "w-1".to_string(),
                tags: vec!["weekly".to_string()],
            },
        )
        .await
        .unwrap();

    let queued = h.overlay.store().get_pending_operations("ana").unwrap();
    assert_eq!(queued.len(), 2);
    match &queued[0].operation {
        OperationKind::Wallet(EntityOperation::Update { id, updates }) => {
            assert_eq!(id, "w-1");
            assert_eq!(updates.balance, Some(dec!(87.45)));
        }
        other => panic!("unexpected queued operation {:?}", other),
    }
    match &queued[1].operation {
        OperationKind::Transaction(EntityOperation::Add(record)) => assert_eq!(record, &tx),
        other => panic!("unexpected queued operation {:?}", other),
    }

    h.tracker.set_online(true);
    let report = h.overlay.sync_pending_operations_for("ana").await.unwrap();
    assert_eq!((report.attempted, report.synced, report.failed), (2, 2, 0));

    let sent = h
        .remote
        .calls()
        .into_iter()
        .filter(|call| call.method != "get_all")
        .map(|call| (call.method, call.kind, call.ids))
        .collect::<Vec<_>>();
    assert_eq!(
        sent,
        vec![
            ("update", EntityKind::Wallet, vec!["w-1".to_string()]),
            ("create", EntityKind::Transaction, vec![tx.id.clone()]),
        ]
    );

    let wallet: Wallet =
        serde_json::from_value(h.remote.rows(EntityKind::Wallet)[0].clone()).unwrap();
    assert_eq!(wallet.balance, dec!(87.45));
    let stored: Vec<Transaction> = h
        .remote
        .rows(EntityKind::Transaction)
        .into_iter()
        .map(|row| serde_json::from_value(row).unwrap())
        .collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, dec!(12.55));
    assert_eq!(h.overlay.cached::<Transaction>("ana").unwrap().len(), 1);
}

#[tokio::test]
async fn offline_bulk_update_applies_locally_then_replays() {
    let h = harness(true);
    h.remote.seed(
        EntityKind::Todo,
        vec![todo_row("t-1", "a"), todo_row("t-2", "b"), todo_row("t-3", "c")],
    );
    h.overlay.get_all::<Todo>("ana").await.unwrap();
    h.tracker.set_online(false);
    h.remote.clear_calls();

    let ids = vec!["t-1".to_string(), "t-3".to_string()];
    let patch = TodoUpdate {
        priority: Some(Priority::High),
        ..Default::default()
    };
    let status = h.overlay.bulk_update::<Todo>("ana", &ids, patch).await.unwrap();
    assert_eq!(status.message, "Todo bulk updated locally, will sync when online");
    assert!(h.remote.calls().is_empty());

    let priorities = h
        .overlay
        .cached::<Todo>("ana")
        .unwrap()
        .into_iter()
        .map(|t| t.priority)
        .collect::<Vec<_>>();
    assert_eq!(priorities, vec![Priority::High, Priority::Low, Priority::High]);

    h.tracker.set_online(true);
    h.overlay.sync_pending_operations_for("ana").await.unwrap();
    assert_eq!(methods(&h.remote.calls()), vec![("bulk_update", ids.clone())]);
    let backend = h
        .remote
        .rows(EntityKind::Todo)
        .into_iter()
        .map(|row| row["priority"].clone())
        .collect::<Vec<_>>();
    assert_eq!(backend, vec![json!("high"), json!("low"), json!("high")]);
}
