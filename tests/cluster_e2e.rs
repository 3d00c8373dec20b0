//! End-to-end tests against mock coordinators and storage nodes served over
//! real HTTP.
//!
//! Tests cover:
//! - Fan-out and merge of partial query results
//! - Coordinator failover on dead and slow coordinators
//! - Affinity cache hits and invalidation after storage failures
//! - Catalog listing

use std::sync::Arc;
use std::time::Duration;

use minisql_router::config::ResolutionMode;
use minisql_router::{RouterError, RunSummary, Session};
use serde_json::json;

mod support;

use support::{dead_addr, spawn_coordinator, spawn_storage, test_config, CoordinatorState, StorageState};

#[tokio::test]
async fn test_create_insert_select_across_two_nodes() -> anyhow::Result<()> {
    let node_a = Arc::new(StorageState::healthy(json!({
        "Column Name": "id name",
        "Row 2": "2 bob",
    })));
    let node_b = Arc::new(StorageState::healthy(json!({
        "Column Name": "id name",
        "Row 1": "1 alice",
    })));
    let (addr_a, _a) = spawn_storage(node_a.clone()).await?;
    let (addr_b, _b) = spawn_storage(node_b.clone()).await?;

    let coord = Arc::new(CoordinatorState::owning(vec![
        addr_a.to_string(),
        addr_b.to_string(),
    ]));
    let (coord_addr, _c) = spawn_coordinator(coord.clone()).await?;

    let mut session = Session::new(&test_config(&[coord_addr], ResolutionMode::Cached))?;
    let summary = session
        .execute(
            "create table users (id int, name char(16));\n\
             insert into users values (1, 'alice');\n\
             select * from users;",
        )
        .await?;
    assert_eq!(summary, RunSummary { succeeded: 3, failed: 0 });

    // Later statements are served from the affinity cache.
    assert_eq!(coord.call_count(), 1);
    let create = &coord.calls()[0];
    assert_eq!(create.path, "create_table");
    assert_eq!(create.params.get("tableName").map(String::as_str), Some("USERS"));
    assert_eq!(
        create.body["text"],
        json!("CREATE TABLE USERS  (id int, name char(16)) ;")
    );

    for node in [&node_a, &node_b] {
        let paths: Vec<String> = node.requests().into_iter().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["create", "update", "query"]);
        assert_eq!(node.requests()[2].1["tableName"], json!("USERS"));
    }

    let table = session.table();
    let titles: Vec<&str> = table.columns.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["ID", "NAME"]);
    let names: Vec<&str> = table.rows.iter().filter_map(|row| row.get("name")).collect();
    assert_eq!(names, vec!["alice", "bob"]);

    let feed: Vec<bool> = session.feed().iter().map(|m| m.success).collect();
    assert_eq!(feed, vec![true, true, true]);
    Ok(())
}

#[tokio::test]
async fn test_insert_routes_by_primary_key() -> anyhow::Result<()> {
    let node = Arc::new(StorageState::healthy(json!({})));
    let (node_addr, _n) = spawn_storage(node.clone()).await?;
    let coord = Arc::new(CoordinatorState::owning(vec![node_addr.to_string()]));
    let (coord_addr, _c) = spawn_coordinator(coord.clone()).await?;

    let mut session = Session::new(&test_config(&[coord_addr], ResolutionMode::Failover))?;
    session.execute("insert into orders values (42, 'book')").await?;

    let call = &coord.calls()[0];
    assert_eq!(call.path, "insert");
    assert_eq!(call.params.get("tableName").map(String::as_str), Some("ORDERS"));
    assert_eq!(call.params.get("pkValue").map(String::as_str), Some("42"));
    assert_eq!(call.body, json!({}));
    Ok(())
}

#[tokio::test]
async fn test_failover_skips_dead_and_slow_coordinators() -> anyhow::Result<()> {
    let node = Arc::new(StorageState::healthy(json!({
        "Column Name": "id",
        "Row 1": "1",
    })));
    let (node_addr, _n) = spawn_storage(node.clone()).await?;

    let slow = Arc::new(
        CoordinatorState::owning(vec![node_addr.to_string()]).with_delay(Duration::from_secs(3)),
    );
    let live = Arc::new(CoordinatorState::owning(vec![node_addr.to_string()]));
    let (slow_addr, _s) = spawn_coordinator(slow.clone()).await?;
    let (live_addr, _l) = spawn_coordinator(live.clone()).await?;
    let dead = dead_addr().await?;

    let mut session = Session::new(&test_config(
        &[dead, slow_addr, live_addr],
        ResolutionMode::Failover,
    ))?;
    let summary = session.execute("select * from t; select * from t").await?;
    assert_eq!(summary.succeeded, 2);

    // Failover mode asks the coordinators for every statement.
    assert_eq!(slow.call_count(), 2);
    assert_eq!(live.call_count(), 2);
    assert_eq!(node.hit_count(), 2);
    assert_eq!(session.table().rows.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rejection_does_not_fail_over() -> anyhow::Result<()> {
    let first = Arc::new(CoordinatorState::rejecting(601, "Table exist"));
    let second = Arc::new(CoordinatorState::owning(vec!["127.0.0.1:1".to_string()]));
    let (first_addr, _f) = spawn_coordinator(first.clone()).await?;
    let (second_addr, _s) = spawn_coordinator(second.clone()).await?;

    let mut session = Session::new(&test_config(
        &[first_addr, second_addr],
        ResolutionMode::Cached,
    ))?;
    let summary = session.execute("create table t (id int)").await?;
    assert_eq!(summary, RunSummary { succeeded: 0, failed: 1 });
    assert_eq!(second.call_count(), 0);

    let latest = session.feed().latest().expect("feed entry");
    assert!(!latest.success);
    assert_eq!(latest.detail, "Table exist");
    Ok(())
}

#[tokio::test]
async fn test_all_coordinators_unreachable() -> anyhow::Result<()> {
    let first = dead_addr().await?;
    let second = dead_addr().await?;

    let mut session = Session::new(&test_config(&[first, second], ResolutionMode::Cached))?;
    let err = session
        .execute("select * from t; drop table t")
        .await
        .expect_err("run should stop");
    assert!(matches!(err, RouterError::CoordinatorsUnreachable { attempted: 2 }));
    assert_eq!(session.feed().len(), 1);
    assert!(session.table().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_storage_failure_invalidates_affinity() -> anyhow::Result<()> {
    let node = Arc::new(StorageState::healthy(json!({})));
    let (node_addr, _n) = spawn_storage(node.clone()).await?;
    let coord = Arc::new(CoordinatorState::owning(vec![node_addr.to_string()]));
    let (coord_addr, _c) = spawn_coordinator(coord.clone()).await?;

    let mut session = Session::new(&test_config(&[coord_addr], ResolutionMode::Cached))?;
    session
        .execute("update t set a = 1; update t set a = 2")
        .await?;
    assert_eq!(coord.call_count(), 1);
    assert_eq!(session.directory().cached_tables(), 1);

    node.set_status("500");
    let summary = session.execute("update t set a = 3").await?;
    assert_eq!(summary.failed, 1);
    assert_eq!(session.feed().latest().map(|m| m.detail.as_str()), Some("update failed"));
    assert_eq!(session.directory().cached_tables(), 0);

    node.set_status("200");
    session.execute("update t set a = 4").await?;
    assert_eq!(coord.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_list_tables_from_catalog() -> anyhow::Result<()> {
    let coord = Arc::new(CoordinatorState::owning(Vec::new()).with_regions(vec![
        vec!["USERS".to_string(), "ORDERS".to_string()],
        vec!["ITEMS".to_string()],
    ]));
    let (coord_addr, _c) = spawn_coordinator(coord).await?;
    let dead = dead_addr().await?;

    let session = Session::new(&test_config(&[dead, coord_addr], ResolutionMode::Cached))?;
    assert_eq!(session.list_tables().await?, vec!["USERS", "ORDERS", "ITEMS"]);
    Ok(())
}
