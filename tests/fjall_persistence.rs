//! On-disk Persistence Tests
//!
//! Views opened through `ViewFactory::open` live in a fjall store under the
//! log's directory and survive process restarts.
//!
//! Tests for invariants:
//! - Committed batches survive reopen
//! - A scan observes whole batches even while a commit is being applied

mod common;

use std::sync::Arc;

use common::{doc, inline_factory, pointer_factory, temp_dir, MemoryLog};
use logview::{Durability, ReadOptions, Startup, ViewConfig, ViewKey};
use serde_json::json;

#[tokio::test]
async fn test_view_survives_reopen() {
    let dir = temp_dir();
    let log = Arc::new(MemoryLog::in_dir(dir.path().to_path_buf()));
    for i in 0..20 {
        log.append(doc(&format!("k{:02}", i), json!(i)));
    }

    {
        let view = inline_factory(1).open(log.clone(), "by_key").unwrap();
        view.create_sink(|_| {})
            .unwrap()
            .run(log.stream_after(None))
            .await
            .unwrap();
        view.close().await.unwrap();
    }
    assert!(dir.path().join("by_key").is_dir());

    let view = inline_factory(1).open(log.clone(), "by_key").unwrap();
    assert_eq!(view.startup(), &Startup::Resumed { since: 19 });
    assert_eq!(view.get("k07").unwrap().value, json!(7));
    assert_eq!(view.read(ReadOptions::new()).unwrap().count(), 20);
    view.close().await.unwrap();
}

#[tokio::test]
async fn test_views_share_a_log_directory() {
    let dir = temp_dir();
    let log = Arc::new(MemoryLog::in_dir(dir.path().to_path_buf()));
    log.append(doc("a", json!("inline")));

    let inline = inline_factory(1).open(log.clone(), "inline").unwrap();
    let pointers = pointer_factory(1).open(log.clone(), "pointers").unwrap();
    for view in [&inline, &pointers] {
        view.create_sink(|_| {})
            .unwrap()
            .run(log.stream_after(None))
            .await
            .unwrap();
    }

    assert_eq!(inline.get("a").unwrap().value, json!("inline"));
    assert_eq!(
        pointers.get("a").unwrap().value,
        json!({"key": "a", "value": "inline"})
    );

    inline.close().await.unwrap();
    pointers.close().await.unwrap();
}

#[tokio::test]
async fn test_version_change_on_disk() {
    let dir = temp_dir();
    let log = Arc::new(MemoryLog::in_dir(dir.path().to_path_buf()));
    for i in 0..5 {
        log.append(doc(&format!("k{}", i), json!(i)));
    }

    {
        let view = inline_factory(1).open(log.clone(), "v").unwrap();
        view.create_sink(|_| {})
            .unwrap()
            .run(log.stream_after(None))
            .await
            .unwrap();
        view.close().await.unwrap();
    }

    let view = inline_factory(2)
        .with_config(ViewConfig::new(2).with_durability(Durability::SyncAll))
        .open(log.clone(), "v")
        .unwrap();
    assert!(view.is_outdated());
    assert_eq!(view.since().get(), None);
    assert_eq!(view.read(ReadOptions::new()).unwrap().count(), 0);
    view.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fjall_scans_see_whole_batches() {
    let dir = temp_dir();
    let log = Arc::new(MemoryLog::in_dir(dir.path().to_path_buf()));
    let entries: Vec<_> = (0..600)
        .map(|i| log.append(doc(&format!("k{:04}", i), json!(i))))
        .collect();

    let view = inline_factory(1)
        .with_config(ViewConfig::new(1).with_batch_size(50))
        .open(log.clone(), "v")
        .unwrap();

    let writer = {
        let view = view.clone();
        tokio::spawn(async move {
            view.create_sink(|_| {})
                .unwrap()
                .run(futures_util::stream::iter(entries))
                .await
                .unwrap();
        })
    };

    // Cursor and records come from the same snapshot and must agree
    let mut scans = 0;
    while !writer.is_finished() || scans == 0 {
        let records: Vec<_> = view
            .read(ReadOptions::new().values(false).include_internal(true))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let cursor = records
            .iter()
            .find(|r| r.key() == Some(&ViewKey::Cursor))
            .and_then(|r| r.seq());
        let users = records
            .iter()
            .filter(|r| matches!(r.key(), Some(ViewKey::User(_))))
            .count();
        match cursor {
            Some(since) => assert_eq!(users as u64, since + 1, "scan saw part of a batch"),
            None => assert_eq!(users, 0),
        }
        scans += 1;
        tokio::task::yield_now().await;
    }

    writer.await.unwrap();
    assert_eq!(view.since().get(), Some(599));
    view.close().await.unwrap();
}
