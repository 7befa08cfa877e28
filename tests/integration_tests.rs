use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;
use std::time::Duration;

use batchwatch::{ChangeBatch, WatchConfig, WatchError, WatchService};
use tempfile::TempDir;

type WatchResult = batchwatch::Result<ChangeBatch>;

fn channel_callback() -> (
    impl Fn(WatchResult) + Send + Sync + 'static,
    Receiver<WatchResult>,
) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let callback = move |result: WatchResult| {
        tx.lock().unwrap().send(result).ok();
    };
    (callback, rx)
}

/// Collect batches until `predicate` matches one, or panic on timeout.
fn wait_for_batch(
    rx: &Receiver<WatchResult>,
    predicate: impl Fn(&ChangeBatch) -> bool,
) -> ChangeBatch {
    for _ in 0..20 {
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(batch)) => {
                if predicate(&batch) {
                    return batch;
                }
            }
            Ok(Err(err)) => panic!("Unexpected watch error: {err}"),
            Err(err) => panic!("Timeout waiting for batch: {err:?}"),
        }
    }
    panic!("No matching batch arrived");
}

fn created_contains(batch: &ChangeBatch, name: &str) -> bool {
    batch
        .created
        .as_ref()
        .is_some_and(|paths| paths.contains(&PathBuf::from(name)))
}

#[test]
fn test_created_file_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let service = WatchService::new();

    let (callback, rx) = channel_callback();
    let _subscription = service
        .watch(temp_dir.path(), callback)
        .expect("Failed to start watching");

    fs::write(temp_dir.path().join("hello.txt"), "hi").expect("Failed to write test file");

    let batch = wait_for_batch(&rx, |batch| created_contains(batch, "hello.txt"));
    assert!(batch.deleted.is_none());
}

#[test]
fn test_two_subscriptions_share_one_watcher() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let service = WatchService::new();

    let (callback_a, rx_a) = channel_callback();
    let (callback_b, rx_b) = channel_callback();
    let _sub_a = service.watch(temp_dir.path(), callback_a).unwrap();
    let _sub_b = service.watch(temp_dir.path(), callback_b).unwrap();

    assert_eq!(service.registry().len(), 1);

    fs::write(temp_dir.path().join("shared.txt"), "x").unwrap();

    wait_for_batch(&rx_a, |batch| created_contains(batch, "shared.txt"));
    wait_for_batch(&rx_b, |batch| created_contains(batch, "shared.txt"));
}

#[test]
fn test_include_filter_passes_only_matches() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let service = WatchService::new();

    let (callback, rx) = channel_callback();
    let _subscription = service
        .watch(WatchConfig::new(temp_dir.path()).include("*.js"), callback)
        .unwrap();

    fs::write(temp_dir.path().join("a.js"), "x").unwrap();
    fs::write(temp_dir.path().join("a.txt"), "x").unwrap();

    let batch = wait_for_batch(&rx, |batch| created_contains(batch, "a.js"));
    assert!(!created_contains(&batch, "a.txt"));

    // No later batch may surface the filtered-out file either.
    while let Ok(result) = rx.recv_timeout(Duration::from_millis(500)) {
        let batch = result.expect("Unexpected watch error");
        assert!(!created_contains(&batch, "a.txt"));
    }
}

#[test]
fn test_excluded_only_changes_are_suppressed_entirely() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let service = WatchService::new();

    let (callback, rx) = channel_callback();
    let _subscription = service
        .watch(WatchConfig::new(temp_dir.path()).exclude("*.tmp"), callback)
        .unwrap();

    fs::write(temp_dir.path().join("x.tmp"), "scratch").unwrap();

    // The only change is excluded, so no callback at all: not even an
    // empty batch.
    assert!(rx.recv_timeout(Duration::from_millis(700)).is_err());
}

#[test]
fn test_preexisting_files_arrive_in_synchronous_catchup() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    for name in ["f1.txt", "f2.txt", "f3.txt"] {
        fs::write(temp_dir.path().join(name), "seed").unwrap();
    }

    let service = WatchService::new();
    let (callback, rx) = channel_callback();
    let _subscription = service.watch(temp_dir.path(), callback).unwrap();

    // The catch-up is delivered synchronously during watch(), so it is
    // already queued without any waiting.
    let first = rx
        .try_recv()
        .expect("Catch-up batch was not delivered synchronously")
        .expect("Unexpected watch error");

    let mut created = first.created.expect("Catch-up must report created files");
    created.sort();
    assert_eq!(
        created,
        vec![
            PathBuf::from("f1.txt"),
            PathBuf::from("f2.txt"),
            PathBuf::from("f3.txt")
        ]
    );
    assert!(first.updated.is_none());
    assert!(first.deleted.is_none());
}

#[test]
fn test_late_subscriber_catches_up_before_realtime_events() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let service = WatchService::new();

    let (callback_a, rx_a) = channel_callback();
    let _sub_a = service.watch(temp_dir.path(), callback_a).unwrap();

    fs::write(temp_dir.path().join("one.txt"), "1").unwrap();
    fs::write(temp_dir.path().join("two.txt"), "2").unwrap();
    wait_for_batch(&rx_a, |batch| created_contains(batch, "two.txt"));

    let (callback_b, rx_b) = channel_callback();
    let _sub_b = service.watch(temp_dir.path(), callback_b).unwrap();

    let first = rx_b
        .try_recv()
        .expect("Catch-up batch was not delivered synchronously")
        .expect("Unexpected watch error");

    let mut created = first.created.expect("Catch-up must report created files");
    created.sort();
    assert_eq!(
        created,
        vec![PathBuf::from("one.txt"), PathBuf::from("two.txt")]
    );
    assert!(first.updated.is_none());
    assert!(first.deleted.is_none());
}

#[test]
fn test_deletion_after_flush_emits_deleted_only_batch() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let service = WatchService::new();

    let (callback, rx) = channel_callback();
    let _subscription = service.watch(temp_dir.path(), callback).unwrap();

    let target = temp_dir.path().join("doomed.txt");
    fs::write(&target, "soon gone").unwrap();
    wait_for_batch(&rx, |batch| created_contains(batch, "doomed.txt"));

    fs::remove_file(&target).unwrap();

    let batch = wait_for_batch(&rx, |batch| {
        batch
            .deleted
            .as_ref()
            .is_some_and(|paths| paths.contains(&PathBuf::from("doomed.txt")))
    });
    assert!(batch.created.is_none());
    assert!(batch.updated.is_none());

    // The live index forgets the file as well.
    let watcher = service
        .registry()
        .get_or_create(&WatchConfig::new(temp_dir.path()))
        .unwrap();
    assert!(!watcher.known_files().contains(&PathBuf::from("doomed.txt")));
}

#[test]
fn test_directory_removal_is_not_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir(temp_dir.path().join("subdir")).unwrap();

    let service = WatchService::new();
    let (callback, rx) = channel_callback();
    let _subscription = service.watch(temp_dir.path(), callback).unwrap();

    fs::remove_dir(temp_dir.path().join("subdir")).unwrap();

    // Directories never enter the live index, so removing one must not
    // surface it as a deleted file in any batch.
    while let Ok(result) = rx.recv_timeout(Duration::from_millis(700)) {
        let batch = result.expect("Unexpected watch error");
        assert!(
            batch.deleted.is_none(),
            "directory removal leaked into a batch: {batch:?}"
        );
    }
}

#[test]
fn test_modification_is_reported_as_updated() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let target = temp_dir.path().join("tracked.txt");
    fs::write(&target, "v1").unwrap();

    let service = WatchService::new();
    let (callback, rx) = channel_callback();
    let _subscription = service.watch(temp_dir.path(), callback).unwrap();

    // Drain the catch-up and the initial-scan flush first.
    wait_for_batch(&rx, |batch| created_contains(batch, "tracked.txt"));
    while rx.recv_timeout(Duration::from_millis(300)).is_ok() {}

    fs::write(&target, "v2").unwrap();

    wait_for_batch(&rx, |batch| {
        batch
            .updated
            .as_ref()
            .is_some_and(|paths| paths.contains(&PathBuf::from("tracked.txt")))
    });
}

#[test]
fn test_cancelled_subscription_receives_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let service = WatchService::new();

    let (callback, rx) = channel_callback();
    let mut subscription = service.watch(temp_dir.path(), callback).unwrap();
    subscription.cancel();

    fs::write(temp_dir.path().join("unseen.txt"), "x").unwrap();

    assert!(rx.recv_timeout(Duration::from_millis(700)).is_err());
}

#[test]
fn test_configuration_errors_fail_synchronously() {
    let service = WatchService::new();

    let result = service.watch("", |_| {});
    assert!(matches!(result, Err(WatchError::MissingDirectory)));

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let result = service.watch(WatchConfig::new(temp_dir.path()).include("a{b"), |_| {});
    assert!(matches!(result, Err(WatchError::Pattern { .. })));

    // Nothing was established for either failure.
    assert!(service.registry().is_empty());
}
