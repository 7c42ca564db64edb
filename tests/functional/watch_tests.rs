//! Folder watching through the CLI and the watcher directly

use crate::common::{sample_data, CliTestRunner, TestFixture};
use sheetsync::watcher::FolderWatcher;
use sheetsync::SnapshotStore;
use std::time::Duration;

#[test]
fn test_watch_once_syncs_existing_files() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();

    fixture
        .create_csv("watch/a.csv", &sample_data::simple_csv_data())
        .unwrap();
    fixture
        .create_csv("watch/b.csv", &sample_data::people_csv_data())
        .unwrap();
    fixture.create_csv_raw("watch/notes.txt", "not tabular").unwrap();
    // Fails to parse; the rest of the folder is still processed
    fixture.create_csv_raw("watch/c_empty.csv", "").unwrap();

    runner.expect_success(&["watch", "--once"]);

    // Files share the configured stream, so the last good file wins
    let snapshot = fixture.open_store().unwrap().load("default").unwrap();
    assert_eq!(snapshot.columns, vec!["Name", "Age", "City"]);
    assert_eq!(snapshot.len(), 2);
}

#[test]
fn test_watch_once_with_pattern_and_folder() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();

    let incoming = fixture.root().join("incoming");
    fixture
        .create_csv("incoming/products.csv", &sample_data::simple_csv_data())
        .unwrap();
    fixture
        .create_csv("incoming/people.csv", &sample_data::people_csv_data())
        .unwrap();

    runner.expect_success(&[
        "watch",
        "--once",
        "--folder",
        incoming.to_str().unwrap(),
        "--pattern",
        "prod*.csv",
    ]);

    let snapshot = fixture.open_store().unwrap().load("default").unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.columns, vec!["id", "name", "price"]);
}

#[test]
fn test_watch_once_missing_folder_is_empty() {
    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["watch", "--once"]);
    assert!(runner.fixture().open_store().unwrap().streams().unwrap().is_empty());
}

#[test]
fn test_watch_invalid_pattern() {
    let runner = CliTestRunner::new().unwrap();
    let error = runner.expect_failure(&["watch", "--once", "--pattern", "[*.csv"]);
    assert!(error.to_string().contains("Invalid watch pattern"));
}

#[test]
fn test_watcher_reports_new_files() {
    let fixture = TestFixture::new_empty().unwrap();
    let folder = fixture.root().join("drop");

    let mut watcher = FolderWatcher::new(&folder)
        .with_patterns(&["*.csv"])
        .unwrap()
        .with_poll_interval(Duration::from_millis(100));
    let events = watcher.start().unwrap();
    assert!(watcher.is_running());
    assert!(watcher.start().is_err());

    std::fs::write(folder.join("ignored.txt"), "x").unwrap();
    std::fs::write(folder.join("data.csv"), "a,b\n1,2\n").unwrap();

    let path = events.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(path.file_name().unwrap(), "data.csv");

    watcher.stop();
    assert!(!watcher.is_running());
}
