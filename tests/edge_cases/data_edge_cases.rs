//! Edge case tests for data parsing and change detection

use crate::common::TestFixture;
use sheetsync::data::DataProcessor;
use sheetsync::{Cell, DeltaTracker, IdentityKey, MemorySnapshotStore, SheetSyncError, Table};

fn load(fixture: &TestFixture, name: &str, content: &str) -> sheetsync::Result<Table> {
    let path = fixture.create_csv_raw(name, content)?;
    DataProcessor::new()?.load_table(&path)
}

#[test]
fn test_unicode_values_survive_parsing() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_unicode_csv("unicode.csv").unwrap();

    let table = DataProcessor::new().unwrap().load_table(&path).unwrap();
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.rows[2]["name"], Cell::from("北京"));
    assert_eq!(table.rows[3]["name"], Cell::from("🚀"));
}

#[test]
fn test_quoted_fields() {
    let fixture = TestFixture::new().unwrap();
    let table = load(
        &fixture,
        "quoted.csv",
        "id,name\n1,\"Product,D\"\n2,\"Product \"\"C\"\"\"\n",
    )
    .unwrap();

    assert_eq!(table.rows[0]["name"], Cell::from("Product,D"));
    assert_eq!(table.rows[1]["name"], Cell::from("Product \"C\""));
}

#[test]
fn test_blank_rows_and_columns_are_dropped() {
    let fixture = TestFixture::new().unwrap();
    let table = load(&fixture, "sparse.csv", "a,b,c\n1,,x\n,,\n2,,y\n").unwrap();

    assert_eq!(table.columns, vec!["a", "c"]);
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.rows[1]["c"], Cell::from("y"));
}

#[test]
fn test_whitespace_and_types_are_normalized() {
    let fixture = TestFixture::new().unwrap();
    let table = load(
        &fixture,
        "types.csv",
        "name,qty,price,active\n  Apple ,3,1.25,TRUE\nPear,   ,0.5,false\n",
    )
    .unwrap();

    assert_eq!(table.rows[0]["name"], Cell::from("Apple"));
    assert_eq!(table.rows[0]["qty"], Cell::Integer(3));
    assert_eq!(table.rows[0]["price"], Cell::Float(1.25));
    assert_eq!(table.rows[0]["active"], Cell::Bool(true));
    assert_eq!(table.rows[1]["qty"], Cell::Empty);
}

#[test]
fn test_header_only_file() {
    let fixture = TestFixture::new().unwrap();
    match load(&fixture, "header_only.csv", "id,name,price\n") {
        Ok(table) => assert!(table.is_empty()),
        Err(error) => {
            let message = error.to_string();
            assert!(message.contains("empty") || message.contains("no data"), "{}", message);
        }
    }
}

#[test]
fn test_unsupported_extension() {
    let fixture = TestFixture::new().unwrap();
    let error = load(&fixture, "data.json", "[]").unwrap_err();
    assert!(matches!(
        error,
        SheetSyncError::UnsupportedFileType { ref extension } if extension == ".json"
    ));

    let error = load(&fixture, "README", "hello").unwrap_err();
    assert!(matches!(error, SheetSyncError::UnsupportedFileType { .. }));
}

#[test]
fn test_corrupted_excel_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_corrupted_file("broken.xlsx").unwrap();
    assert!(DataProcessor::new().unwrap().load_table(&path).is_err());
}

#[test]
fn test_value_formatting_differences_are_not_changes() {
    let fixture = TestFixture::new().unwrap();
    let mut tracker = DeltaTracker::new(MemorySnapshotStore::new());

    let first = load(&fixture, "v1.csv", "name,qty\nApple,3\n").unwrap();
    tracker.compute_diff(&first).unwrap();

    let second = load(&fixture, "v2.csv", "qty,name\n 3 ,  Apple\n").unwrap();
    assert!(!tracker.compute_diff(&second).unwrap().has_changes());
}

#[test]
fn test_key_with_blank_values_pairs_blanks_together() {
    let fixture = TestFixture::new().unwrap();
    let mut tracker = DeltaTracker::new(MemorySnapshotStore::new())
        .with_identity_key(IdentityKey::from_columns(["sku"]));

    let first = load(&fixture, "v1.csv", "sku,qty,note\n,1,x\nA,2,y\n").unwrap();
    tracker.compute_diff(&first).unwrap();

    let second = load(&fixture, "v2.csv", "sku,qty,note\n,5,x\nA,2,y\n").unwrap();
    let diff = tracker.compute_diff(&second).unwrap();
    assert_eq!(diff.updated_count(), 1);
    assert_eq!(diff.updated[0].after["qty"], Cell::Integer(5));
}

#[test]
fn test_missing_key_column_falls_back_to_add_delete() {
    let fixture = TestFixture::new().unwrap();
    let mut tracker = DeltaTracker::new(MemorySnapshotStore::new())
        .with_identity_key(IdentityKey::from_columns(["id"]));

    let first = load(&fixture, "v1.csv", "name,qty\nApple,3\n").unwrap();
    tracker.compute_diff(&first).unwrap();

    let second = load(&fixture, "v2.csv", "name,qty\nApple,4\n").unwrap();
    let diff = tracker.compute_diff(&second).unwrap();
    assert_eq!((diff.added_count(), diff.updated_count(), diff.deleted_count()), (1, 0, 1));
}
