//! Sheet writer and webhook notifier against a loopback server

use crate::common::fake_http::FakeServer;
use crate::common::{sample_data, CliTestRunner};
use sheetsync::notifier::{Notifier, WebhookNotifier};
use sheetsync::sheets::{GoogleSheetsWriter, SheetWriter};
use sheetsync::table::row;
use sheetsync::{Cell, DiffSummary, SheetSyncError, SnapshotStore, Table};

const METADATA: &str = r#"{"sheets":[{"properties":{"sheetId":0,"title":"Other"}},{"properties":{"sheetId":42,"title":"Data"}}]}"#;

fn people() -> Table {
    Table::from_rows(vec![
        row([("Name", Cell::from("John")), ("Age", Cell::from(30))]),
        row([("Name", Cell::from("Jane")), ("Age", Cell::Empty)]),
    ])
    .unwrap()
}

#[test]
fn test_sheet_writer_replaces_worksheet() {
    let server = FakeServer::start(vec![
        (200, METADATA.to_string()),
        (200, "{}".to_string()),
        (200, "{}".to_string()),
    ]);
    let writer = GoogleSheetsWriter::new("sheet-abc", "Data", "tok")
        .unwrap()
        .with_api_base(&server.url("/"));

    let url = writer.push_table(&people()).unwrap();
    assert_eq!(url, "https://docs.google.com/spreadsheets/d/sheet-abc/edit#gid=42");

    let requests = server.finish();
    assert_eq!(requests.len(), 3);

    assert_eq!(requests[0].method, "GET");
    assert!(requests[0].path.starts_with("/spreadsheets/sheet-abc?"));
    assert_eq!(requests[0].header("authorization"), Some("Bearer tok"));

    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].path, "/spreadsheets/sheet-abc/values/%27Data%27:clear");

    assert_eq!(requests[2].method, "PUT");
    assert_eq!(
        requests[2].path,
        "/spreadsheets/sheet-abc/values/%27Data%27?valueInputOption=RAW"
    );
    let body = requests[2].json();
    assert_eq!(
        body["values"],
        serde_json::json!([["Name", "Age"], ["John", 30], ["Jane", ""]])
    );
}

#[test]
fn test_sheet_writer_unknown_worksheet() {
    let server = FakeServer::start(vec![(200, r#"{"sheets":[]}"#.to_string())]);
    let writer = GoogleSheetsWriter::new("sheet-abc", "Data", "tok")
        .unwrap()
        .with_api_base(&server.url(""));

    let error = writer.push_table(&people()).unwrap_err();
    assert!(matches!(error, SheetSyncError::SheetsPush { .. }));
    assert!(error.to_string().contains("Worksheet 'Data' not found"));
    assert_eq!(server.finish().len(), 1);
}

#[test]
fn test_sheet_writer_http_error() {
    let server = FakeServer::start(vec![(403, r#"{"error":"denied"}"#.to_string())]);
    let writer = GoogleSheetsWriter::new("sheet-abc", "Data", "bad-token")
        .unwrap()
        .with_api_base(&server.url(""));

    let error = writer.push_table(&people()).unwrap_err();
    assert!(matches!(error, SheetSyncError::SheetsPush { .. }));
    assert!(error.to_string().contains("403"));
    server.finish();
}

#[test]
fn test_webhook_delivered() {
    let server = FakeServer::start(vec![(200, "ok".to_string())]);
    let notifier = WebhookNotifier::new(server.url("/hook")).unwrap();

    let summary = DiffSummary {
        added: 2,
        updated: 1,
        deleted: 0,
    };
    assert!(notifier.post_summary(&summary, "https://example.com/sheet").unwrap());

    let requests = server.finish();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/hook");

    let body = requests[0].json();
    assert_eq!(body["channel"], "#general");
    assert_eq!(body["username"], "Sheets-Bot");
    let text = body["attachments"][0]["text"].as_str().unwrap();
    assert!(text.contains(&summary.to_string()));
    assert!(text.contains("https://example.com/sheet"));
}

#[test]
fn test_webhook_rejected_is_not_an_error() {
    let server = FakeServer::start(vec![(500, "boom".to_string())]);
    let notifier = WebhookNotifier::new(server.url("/hook")).unwrap();

    let delivered = notifier
        .post_summary(&DiffSummary::default(), "https://example.com/sheet")
        .unwrap();
    assert!(!delivered);
    server.finish();
}

#[test]
fn test_cli_sync_pushes_and_notifies() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let csv = fixture
        .create_csv("people.csv", &sample_data::people_csv_data())
        .unwrap();

    let server = FakeServer::start(vec![
        (200, METADATA.to_string()),
        (200, "{}".to_string()),
        (200, "{}".to_string()),
        (200, "ok".to_string()),
    ]);
    let api_base = server.url("");
    let hook = server.url("/hook");
    fixture
        .update_settings(|s| {
            s.sheets.spreadsheet_id = Some("sheet-abc".to_string());
            s.sheets.worksheet_name = Some("Data".to_string());
            s.sheets.access_token = Some("tok".to_string());
            s.sheets.api_base = api_base;
            s.webhook.url = Some(hook);
        })
        .unwrap();

    runner.expect_success(&["sync", csv.to_str().unwrap()]);

    let requests = server.finish();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[2].json()["values"][0], serde_json::json!(["Name", "Age", "City"]));

    let text = requests[3].json()["attachments"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(text.contains("+2 / 0 / 0"));
    assert!(text.contains("edit#gid=42"));

    assert_eq!(fixture.open_store().unwrap().load("default").unwrap().len(), 2);
}
