//! Integration tests for the init command

use crate::common::{assertions, CliTestRunner, TestFixture};
use sheetsync::config::Settings;

#[test]
fn test_init_command_success() {
    let runner = CliTestRunner::new().unwrap();

    runner.expect_success(&["init"]);

    let fixture = runner.fixture();
    assertions::assert_dir_exists(&fixture.workspace.sheetsync_dir);

    let config_path = fixture.workspace.config_path();
    assertions::assert_file_exists_and_not_empty(&config_path);
    assertions::assert_json_contains_keys(
        &config_path,
        &["version", "created", "sheets", "webhook", "watcher", "delta"],
    )
    .unwrap();

    let gitignore_path = fixture.workspace.root.join(".gitignore");
    assertions::assert_file_exists_and_not_empty(&gitignore_path);
}

#[test]
fn test_init_command_already_exists() {
    let runner = CliTestRunner::new().unwrap();

    runner.expect_success(&["init"]);
    // Second init without force keeps the existing config
    runner
        .fixture()
        .update_settings(|s| s.delta.stream = "kept".to_string())
        .unwrap();
    runner.expect_success(&["init"]);

    let settings = Settings::load(&runner.fixture().workspace.config_path()).unwrap();
    assert_eq!(settings.delta.stream, "kept");
}

#[test]
fn test_init_command_with_force() {
    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["init"]);

    let config_path = runner.fixture().workspace.config_path();
    std::fs::write(&config_path, r#"{"modified": true}"#).unwrap();

    runner.expect_success(&["init", "--force"]);

    assertions::assert_json_contains_keys(&config_path, &["version", "created", "delta"]).unwrap();
    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(!content.contains("modified"));
}

#[test]
fn test_init_preserves_existing_gitignore() {
    let fixture = TestFixture::new_empty().unwrap();
    let gitignore_path = fixture.root().join(".gitignore");
    std::fs::write(&gitignore_path, "# Existing content\n*.log\n").unwrap();

    let root = fixture.root().to_str().unwrap();
    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["init", "--workspace", root]);

    let content = std::fs::read_to_string(&gitignore_path).unwrap();
    assert!(content.contains("# Existing content"));
    assert!(content.contains("*.log"));
    assert!(content.contains(".sheetsync/delta.duckdb"));
}

#[test]
fn test_init_with_explicit_workspace() {
    let fixture = TestFixture::new_empty().unwrap();
    let target = fixture.root().join("project");
    std::fs::create_dir_all(&target).unwrap();

    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["init", "--workspace", target.to_str().unwrap()]);

    assertions::assert_dir_exists(&target.join(".sheetsync"));
    assertions::assert_file_exists_and_not_empty(&target.join(".sheetsync").join("config.json"));
}

#[test]
fn test_init_with_verbose_flag() {
    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["init", "-v"]);
}
