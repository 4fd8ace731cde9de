//! Task catalog loading and command-running tasks.

mod common;

use common::RecordingNotifier;
use std::sync::Arc;
use taskbot::catalog::TaskCatalog;
use taskbot::error::Error;
use taskbot::model::Priority;
use taskbot::notifier::{Notifications, Notifier, Status};

const CATALOG: &str = r#"
[[task]]
name = "backup"
schedule = "0 3 * * *"
priority = "high"
command = "/usr/local/bin/backup"
args = ["--incremental"]

[[task]]
name = "weather"
schedule = "*/30 * * * *"
command = "scripts/weather.sh"

[[task]]
name = "cleanup"
schedule = "@daily"
priority = "someday"
command = "/bin/true"
"#;

#[test]
fn parses_task_definitions() {
    let catalog = TaskCatalog::parse(CATALOG).unwrap();
    assert_eq!(catalog.len(), 3);

    let tasks = catalog.tasks();
    assert_eq!(tasks[0].name, "backup");
    assert_eq!(tasks[0].priority, Priority::High);
    assert_eq!(tasks[0].args, ["--incremental"]);
    assert_eq!(tasks[1].priority, Priority::Normal);
    assert!(tasks[1].args.is_empty());
    // Unknown priorities fall back to normal instead of failing the load.
    assert_eq!(tasks[2].priority, Priority::Normal);
}

#[test]
fn empty_file_has_no_tasks() {
    let catalog = TaskCatalog::parse("").unwrap();
    assert!(catalog.is_empty());
}

#[test]
fn missing_required_field_is_config_error() {
    let result = TaskCatalog::parse(
        r#"
[[task]]
name = "no-command"
schedule = "* * * * *"
"#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn blank_task_name_is_config_error() {
    let result = TaskCatalog::parse(
        r#"
[[task]]
name = " "
schedule = "* * * * *"
command = "/bin/true"
"#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn load_reads_file_from_disk() {
    let path = std::env::temp_dir().join(format!("taskbot-catalog-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, CATALOG).unwrap();

    let catalog = TaskCatalog::load(&path).unwrap();
    assert_eq!(catalog.len(), 3);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn load_missing_file_names_the_path() {
    let path = std::env::temp_dir().join("taskbot-does-not-exist.toml");
    match TaskCatalog::load(&path) {
        Err(Error::Config(msg)) => assert!(msg.contains("taskbot-does-not-exist.toml")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_command_reports_through_notifications() {
    let sink = RecordingNotifier::new();
    let notifications = Notifications::new(
        "wheatley",
        vec![sink.clone() as Arc<dyn Notifier>],
        Status::Warn,
    );

    let catalog = TaskCatalog::parse(
        r#"
[[task]]
name = "missing"
schedule = "* * * * *"
command = "/nonexistent/taskbot-test-command"
"#,
    )
    .unwrap();
    let def = catalog.into_iter().next().unwrap();
    let task = def.into_task(notifications);

    tokio::task::spawn_blocking(move || task.run())
        .await
        .unwrap();

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].status, Status::Error);
    assert_eq!(sent[0].title, "💥 Task failed");
    assert!(sent[0].body.contains("'missing' failed"));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn successful_command_sends_nothing() {
    let sink = RecordingNotifier::new();
    let notifications = Notifications::new(
        "wheatley",
        vec![sink.clone() as Arc<dyn Notifier>],
        Status::Debug,
    );

    let catalog = TaskCatalog::parse(
        r#"
[[task]]
name = "noop"
schedule = "* * * * *"
command = "/bin/sh"
args = ["-c", "exit 0"]
"#,
    )
    .unwrap();
    let task = catalog.into_iter().next().unwrap().into_task(notifications);

    tokio::task::spawn_blocking(move || task.run())
        .await
        .unwrap();

    assert!(sink.sent().is_empty());
}
