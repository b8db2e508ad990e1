//! Task source integration tests: JSON file on disk and HTTP endpoint.

use std::io::Write;

use taskwatch_core::source::{
    check_connection, FilteredSource, HttpTaskSource, JsonFileSource, RoleFilter, TaskSource,
};
use taskwatch_core::{Config, CoreError, Role, SourceError};

const TASKS_JSON: &str = r#"[
    {
        "id": 812,
        "name": "Approve budget",
        "status": "In Progress",
        "endDateTime": {"date": "14-10-2026"},
        "assignees": [{"id": 7, "name": "Anna"}]
    },
    {
        "id": "813",
        "name": "Review draft",
        "reviewers": [{"id": "7"}],
        "requesters": [{"id": 3, "name": "Boris"}]
    },
    {
        "id": 814,
        "name": "Someone else's",
        "assignees": [{"id": 9}]
    }
]"#;

fn write_tasks(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn file_source_reads_task_dump() {
    let file = write_tasks(TASKS_JSON);
    let tasks = JsonFileSource::new(file.path()).fetch_tasks().unwrap();

    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].id.as_str(), "812");
    assert_eq!(
        tasks[0].due.as_ref().and_then(|d| d.date.as_deref()),
        Some("14-10-2026")
    );
    assert!(tasks[1].involves("7", Role::Reviewer));
}

#[test]
fn file_source_is_reread_on_every_fetch() {
    let file = write_tasks("[]");
    let source = JsonFileSource::new(file.path());
    assert!(source.fetch_tasks().unwrap().is_empty());

    std::fs::write(file.path(), TASKS_JSON).unwrap();
    assert_eq!(source.fetch_tasks().unwrap().len(), 3);
}

#[test]
fn filtered_file_source_keeps_the_users_roles() {
    let file = write_tasks(TASKS_JSON);
    let assignee_only = FilteredSource::new(
        JsonFileSource::new(file.path()),
        RoleFilter::for_user("7", [Role::Assignee]),
    );
    let every_role = FilteredSource::new(
        JsonFileSource::new(file.path()),
        RoleFilter::for_user("7", Role::ALL),
    );

    let ids = |tasks: Vec<taskwatch_core::Task>| {
        tasks.into_iter().map(|t| t.id.to_string()).collect::<Vec<_>>()
    };
    assert_eq!(ids(assignee_only.fetch_tasks().unwrap()), ["812"]);
    assert_eq!(ids(every_role.fetch_tasks().unwrap()), ["812", "813"]);
}

#[test]
fn config_builds_file_source_with_role_filter() {
    let file = write_tasks(TASKS_JSON);
    let mut config = Config::default();
    config
        .set("source.tasks_file", &file.path().display().to_string())
        .unwrap();
    config.set("source.user_id", "7").unwrap();
    config.set("source.include_reviewer", "false").unwrap();

    let tasks = config.task_source(None).unwrap().fetch_tasks().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "Approve budget");
}

#[test]
fn http_source_sends_bearer_token_and_decodes_wrapped_list() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/tasks")
        .match_header("authorization", "Bearer secret-token")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"tasks": {TASKS_JSON}}}"#))
        .create();

    let source = HttpTaskSource::new(
        &format!("{}/api/tasks", server.url()),
        Some("secret-token".into()),
    )
    .unwrap();
    let tasks = source.fetch_tasks().unwrap();

    mock.assert();
    assert_eq!(tasks.len(), 3);
}

#[test]
fn http_source_maps_error_status() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/tasks")
        .with_status(401)
        .with_body("invalid token")
        .create();

    let source = HttpTaskSource::new(&format!("{}/api/tasks", server.url()), None).unwrap();
    match source.fetch_tasks() {
        Err(SourceError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid token");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    mock.assert();
}

#[test]
fn http_source_rejects_non_json_body() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/api/tasks")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create();

    let source = HttpTaskSource::new(&format!("{}/api/tasks", server.url()), None).unwrap();
    assert!(matches!(source.fetch_tasks(), Err(SourceError::Decode(_))));
}

#[test]
fn config_http_source_requires_endpoint() {
    let mut config = Config::default();
    config.set("source.kind", "http").unwrap();

    assert!(matches!(
        config.task_source(None),
        Err(CoreError::Source(SourceError::MissingEndpoint))
    ));
}

#[test]
fn connection_check_counts_fetched_tasks() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/tasks")
        .match_header("authorization", "Bearer secret-token")
        .with_status(200)
        .with_body(TASKS_JSON)
        .create();

    let source = HttpTaskSource::new(
        &format!("{}/api/tasks", server.url()),
        Some("secret-token".into()),
    )
    .unwrap();
    assert_eq!(check_connection(&source).unwrap(), 3);
    mock.assert();
}

#[test]
fn connection_check_reports_rejected_token() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/api/tasks")
        .with_status(403)
        .with_body("forbidden")
        .create();

    let source = HttpTaskSource::new(&format!("{}/api/tasks", server.url()), Some("stale".into()))
        .unwrap();
    assert!(matches!(
        check_connection(&source),
        Err(SourceError::Status { status: 403, .. })
    ));
}
