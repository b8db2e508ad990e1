use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use taskwatch_core::classifier::extract_due_date;
use taskwatch_core::source::{FilteredSource, JsonFileSource, TaskSource};
use taskwatch_core::{credentials, Classification, Config, SourceKind, Task, UrgencyCategory};

use super::load_config;

#[derive(Serialize)]
struct CheckedTask {
    id: String,
    name: String,
    /// `overdue`, `urgent`, `current` or `excluded`.
    classification: String,
    due: Option<String>,
    status: Option<String>,
}

#[derive(Serialize, Default)]
struct Report {
    overdue: usize,
    urgent: usize,
    current: usize,
    excluded: usize,
    tasks: Vec<CheckedTask>,
}

pub fn run(
    config: Option<&Path>,
    tasks_file: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = load_config(config)?;
    let tasks = fetch(&cfg, tasks_file)?;
    let report = classify(&cfg, &tasks);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for task in &report.tasks {
        println!(
            "{:<9} {:<10} {:<10} {}",
            task.classification,
            task.id,
            task.due.as_deref().unwrap_or("-"),
            task.name
        );
    }
    println!(
        "overdue: {}, urgent: {}, current: {}, excluded: {}",
        report.overdue, report.urgent, report.current, report.excluded
    );
    Ok(())
}

fn fetch(cfg: &Config, tasks_file: Option<&Path>) -> Result<Vec<Task>, Box<dyn std::error::Error>> {
    let tasks = match tasks_file {
        Some(path) => {
            FilteredSource::new(JsonFileSource::new(path), cfg.role_filter()).fetch_tasks()?
        }
        None => {
            let token = match cfg.source.kind {
                SourceKind::Http => credentials::api_token()?,
                SourceKind::File => None,
            };
            cfg.task_source(token)?.fetch_tasks()?
        }
    };
    Ok(tasks)
}

fn classify(cfg: &Config, tasks: &[Task]) -> Report {
    let classifier = cfg.classifier();
    let today = cfg.zone().today(Utc::now());

    let mut report = Report::default();
    for task in tasks {
        let classification = classifier.classify(task, today);
        let label = match classification {
            Classification::Excluded => {
                report.excluded += 1;
                "excluded"
            }
            Classification::Category(category) => {
                match category {
                    UrgencyCategory::Overdue => report.overdue += 1,
                    UrgencyCategory::Urgent => report.urgent += 1,
                    UrgencyCategory::Current => report.current += 1,
                }
                category.as_str()
            }
        };
        report.tasks.push(CheckedTask {
            id: task.id.to_string(),
            name: task.name.clone(),
            classification: label.to_string(),
            due: extract_due_date(task).map(|d| d.format("%d.%m.%Y").to_string()),
            status: task.status.clone(),
        });
    }
    report
}
