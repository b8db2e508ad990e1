//! `taskwatch watch`: the polling loop with a console notification surface.
//!
//! Notices are printed to stdout. Answers are read from stdin, one per line:
//! `snooze <id>`, `later <id>`, `done <id>`, `close <id>`, or `quit`.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use taskwatch_core::{
    credentials, ActionEvent, ActionSender, Config, DriverSettings, LifecycleController,
    NoticeContent, NotificationSurface, PollDriver, SourceKind, SuppressionStore, UserAction,
    WindowLimiter,
};

use super::load_config;

/// Prints each notice as a block of text.
struct ConsoleSurface;

impl NotificationSurface for ConsoleSurface {
    fn present(&self, content: &NoticeContent, _actions: ActionSender) {
        let actions: Vec<&str> = content.actions.iter().map(|a| a.as_str()).collect();
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "[{}] {}", content.task_id, content.title);
        for line in content.body.lines() {
            let _ = writeln!(out, "    {line}");
        }
        if let Some(link) = &content.link {
            let _ = writeln!(out, "    {link}");
        }
        let _ = writeln!(out, "    reply: {} {}", actions.join("|"), content.task_id);
        let _ = out.flush();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Resolve(ActionEvent),
    Quit,
    Blank,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Input::Blank);
    };
    if matches!(verb, "quit" | "exit") {
        return Ok(Input::Quit);
    }

    let action: UserAction = verb.parse()?;
    let task_id = words
        .next()
        .ok_or_else(|| format!("usage: {verb} <task-id>"))?;
    if words.next().is_some() {
        return Err(format!("usage: {verb} <task-id>"));
    }
    Ok(Input::Resolve(ActionEvent::new(task_id, action)))
}

/// Forward stdin answers until EOF or `quit`.
async fn read_actions(actions: ActionSender) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Ok(Input::Resolve(event)) => {
                if actions.send(event).is_err() {
                    break;
                }
            }
            Ok(Input::Quit) => break,
            Ok(Input::Blank) => {}
            Err(msg) => eprintln!("{msg}"),
        }
    }
    Ok(())
}

fn build_driver(cfg: &Config) -> Result<PollDriver, Box<dyn std::error::Error>> {
    let token = match cfg.source.kind {
        SourceKind::Http => credentials::api_token()?,
        SourceKind::File => None,
    };
    let source = cfg.task_source(token)?;

    let controller = LifecycleController::new(
        Arc::new(SuppressionStore::new(cfg.reshow_policy())),
        Arc::new(WindowLimiter::new(cfg.window_caps())),
        cfg.classifier(),
    )
    .with_toggles(cfg.toggles())
    .with_zone(cfg.zone());

    Ok(PollDriver::new(Arc::new(controller), source, Arc::new(ConsoleSurface))
        .with_notice_options(cfg.notice_options())
        .with_settings(DriverSettings {
            poll_interval: cfg.poll_interval(),
            retry_delay: cfg.retry_delay(),
            sweep_every: cfg.polling.sweep_every,
        }))
}

pub fn run(config: Option<&Path>, once: bool) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = load_config(config)?;
    let driver = build_driver(&cfg)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result: Result<(), Box<dyn std::error::Error>> = runtime.block_on(async move {
        if once {
            let stats = driver.run_cycle().await?;
            println!("shown: {}", stats.shown);
            return Ok(());
        }

        let actions = driver.action_sender();
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(driver.run(stop_rx));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            res = read_actions(actions) => res?,
        }

        let _ = stop_tx.send(true);
        handle.await?;
        Ok(())
    });

    // A pending stdin read would otherwise keep the runtime alive.
    runtime.shutdown_background();
    result
}
