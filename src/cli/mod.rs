//! CLI command handling
//!
//! Loads configuration, dispatches commands and formats `list` output.

use colored::Colorize;
use serde::Serialize;

use crate::commands::{Commands, GlobalArgs};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::testing::{plan, PfishExecutor, PlanEntry, RunOptions, Runner, Selection};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, args: &GlobalArgs) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    let options = RunOptions::from_config(&config)?;

    match command {
        Commands::Run => {
            let executor = PfishExecutor::from_config(&config.executor)?;
            let runner = Runner::new(executor, options);
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            runner.run(&mut out).await?;
            Ok(())
        }

        Commands::List { json } => {
            let entries = plan(&options)?;
            if json {
                let views: Vec<_> = entries.iter().map(EntryView::from).collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                print_plan(&entries);
            }

            let invalid = entries.iter().filter(|e| e.record.is_err()).count();
            if invalid > 0 {
                return Err(Error::RunFailed {
                    failed: invalid,
                    total: entries.len(),
                });
            }
            Ok(())
        }
    }
}

/// JSON shape of a `list` entry
#[derive(Serialize)]
struct EntryView<'a> {
    path: String,
    name: Option<&'a str>,
    category: Option<&'a str>,
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a> From<&'a PlanEntry> for EntryView<'a> {
    fn from(entry: &'a PlanEntry) -> Self {
        let record = entry.record.as_ref().ok();
        Self {
            path: entry.path.display().to_string(),
            name: record.map(|r| r.name.as_str()),
            category: record.map(|r| r.category.as_str()),
            action: action_label(entry.selection),
            error: entry.record.as_ref().err().map(|e| e.as_str()),
        }
    }
}

fn action_label(selection: Option<Selection>) -> &'static str {
    match selection {
        Some(Selection::Run) => "run",
        Some(Selection::NotATest) => "skip",
        Some(Selection::CategoryExcluded) => "excluded",
        None => "invalid",
    }
}

fn print_plan(entries: &[PlanEntry]) {
    if entries.is_empty() {
        println!("No definitions found");
        return;
    }

    for entry in entries {
        match &entry.record {
            Ok(record) => {
                let marker = match entry.selection {
                    Some(Selection::Run) => "run ".green().bold(),
                    Some(Selection::CategoryExcluded) => "excl".yellow(),
                    _ => "skip".dimmed(),
                };
                println!(
                    "{}  {} {}",
                    marker,
                    record.name.white().bold(),
                    format!("[{}]", record.category).dimmed()
                );
            }
            Err(e) => {
                println!(
                    "{}  {}",
                    "bad ".red().bold(),
                    entry.path.display().to_string().red()
                );
                println!("      {}", e.dimmed());
            }
        }
    }

    let runnable = entries
        .iter()
        .filter(|e| e.selection == Some(Selection::Run))
        .count();
    println!(
        "\n{} of {} definitions would run",
        runnable.to_string().bold(),
        entries.len()
    );
}
