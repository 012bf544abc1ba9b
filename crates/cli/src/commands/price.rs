use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use estimator_core::config::{AppConfig, LoadOptions};
use estimator_core::page::{InMemoryPage, PageSnapshot};
use estimator_core::session::{EstimateSession, RecomputeReport, RecomputeStatus};
use serde_json::json;

use crate::commands::CommandResult;

const COMMAND: &str = "price";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    Both,
}

pub fn run(
    options: &LoadOptions,
    snapshot_path: &Path,
    format: OutputFormat,
    guests: Option<u32>,
) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2),
    };

    let mut snapshot = match load_snapshot(snapshot_path) {
        Ok(snapshot) => snapshot,
        Err(error) => return CommandResult::failure(COMMAND, "input", format!("{error:#}"), 2),
    };
    if let Some(guests) = guests {
        snapshot.guest_input = Some(guests.to_string());
    }

    let mut session = EstimateSession::new(InMemoryPage::new(snapshot), config.pricing);
    let report = match recompute_with_retry(&mut session) {
        Some(report) => report,
        None => {
            return CommandResult::failure(
                COMMAND,
                "internal",
                "recompute did not complete after its scheduled retry",
                1,
            )
        }
    };

    let estimate = &report.estimate;
    match format {
        OutputFormat::Text => CommandResult::raw(estimate.text.clone()),
        OutputFormat::Json | OutputFormat::Both => {
            let data = json!({
                "guests": report.guest_count,
                "total": estimate.total_display,
                "estimate": estimate.document,
                "trace": report.pricing.steps,
                "gating_actions": report.actions.len(),
            });
            let result = CommandResult::success_with_data(
                COMMAND,
                format!("estimate total {}", estimate.total_display),
                Some(data),
            );
            if format == OutputFormat::Both {
                CommandResult::raw(format!("{}\n\n{}", estimate.text, result.output))
            } else {
                result
            }
        }
    }
}

fn load_snapshot(path: &Path) -> Result<PageSnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read page snapshot `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("page snapshot `{}` is not valid JSON", path.display()))
}

// The CLI stands in for the page's event loop, so it honours the one scheduled retry itself.
fn recompute_with_retry(session: &mut EstimateSession<InMemoryPage>) -> Option<RecomputeReport> {
    for _ in 0..2 {
        if let RecomputeStatus::Completed(report) = session.recompute() {
            return Some(*report);
        }
    }
    None
}
