//! Run report rendering: a rounded table for people, JSON for scripts.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use avasync_core::PlatformKind;
use avasync_sync::{SyncReport, UserOutcome, UserReport};

#[derive(Serialize)]
struct ReportJson<'a> {
    destination: PlatformKind,
    dry_run: bool,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    summary: SummaryJson,
    users: &'a [UserReport],
}

#[derive(Serialize)]
struct SummaryJson {
    users: usize,
    pushed: usize,
    skipped: usize,
    failed: usize,
}

#[derive(Tabled)]
struct ReportTableRow {
    #[tabled(rename = "user")]
    user: String,
    #[tabled(rename = "outcome")]
    outcome: String,
    #[tabled(rename = "detail")]
    detail: String,
}

pub fn print_json(destination: PlatformKind, report: &SyncReport, dry_run: bool) -> Result<()> {
    let payload = ReportJson {
        destination,
        dry_run,
        started_at: report.started_at,
        finished_at: report.finished_at,
        summary: SummaryJson {
            users: report.users.len(),
            pushed: report.pushed_count(),
            skipped: report.skipped_count(),
            failed: report.error_count(),
        },
        users: &report.users,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize report JSON")?
    );
    Ok(())
}

pub fn print_report(destination: PlatformKind, report: &SyncReport, dry_run: bool) {
    if report.users.is_empty() {
        println!("No users to sync.");
    } else {
        let rows: Vec<ReportTableRow> = report
            .users
            .iter()
            .map(|entry| ReportTableRow {
                user: entry.user.to_string(),
                outcome: outcome_indicator(&entry.outcome),
                detail: outcome_detail(&entry.outcome),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    let pushed_label = if dry_run { "would push" } else { "pushed" };
    let failed = report.error_count();
    let failed_text = format!("{failed} failed");
    println!(
        "{} {}: {} {pushed_label}, {} skipped, {} in {}",
        if failed == 0 { "✓".green() } else { "✗".red() },
        destination,
        report.pushed_count(),
        report.skipped_count(),
        if failed == 0 {
            failed_text.normal()
        } else {
            failed_text.red().bold()
        },
        format_elapsed(report.duration()),
    );
}

fn outcome_indicator(outcome: &UserOutcome) -> String {
    let label = outcome.label();
    match outcome {
        UserOutcome::Pushed | UserOutcome::WouldPush => label.green().to_string(),
        UserOutcome::UpToDate => label.normal().to_string(),
        UserOutcome::SkippedDefault | UserOutcome::SkippedUnsupportedType { .. } => {
            label.yellow().to_string()
        }
        UserOutcome::Failed { .. } => label.red().bold().to_string(),
    }
}

fn outcome_detail(outcome: &UserOutcome) -> String {
    match outcome {
        UserOutcome::Pushed => "avatar uploaded".to_string(),
        UserOutcome::WouldPush => "dry run".to_string(),
        UserOutcome::SkippedDefault => "no avatar uploaded to jira".to_string(),
        UserOutcome::SkippedUnsupportedType { content_type } => content_type.clone(),
        UserOutcome::UpToDate => "destination unchanged".to_string(),
        UserOutcome::Failed { stage, message } => format!("{stage}: {message}"),
    }
}

fn format_elapsed(elapsed: chrono::Duration) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    if millis < 1_000 {
        format!("{millis}ms")
    } else {
        format!("{:.1}s", millis as f64 / 1_000.0)
    }
}
