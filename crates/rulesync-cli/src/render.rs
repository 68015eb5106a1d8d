//! Human-readable rendering of a sync report

use colored::Colorize;
use rulesync_core::scanner::SkipReason;
use rulesync_core::{ActionKind, SyncReport};

fn summary(report: &SyncReport) -> String {
    format!(
        "{} added, {} updated, {} deleted",
        report.added, report.updated, report.deleted
    )
}

/// Print `report` to stdout.
pub fn print_report(report: &SyncReport) {
    for outcome in &report.actions {
        let failed = report.failures.iter().any(|f| f.action == outcome.action);
        if failed {
            continue;
        }
        let marker = match outcome.action.kind {
            ActionKind::Add => "+".green(),
            ActionKind::Update => "~".yellow(),
            ActionKind::Delete => "-".red(),
        };
        println!("   {} {}", marker, outcome.message);
    }

    for failure in &report.failures {
        println!("   {} {}", "!".red(), failure.message);
    }

    if !report.conflicts.is_empty() {
        println!();
        println!("{} Left unresolved:", "CONFLICT".yellow().bold());
        for conflict in &report.conflicts {
            let holders: Vec<String> = conflict
                .groups
                .iter()
                .map(|g| g.projects.join(", "))
                .collect();
            println!(
                "   {} {} ({})",
                "?".yellow(),
                conflict.relative_path.cyan(),
                holders.join(" | ").dimmed()
            );
        }
    }

    if !report.orphaned.is_empty() {
        println!();
        println!("{} Allow-list entries with no file anywhere:", "ORPHANED".yellow().bold());
        for entry in &report.orphaned {
            println!("   {} {}: {}", "-".yellow(), entry.project, entry.relative_path.cyan());
        }
    }

    if !report.extraneous.is_empty() {
        println!();
        println!("{} Present but not allow-listed:", "EXTRANEOUS".yellow().bold());
        for file in &report.extraneous {
            println!("   {} {}: {}", "-".yellow(), file.project, file.relative_path.cyan());
        }
    }

    if !report.skipped_files.is_empty() {
        println!();
        println!("{} Matched but not synchronized:", "SKIPPED".dimmed().bold());
        for entry in &report.skipped_files {
            let reason = match &entry.file.reason {
                SkipReason::NotMarkdown => "not a .md file".to_string(),
                SkipReason::TooLarge { size, limit } => format!("{size} bytes, limit {limit}"),
            };
            println!(
                "   {} {}: {} ({})",
                "-".dimmed(),
                entry.project,
                entry.file.relative_path,
                reason.dimmed()
            );
        }
    }

    if !report.scan_failures.is_empty() {
        println!();
        println!("{} Could not be scanned:", "WARNING".yellow().bold());
        for failure in &report.scan_failures {
            println!("   {} {}: {}", "!".yellow(), failure.project, failure.message);
        }
    }

    println!();
    if !report.success {
        println!("{} Synchronization failed: {}", "ERROR".red().bold(), summary(report));
    } else if report.actions.is_empty() {
        println!("{} Already synchronized. No changes needed.", "OK".green().bold());
    } else if report.dry_run {
        println!("{} Would apply: {}", "DRY RUN".cyan().bold(), summary(report));
    } else {
        println!("{} Synchronization complete: {}", "OK".green().bold(), summary(report));
    }
}
