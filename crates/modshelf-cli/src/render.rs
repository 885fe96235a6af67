//! Plain-text rendering of analyses, results and progress.

use modshelf_core::{LegacyAnalysis, ProgressRecord, RunResult};
use std::fmt::Write;

pub fn progress(record: &ProgressRecord) -> String {
    if record.total > 0 {
        format!(
            "[{:>5.1}%] {} - {} ({}/{})",
            record.percent, record.stage, record.current_task, record.processed, record.total
        )
    } else {
        format!(
            "[{:>5.1}%] {} - {}",
            record.percent, record.stage, record.current_task
        )
    }
}

pub fn analysis(analysis: &LegacyAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Source:       {}", analysis.source.display());
    let _ = writeln!(
        out,
        "Valid:        {}",
        if analysis.is_valid { "yes" } else { "no" }
    );
    if analysis.is_valid {
        let _ = writeln!(out, "Environments: {}", analysis.environments.join(", "));
        let _ = writeln!(
            out,
            "Active:       {}",
            analysis.active_environment.as_deref().unwrap_or("-")
        );
        let _ = writeln!(
            out,
            "Mods:         {} ({})",
            analysis.mod_count, analysis.total_archive_size_formatted
        );
        let _ = writeln!(
            out,
            "Previews:     {} ({})",
            analysis.preview_count, analysis.total_preview_size_formatted
        );
        let _ = writeln!(out, "Cache:        {}", analysis.cache_size_formatted);
        let _ = writeln!(
            out,
            "Settings:     {}",
            if analysis.configuration.is_some() { "found" } else { "none" }
        );
    }
    list(&mut out, "Errors", &analysis.errors);
    list(&mut out, "Warnings", &analysis.warnings);
    out
}

pub fn result(result: &RunResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Migration {} ({} ms)",
        if result.success { "succeeded" } else { "failed" },
        result.duration_ms
    );
    let _ = writeln!(out, "  Mods migrated:           {}", result.mods_migrated);
    let _ = writeln!(out, "  Archives copied:         {}", result.archives_copied);
    let _ = writeln!(out, "  Previews copied:         {}", result.previews_copied);
    let _ = writeln!(
        out,
        "  Classification entries:  {}",
        result.classification_entries_created
    );
    let _ = writeln!(out, "  Thumbnails attached:     {}", result.thumbnails_attached);
    if !result.skipped_steps.is_empty() {
        let skipped: Vec<String> = result.skipped_steps.iter().map(|s| s.to_string()).collect();
        let _ = writeln!(out, "  Skipped: {}", skipped.join(", "));
    }
    if let Some(path) = &result.log_path {
        let _ = writeln!(out, "  Log: {}", path.display());
    }
    list(&mut out, "Errors", &result.errors);
    list(&mut out, "Warnings", &result.warnings);
    out
}

fn list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{} ({}):", title, items.len());
    for item in items {
        let _ = writeln!(out, "  - {}", item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modshelf_core::{RunState, StepKind};

    #[test]
    fn test_progress_line() {
        let record = ProgressRecord {
            stage: RunState::Running(StepKind::Archives),
            current_task: "Ember".into(),
            processed: 1,
            total: 2,
            percent: 55.0,
        };
        assert_eq!(
            progress(&record),
            "[ 55.0%] step 5 (Migrate mod archives) - Ember (1/2)"
        );
    }

    #[test]
    fn test_result_lists_errors() {
        let mut run = RunResult::new(chrono::Utc::now());
        run.errors.push("Invalid legacy installation".into());
        let text = result(&run);
        assert!(text.starts_with("Migration failed"));
        assert!(text.contains("Errors (1):\n  - Invalid legacy installation"));
    }
}
