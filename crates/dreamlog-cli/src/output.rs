//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::{Context, Result};
use serde::Serialize;

use dreamlog_core::{
    DisplayPage, Dream, Goal, JournalStats, PageItem, PaginationMode, VoiceNote, ViewWindow,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn print_dream(&self, dream: &Dream) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", dream.id);
                println!("Title:    {}", dream.title);
                if let Some(date) = dream.dream_date {
                    println!("Night of: {}", date.format("%Y-%m-%d"));
                }
                if dream.is_lucid {
                    println!("Lucid:    yes");
                }
                if !dream.emotions.is_empty() {
                    println!("Emotions: {}", dream.emotions.join(", "));
                }
                if !dream.tags.is_empty() {
                    println!("Tags:     {}", dream.tags.join(", "));
                }
                println!("Created:  {}", dream.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:  {}", dream.updated_at.format("%Y-%m-%d %H:%M"));
                println!();
                println!("{}", dream.content);
            }
            OutputFormat::Json => print_json(dream)?,
            OutputFormat::Quiet => println!("{}", dream.id),
        }
        Ok(())
    }

    pub fn print_dreams(&self, page: &DisplayPage<Dream>) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if page.records.is_empty() {
                    println!("No dreams found.");
                    return Ok(());
                }
                for dream in &page.records {
                    let lucid = if dream.is_lucid { " *" } else { "" };
                    println!(
                        "{} | {} | {}{} | {}",
                        dream.id.short(),
                        dream.created_at.format("%Y-%m-%d"),
                        truncate(&dream.title, 30),
                        lucid,
                        truncate_line(&dream.content, 40)
                    );
                }
                print_window(&page.window, "dream");
            }
            OutputFormat::Json => print_json(page)?,
            OutputFormat::Quiet => {
                for dream in &page.records {
                    println!("{}", dream.id);
                }
            }
        }
        Ok(())
    }

    pub fn print_goal(&self, goal: &Goal) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", goal.id);
                println!("Title:       {}", goal.title);
                if !goal.description.is_empty() {
                    println!("Description: {}", goal.description);
                }
                println!("Type:        {}", goal.goal_type);
                println!("Target:      {}", goal.target);
                println!("Status:      {}", goal.status);
                println!("Created:     {}", goal.created_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => print_json(goal)?,
            OutputFormat::Quiet => println!("{}", goal.id),
        }
        Ok(())
    }

    pub fn print_goals(&self, page: &DisplayPage<Goal>) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if page.records.is_empty() {
                    println!("No goals found.");
                    return Ok(());
                }
                for goal in &page.records {
                    println!(
                        "{} | {:<9} | {} (target {})",
                        goal.id.short(),
                        goal.status.to_string(),
                        truncate(&goal.title, 40),
                        goal.target
                    );
                }
                print_window(&page.window, "goal");
            }
            OutputFormat::Json => print_json(page)?,
            OutputFormat::Quiet => {
                for goal in &page.records {
                    println!("{}", goal.id);
                }
            }
        }
        Ok(())
    }

    pub fn print_voice_note(&self, note: &VoiceNote) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", note.id);
                println!("Title:    {}", note.title);
                println!("Duration: {}", format_duration(note.duration_secs));
                println!("Type:     {} ({} bytes)", note.mime_type, note.size_bytes);
                println!("Created:  {}", note.created_at.format("%Y-%m-%d %H:%M"));
                if let Some(ref text) = note.transcription {
                    println!();
                    println!("{}", text);
                }
            }
            OutputFormat::Json => print_json(note)?,
            OutputFormat::Quiet => println!("{}", note.id),
        }
        Ok(())
    }

    pub fn print_voice_notes(&self, page: &DisplayPage<VoiceNote>) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if page.records.is_empty() {
                    println!("No voice notes found.");
                    return Ok(());
                }
                for note in &page.records {
                    println!(
                        "{} | {} | {:>6} | {}",
                        note.id.short(),
                        note.created_at.format("%Y-%m-%d"),
                        format_duration(note.duration_secs),
                        truncate(&note.title, 40)
                    );
                }
                print_window(&page.window, "voice note");
            }
            OutputFormat::Json => print_json(page)?,
            OutputFormat::Quiet => {
                for note in &page.records {
                    println!("{}", note.id);
                }
            }
        }
        Ok(())
    }

    pub fn print_stats(&self, stats: &JournalStats, data_dir: &std::path::Path) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("dreamlog Status");
                println!("===============");
                println!();
                println!("Storage:");
                println!("  Location:   {}", data_dir.display());
                println!(
                    "  Persistent: {}",
                    if stats.persistent { "yes" } else { "no (memory only)" }
                );
                println!();
                println!("Contents:");
                for collection in &stats.collections {
                    let tier = collection
                        .tier
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "  {:<12} {:>5}  (served by {})",
                        format!("{}s:", collection.kind),
                        collection.count,
                        tier
                    );
                }
            }
            OutputFormat::Json => print_json(stats)?,
            OutputFormat::Quiet => {
                for collection in &stats.collections {
                    println!("{}", collection.count);
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Footer under a listing: counts and the page bar
fn print_window(window: &ViewWindow, noun: &str) {
    println!();
    match window.mode {
        PaginationMode::Paged(_) => {
            println!(
                "Page {} of {} ({} {}(s))",
                window.current_page, window.total_pages, window.total, noun
            );
            if window.total_pages > 1 {
                println!("{}", page_bar(&window.page_numbers(), window.current_page));
            }
        }
        PaginationMode::ShowAll => println!("{} {}(s)", window.total, noun),
        PaginationMode::Endless => {
            println!(
                "Showing {} of {} {}(s)",
                window.range.end, window.total, noun
            );
            if window.has_more() {
                println!("Use --page to load more.");
            }
        }
    }
}

/// Render page numbers with the current page in brackets
fn page_bar(items: &[PageItem], current: usize) -> String {
    items
        .iter()
        .map(|item| match item {
            PageItem::Page(n) if *n == current => format!("[{}]", n),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_duration(secs: f64) -> String {
    let total = secs.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamlog_core::generate_page_numbers;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_page_bar() {
        assert_eq!(
            page_bar(&generate_page_numbers(5, 20), 5),
            "1 ... 4 [5] 6 ... 20"
        );
        assert_eq!(page_bar(&generate_page_numbers(1, 2), 1), "[1] 2");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(5.4), "0:05");
        assert_eq!(format_duration(125.0), "2:05");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
    }
}
