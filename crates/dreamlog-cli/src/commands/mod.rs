//! Command handlers

pub mod config;
pub mod dream;
pub mod goal;
pub mod status;
pub mod voice;

use anyhow::{bail, Context, Result};
use clap::Args;

use dreamlog_core::{
    DeleteState, Journal, JournalError, PaginationMode, PendingDelete, Record, RecordId, RecordKind,
};

use crate::editor::confirm;
use crate::output::Output;

/// Paging and filter flags shared by every `list` command
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Page to show (in endless mode: how many increments to load)
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,

    /// Records per page, "all" or "endless"
    #[arg(short, long)]
    pub limit: Option<PaginationMode>,

    /// Only records with this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Only records containing this text
    #[arg(short, long)]
    pub search: Option<String>,
}

impl ListArgs {
    /// Key identifying the filter criteria
    pub fn criteria_key(&self) -> String {
        format!(
            "tag={};search={}",
            self.tag.as_deref().unwrap_or(""),
            self.search.as_deref().unwrap_or("")
        )
    }

    /// Lower-cased search text, if any
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }
}

/// Prepare `kind`'s view for a listing
///
/// `render` is called once to learn the size of the filtered collection,
/// then again after moving to the requested page.
pub async fn paginate<T, F, Fut>(journal: &Journal, kind: RecordKind, args: &ListArgs, render: F) -> T
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = T>,
{
    if let Some(mode) = args.limit {
        journal.set_pagination_mode(kind, mode);
    }

    let first = render().await;
    if args.page <= 1 {
        return first;
    }

    match journal.view_state(kind).mode() {
        PaginationMode::Endless => {
            for _ in 1..args.page {
                if !journal.load_more(kind) {
                    break;
                }
            }
        }
        _ => {
            journal.go_to_page(kind, args.page);
        }
    }
    render().await
}

/// Resolve a full id or a unique id prefix against loaded records
pub fn resolve_id<R: Record>(input: &str, records: &[R], describe: impl Fn(&R) -> String) -> Result<RecordId> {
    if let Ok(id) = RecordId::parse(input) {
        return Ok(id);
    }

    let prefix = input.trim().to_lowercase();
    if prefix.is_empty() {
        bail!("No {} id given", R::KIND);
    }

    let matches: Vec<&R> = records
        .iter()
        .filter(|r| r.id().to_string().starts_with(&prefix))
        .collect();

    match matches.len() {
        0 => bail!("No {} found matching: {}", R::KIND, input),
        1 => Ok(matches[0].id()),
        _ => {
            eprintln!("Multiple {}s match '{}':", R::KIND, input);
            for record in &matches {
                eprintln!("  {} - {}", record.id(), describe(record));
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Confirm an armed delete, or let it go
///
/// Prompts in human mode unless `yes` is set. The prompt runs off the
/// runtime thread so the delete countdown keeps running while it waits.
pub async fn finish_delete(
    journal: &Journal,
    pending: PendingDelete,
    label: &str,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let id = pending.id;

    if !yes && output.should_prompt() {
        let question = format!(
            "Delete {} {} - {}? (expires in {}s)",
            pending.kind,
            id.short(),
            label,
            journal.config().delete_timeout_secs
        );
        let confirmed = tokio::task::spawn_blocking(move || confirm(&question))
            .await
            .context("Confirmation prompt failed")??;

        if !confirmed {
            journal.cancel_delete(id);
            output.message("Cancelled.");
            return Ok(());
        }
    }

    match journal.confirm_delete(id).await {
        Ok(true) => {
            output.success(&format!("Deleted {}: {}", pending.kind, id));
            Ok(())
        }
        Ok(false) => {
            output.message(&format!("{} {} was already gone.", pending.kind, id.short()));
            Ok(())
        }
        Err(JournalError::DeleteNotPending(_)) if journal.delete_state(id) == DeleteState::Cancelled => {
            bail!("Delete request expired; nothing was deleted.")
        }
        Err(e) => Err(e).with_context(|| format!("Failed to delete {}", pending.kind)),
    }
}
