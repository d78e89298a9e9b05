//! Dream command handlers

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use dreamlog_core::{Dream, DreamDraft, Journal, RecordKind, ViewQuery};

use super::{finish_delete, paginate, resolve_id, ListArgs};
use crate::editor::{edit_text, prompt_with_default};
use crate::output::Output;

/// Fields for a new dream, as given on the command line
pub struct NewDream {
    pub content: Option<String>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub emotions: Vec<String>,
    pub lucid: bool,
    pub date: Option<NaiveDate>,
}

/// Record a new dream
pub async fn add(journal: &Journal, new: NewDream, output: &Output) -> Result<()> {
    let content = match new.content {
        Some(c) => c,
        None => edit_text("")?,
    };
    if content.trim().is_empty() {
        bail!("Dream content is empty, nothing saved.");
    }

    let mut draft = DreamDraft::new(content)
        .with_tags(new.tags)
        .lucid(new.lucid);
    draft.title = new.title;
    draft.emotions = new.emotions;
    draft.dream_date = new.date;

    let dream = journal
        .save_dream(draft)
        .await
        .context("Failed to save dream")?;

    output.success(&format!("Recorded dream: {}", dream.id));
    output.print_dream(&dream)?;
    Ok(())
}

fn query(args: &ListArgs) -> ViewQuery<Dream> {
    let tag = args.tag.as_deref().map(str::to_lowercase);
    let needle = args.needle();

    ViewQuery::new(args.criteria_key()).filter(move |dream: &Dream| {
        let tagged = tag.as_ref().map_or(true, |t| dream.tags.contains(t));
        let found = needle.as_ref().map_or(true, |n| {
            dream.title.to_lowercase().contains(n) || dream.content.to_lowercase().contains(n)
        });
        tagged && found
    })
}

/// List dreams, newest first
pub async fn list(journal: &Journal, args: ListArgs, output: &Output) -> Result<()> {
    let query = query(&args);
    let page = paginate(journal, RecordKind::Dream, &args, || journal.display_dreams(&query)).await;
    output.print_dreams(&page)
}

async fn find(journal: &Journal, id: &str) -> Result<Dream> {
    let dreams = journal.load_dreams().await;
    let id = resolve_id(id, &dreams, |d| d.title.clone())?;

    journal
        .get_dream(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Dream not found: {}", id))
}

/// Show a single dream
pub async fn show(journal: &Journal, id: String, output: &Output) -> Result<()> {
    let dream = find(journal, &id).await?;
    output.print_dream(&dream)
}

/// Changes requested by `dream edit`
#[derive(Default)]
pub struct DreamEdits {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub lucid: Option<bool>,
}

impl DreamEdits {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none() && self.lucid.is_none()
    }
}

/// Edit a dream
///
/// With no flags, prompts for the title and opens the content in the
/// editor.
pub async fn edit(journal: &Journal, id: String, edits: DreamEdits, output: &Output) -> Result<()> {
    let mut dream = find(journal, &id).await?;

    if edits.is_empty() {
        if !output.should_prompt() {
            bail!("Nothing to change. Pass --title, --content, --tag or --lucid.");
        }
        println!("Editing dream: {}", dream.id);
        println!("Press Enter to keep current value, or type new value.\n");

        if let Some(title) = prompt_with_default("Title", &dream.title)? {
            dream.set_title(title);
        }
        let content = edit_text(&dream.content)?;
        if content != dream.content {
            dream.set_content(content);
        }
    } else {
        apply_edits(&mut dream, edits);
    }

    journal
        .update_dream(&dream)
        .await
        .context("Failed to update dream")?;

    output.success(&format!("Updated dream: {}", dream.id));
    Ok(())
}

fn apply_edits(dream: &mut Dream, edits: DreamEdits) {
    if let Some(title) = edits.title {
        dream.set_title(title);
    }
    if let Some(content) = edits.content {
        dream.set_content(content);
    }
    if let Some(tags) = edits.tags {
        dream.set_tags(tags);
    }
    if let Some(lucid) = edits.lucid {
        dream.set_lucid(lucid);
    }
}

/// Delete a dream, after confirmation
pub async fn delete(journal: &Journal, id: String, yes: bool, output: &Output) -> Result<()> {
    let dream = find(journal, &id).await?;
    let pending = journal.delete_dream(dream.id).await?;
    finish_delete(journal, pending, &dream.title, yes, output).await
}
