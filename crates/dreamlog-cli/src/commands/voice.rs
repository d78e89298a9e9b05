//! Voice note command handlers

use anyhow::{Context, Result};

use dreamlog_core::{Journal, RecordKind, ViewQuery, VoiceNote, VoiceNoteDraft};

use super::{finish_delete, paginate, resolve_id, ListArgs};
use crate::output::Output;

/// Metadata for a new voice note
pub struct NewVoiceNote {
    pub duration: f64,
    pub title: Option<String>,
    pub transcription: Option<String>,
    pub size: u64,
    pub mime: Option<String>,
}

/// Record the metadata of a voice note
pub async fn add(journal: &Journal, new: NewVoiceNote, output: &Output) -> Result<()> {
    let mut draft = VoiceNoteDraft::new(new.duration);
    draft.title = new.title;
    draft.transcription = new.transcription;
    draft.size_bytes = new.size;
    if let Some(mime) = new.mime {
        draft.mime_type = mime;
    }

    let note = journal
        .save_voice_note(draft)
        .await
        .context("Failed to save voice note")?;

    output.success(&format!("Saved voice note: {}", note.id));
    output.print_voice_note(&note)?;
    Ok(())
}

/// List voice notes, searching titles and transcriptions
pub async fn list(journal: &Journal, args: ListArgs, output: &Output) -> Result<()> {
    let needle = args.needle();
    let query = ViewQuery::new(args.criteria_key()).filter(move |note: &VoiceNote| {
        needle.as_ref().map_or(true, |n| {
            note.title.to_lowercase().contains(n)
                || note
                    .transcription
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(n))
        })
    });

    let page = paginate(journal, RecordKind::VoiceNote, &args, || {
        journal.display_voice_notes(&query)
    })
    .await;
    output.print_voice_notes(&page)
}

async fn find(journal: &Journal, id: &str) -> Result<VoiceNote> {
    let notes = journal.load_voice_notes().await;
    let id = resolve_id(id, &notes, |n| n.title.clone())?;

    journal
        .get_voice_note(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Voice note not found: {}", id))
}

/// Show a single voice note
pub async fn show(journal: &Journal, id: String, output: &Output) -> Result<()> {
    let note = find(journal, &id).await?;
    output.print_voice_note(&note)
}

/// Replace a voice note's transcription; an empty text clears it
pub async fn transcribe(journal: &Journal, id: String, text: String, output: &Output) -> Result<()> {
    let mut note = find(journal, &id).await?;
    note.set_transcription(Some(text));

    journal
        .update_voice_note(&note)
        .await
        .context("Failed to update voice note")?;

    output.success(&format!("Updated voice note: {}", note.id));
    Ok(())
}

/// Delete a voice note, after confirmation
pub async fn delete(journal: &Journal, id: String, yes: bool, output: &Output) -> Result<()> {
    let note = find(journal, &id).await?;
    let pending = journal.delete_voice_note(note.id).await?;
    finish_delete(journal, pending, &note.title, yes, output).await
}
