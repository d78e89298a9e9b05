//! Goal command handlers

use anyhow::{Context, Result};

use dreamlog_core::{Goal, GoalDraft, GoalStatus, GoalType, Journal, RecordKind, ViewQuery};

use super::{finish_delete, paginate, resolve_id, ListArgs};
use crate::output::Output;

/// Create a new goal
pub async fn add(
    journal: &Journal,
    title: String,
    goal_type: GoalType,
    target: u32,
    description: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut draft = GoalDraft::new(title, goal_type, target);
    if let Some(description) = description {
        draft.description = description;
    }

    let goal = journal
        .save_goal(draft)
        .await
        .context("Failed to save goal")?;

    output.success(&format!("Created goal: {}", goal.id));
    output.print_goal(&goal)?;
    Ok(())
}

/// List goals; `--tag` is not meaningful here and is ignored
pub async fn list(journal: &Journal, args: ListArgs, output: &Output) -> Result<()> {
    let needle = args.needle();
    let query = ViewQuery::new(args.criteria_key()).filter(move |goal: &Goal| {
        needle.as_ref().map_or(true, |n| {
            goal.title.to_lowercase().contains(n) || goal.description.to_lowercase().contains(n)
        })
    });

    let page = paginate(journal, RecordKind::Goal, &args, || journal.display_goals(&query)).await;
    output.print_goals(&page)
}

async fn find(journal: &Journal, id: &str) -> Result<Goal> {
    let goals = journal.load_goals().await;
    let id = resolve_id(id, &goals, |g| g.title.clone())?;

    journal
        .get_goal(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Goal not found: {}", id))
}

/// Show a single goal
pub async fn show(journal: &Journal, id: String, output: &Output) -> Result<()> {
    let goal = find(journal, &id).await?;
    output.print_goal(&goal)
}

/// Move a goal to a new status
pub async fn set_status(journal: &Journal, id: String, status: GoalStatus, output: &Output) -> Result<()> {
    let mut goal = find(journal, &id).await?;
    goal.set_status(status);

    journal
        .update_goal(&goal)
        .await
        .context("Failed to update goal")?;

    output.success(&format!("Goal {} is now {}", goal.id.short(), status));
    Ok(())
}

/// Delete a goal, after confirmation
pub async fn delete(journal: &Journal, id: String, yes: bool, output: &Output) -> Result<()> {
    let goal = find(journal, &id).await?;
    let pending = journal.delete_goal(goal.id).await?;
    finish_delete(journal, pending, &goal.title, yes, output).await
}
