//! Status command handler

use anyhow::Result;

use dreamlog_core::Journal;

use crate::output::Output;

/// Show storage and record counts
pub async fn show(journal: &Journal, output: &Output) -> Result<()> {
    let stats = journal.stats().await;
    output.print_stats(&stats, &journal.config().data_dir)
}
