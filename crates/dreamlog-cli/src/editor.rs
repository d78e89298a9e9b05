//! Interactive input
//!
//! Opens $EDITOR for writing dream content and asks questions on the
//! terminal.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Hint appended to the editor buffer; stripped again on read
const EDITOR_HINT: &str = "\n# Describe your dream above. Lines starting with '#' are ignored.\n";

/// Editors tried, in order, when neither $EDITOR nor $VISUAL is set
const FALLBACK_EDITORS: [&str; 6] = ["nano", "vim", "vi", "emacs", "code", "notepad"];

/// Let the user write or revise text in their editor
///
/// The buffer is a temporary `.md` file removed afterwards. Comment lines
/// are dropped from the result.
pub fn edit_text(initial_content: &str) -> Result<String> {
    let editor = find_editor()?;

    let mut buffer = tempfile::Builder::new()
        .prefix("dreamlog_")
        .suffix(".md")
        .tempfile()
        .context("Failed to create editor buffer")?;
    write!(buffer, "{}{}", initial_content, EDITOR_HINT).context("Failed to fill editor buffer")?;
    buffer.flush()?;

    let status = Command::new(&editor)
        .arg(buffer.path())
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;
    if !status.success() {
        bail!(
            "Editor '{}' exited with {}. Check that $EDITOR is set to a working editor.",
            editor,
            status
        );
    }

    // Editors often replace the file, so read it back by path
    let content = fs::read_to_string(buffer.path())
        .with_context(|| format!("Failed to read edited file: {:?}", buffer.path()))?;

    Ok(strip_comments(&content))
}

/// Drop '#' comment lines and surrounding blank space
fn strip_comments(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn find_editor() -> Result<String> {
    let configured = ["EDITOR", "VISUAL"]
        .into_iter()
        .filter_map(|var| env::var(var).ok())
        .find(|editor| !editor.trim().is_empty());
    if let Some(editor) = configured {
        return Ok(editor);
    }

    FALLBACK_EDITORS
        .into_iter()
        .find(|editor| command_exists(editor))
        .map(str::to_string)
        .context(
            "No editor found. Set $EDITOR or pass the content on the command line.\n\
             Example: export EDITOR=nano",
        )
}

fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Print `question` and read one trimmed line from stdin
fn ask(question: &str) -> Result<String> {
    print!("{}", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(answer.trim().to_string())
}

/// Ask a yes/no question; anything but "y" or "yes" is a no
///
/// Without a terminal on stdin the answer is always no.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    let answer = ask(&format!("{} [y/N] ", prompt))?.to_lowercase();
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer, "y" | "yes")
}

/// Ask for a value showing the current one; None keeps it
pub fn prompt_with_default(prompt: &str, current: &str) -> Result<Option<String>> {
    let question = if current.is_empty() {
        format!("{}: ", prompt)
    } else {
        format!("{} [{}]: ", prompt, current)
    };

    let answer = ask(&question)?;
    Ok(Some(answer).filter(|a| !a.is_empty()))
}
