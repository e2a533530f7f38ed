//! Saved chat transcripts.
//!
//! A transcript is one file per session, `chat_%Y%m%d_%H%M%S.txt`, with
//! one `"<Role>: <content>"` line per message. Backslashes and line
//! breaks in the content are written as `\\`, `\n` and `\r`, so a message
//! never spans lines and text inside it that looks like `User: ...` cannot
//! start a new message. When reading, unlabelled lines in older
//! hand-edited files continue the previous message.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use memchat_core::models::{Message, Role};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::files::write_atomic;

const FILE_PREFIX: &str = "chat_";
const FILE_SUFFIX: &str = ".txt";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A transcript read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PastChat {
    pub file_name: String,
    /// Session start parsed from the file name, if it follows the pattern.
    pub started_at: Option<NaiveDateTime>,
    pub modified: SystemTime,
    pub body: String,
}

pub fn transcript_file_name(at: NaiveDateTime) -> String {
    format!("{}{}{}", FILE_PREFIX, at.format(TIMESTAMP_FORMAT), FILE_SUFFIX)
}

/// Parse the session timestamp out of `chat_YYYYmmdd_HHMMSS[...].txt`.
pub fn parse_file_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    let stem = file_name.strip_prefix(FILE_PREFIX)?;
    let stamp = stem.get(..15)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

fn escape_content(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_content(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for m in messages {
        out.push_str(m.role.label());
        out.push_str(": ");
        out.push_str(&escape_content(&m.content));
        out.push('\n');
    }
    out
}

pub fn parse_transcript(text: &str) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::new();
    for line in text.lines() {
        let started = line
            .split_once(": ")
            .and_then(|(label, rest)| Role::from_label(label).map(|role| (role, rest)));
        if let Some((role, rest)) = started {
            messages.push(Message::new(role, unescape_content(rest)));
        } else if let Some(last) = messages.last_mut() {
            last.content.push('\n');
            last.content.push_str(&unescape_content(line));
        } else if !line.is_empty() {
            messages.push(Message::user(unescape_content(line)));
        }
    }
    messages
}

/// Write `messages` as a new transcript in `dir`. Never overwrites an
/// existing transcript: a same-second collision gets a numeric suffix.
pub fn save_transcript(dir: &Path, messages: &[Message], at: NaiveDateTime) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut path = dir.join(transcript_file_name(at));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!(
            "{}{}_{}{}",
            FILE_PREFIX,
            at.format(TIMESTAMP_FORMAT),
            n,
            FILE_SUFFIX
        ));
        n += 1;
    }

    write_atomic(&path, render_transcript(messages).as_bytes())?;
    tracing::info!(path = %path.display(), messages = messages.len(), "saved transcript");
    Ok(path)
}

/// Load `.txt` transcripts from `dir`, newest first by modification time,
/// keeping at most `limit` of them. A missing directory yields none;
/// unreadable files are skipped with a warning.
pub fn load_past_chats(dir: &Path, limit: Option<usize>) -> Result<Vec<PastChat>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !file_name.ends_with(FILE_SUFFIX) || !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        candidates.push((modified, file_name, entry.path()));
    }

    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    if let Some(limit) = limit {
        candidates.truncate(limit);
    }

    let mut chats = Vec::with_capacity(candidates.len());
    for (modified, file_name, path) in candidates {
        match std::fs::read_to_string(&path) {
            Ok(body) => chats.push(PastChat {
                started_at: parse_file_timestamp(&file_name),
                file_name,
                modified,
                body,
            }),
            Err(e) => tracing::warn!(file = %file_name, error = %e, "skipping unreadable transcript"),
        }
    }
    Ok(chats)
}
