//! Single-step parsing of a raw input line into a [`Command`].
//!
//! Every line typed into a chat loop goes through [`parse_command`]
//! exactly once; the loop then dispatches on the returned variant.
//! Which reserved words are recognized depends on the [`Persona`].
//!
//! Task commands (tasks persona only):
//!
//! ```text
//! add task: <name> | <project> | [description] | [due_date] | [[link, link]]
//! complete task: <name>
//! delete task: <name>
//! show tasks | list tasks | list open tasks | ...
//! ```

use crate::error::{ChatError, Result};
use crate::persona::Persona;
use crate::tasks::{NewTask, DEFAULT_DESCRIPTION, DEFAULT_DUE_DATE};

const ADD_TASK: &str = "add task:";
const COMPLETE_TASK: &str = "complete task:";
const DELETE_TASK: &str = "delete task:";

const LIST_PHRASES: &[&str] = &[
    "what are my open tasks?",
    "what are all my open tasks?",
    "show tasks",
    "show all tasks",
    "list tasks",
    "list open tasks",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank input; nothing to do.
    Empty,
    /// End the session.
    Quit,
    /// Free text for the model.
    Chat(String),
    AddTask(NewTask),
    CompleteTask(String),
    DeleteTask(String),
    ListTasks,
}

/// Parse one input line for `persona`.
///
/// Fails with [`ChatError::MalformedCommand`] when a reserved command is
/// recognized but its arguments are unusable.
pub fn parse_command(persona: Persona, line: &str) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }

    let lower = line.to_lowercase();
    if persona.quit_words().iter().any(|w| *w == lower) {
        return Ok(Command::Quit);
    }

    if persona.handles_tasks() {
        if let Some(rest) = strip_prefix_ci(line, DELETE_TASK) {
            return Ok(Command::DeleteTask(task_name(rest, DELETE_TASK)?));
        }
        if let Some(rest) = strip_prefix_ci(line, ADD_TASK) {
            return parse_add_task(rest).map(Command::AddTask);
        }
        if let Some(rest) = strip_prefix_ci(line, COMPLETE_TASK) {
            return Ok(Command::CompleteTask(task_name(rest, COMPLETE_TASK)?));
        }
        if LIST_PHRASES.contains(&lower.as_str()) {
            return Ok(Command::ListTasks);
        }
    }

    Ok(Command::Chat(line.to_string()))
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

fn task_name(rest: &str, command: &str) -> Result<String> {
    let name = rest.trim_matches(|c: char| c == ':' || c.is_whitespace());
    if name.is_empty() {
        return Err(ChatError::MalformedCommand(format!(
            "'{}' needs a task name",
            command
        )));
    }
    Ok(name.to_string())
}

fn parse_add_task(rest: &str) -> Result<NewTask> {
    let parts: Vec<&str> = rest.split('|').map(str::trim).collect();
    if parts.len() < 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ChatError::MalformedCommand(
            "please provide at least Task Name and Project Name. \
             Format: add task: Task Name | Project Name"
                .to_string(),
        ));
    }

    let field = |i: usize, default: &str| -> String {
        match parts.get(i) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => default.to_string(),
        }
    };

    Ok(NewTask {
        task_name: parts[0].to_string(),
        project: parts[1].to_string(),
        description: field(2, DEFAULT_DESCRIPTION),
        due_date: field(3, DEFAULT_DUE_DATE),
        relevant_links: parts.get(4).map(|l| parse_links(l)).unwrap_or_default(),
    })
}

fn parse_links(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('[').unwrap_or(raw);
    let raw = raw.strip_suffix(']').unwrap_or(raw);
    raw.split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
