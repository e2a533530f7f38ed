//! Task records for the task-management persona.
//!
//! A [`TaskBook`] serializes to the task file shape
//! `{"open_tasks": [...], "completed_tasks": [...]}`. Task names are
//! matched trimmed and case-insensitively.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

pub const DEFAULT_DESCRIPTION: &str = "No description provided";
pub const DEFAULT_DUE_DATE: &str = "No due date";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_name: String,
    pub project: String,
    pub create_date: String,
    pub due_date: String,
    pub complete_date: Option<String>,
    pub description: String,
    #[serde(default)]
    pub relevant_links: Vec<String>,
}

/// Fields supplied by an `add task:` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub task_name: String,
    pub project: String,
    pub description: String,
    pub due_date: String,
    pub relevant_links: Vec<String>,
}

impl NewTask {
    pub fn new(task_name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            project: project.into(),
            description: DEFAULT_DESCRIPTION.to_string(),
            due_date: DEFAULT_DUE_DATE.to_string(),
            relevant_links: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBook {
    #[serde(default)]
    pub open_tasks: Vec<Task>,
    #[serde(default)]
    pub completed_tasks: Vec<Task>,
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl TaskBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new open task created `today`.
    pub fn add(&mut self, new: NewTask, today: NaiveDate) -> &Task {
        self.open_tasks.push(Task {
            task_name: new.task_name,
            project: new.project,
            create_date: today.format(DATE_FORMAT).to_string(),
            due_date: new.due_date,
            complete_date: None,
            description: new.description,
            relevant_links: new.relevant_links,
        });
        &self.open_tasks[self.open_tasks.len() - 1]
    }

    /// Move the named open task to the completed list, stamping
    /// `complete_date`.
    pub fn complete(&mut self, name: &str, today: NaiveDate) -> Result<&Task> {
        let pos = self
            .open_tasks
            .iter()
            .position(|t| same_name(&t.task_name, name))
            .ok_or_else(|| ChatError::TaskNotFound(name.trim().to_string()))?;

        let mut task = self.open_tasks.remove(pos);
        task.complete_date = Some(today.format(DATE_FORMAT).to_string());
        self.completed_tasks.push(task);
        Ok(&self.completed_tasks[self.completed_tasks.len() - 1])
    }

    /// Remove every task with this name from both lists. Returns how many
    /// were removed.
    pub fn delete(&mut self, name: &str) -> Result<usize> {
        let before = self.open_tasks.len() + self.completed_tasks.len();
        self.open_tasks.retain(|t| !same_name(&t.task_name, name));
        self.completed_tasks.retain(|t| !same_name(&t.task_name, name));
        let removed = before - (self.open_tasks.len() + self.completed_tasks.len());
        if removed == 0 {
            return Err(ChatError::TaskNotFound(name.trim().to_string()));
        }
        Ok(removed)
    }

    /// Human-readable list of open tasks.
    pub fn open_summary(&self) -> String {
        if self.open_tasks.is_empty() {
            return "No open tasks found.".to_string();
        }
        let mut out = String::from("Open Tasks:\n");
        for task in &self.open_tasks {
            out.push_str(&format!("\n- {} (Due: {})", task.task_name, task.due_date));
            out.push_str(&format!("\n  Project: {}", task.project));
            out.push_str(&format!("\n  Description: {}", task.description));
        }
        out
    }
}
