//! Task file loading
//!
//! A task file lists task specifications for a backlog:
//! - `.toml`: a `[[tasks]]` array of tables
//! - `.json`: either `{ "tasks": [...] }` or a bare array
//!
//! Extension matching is case-insensitive.

use crate::task::{Task, TaskSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TaskFileError {
    #[error("File '{path}' is not UTF-8 encoded: {hint}")]
    NotUtf8 { path: PathBuf, hint: String },

    #[error("File '{path}' not found")]
    NotFound { path: PathBuf },

    #[error("IO error reading '{path}': {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported task file format '{path}' (expected .toml or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[error("Task parsing error in '{path}': {reason}")]
    ParseError { path: PathBuf, reason: String },
}

/// On-disk task file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFormat {
    Toml,
    Json,
}

impl TaskFormat {
    pub fn detect(path: &Path) -> Result<Self, TaskFileError> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "toml" => Ok(TaskFormat::Toml),
            "json" => Ok(TaskFormat::Json),
            _ => Err(TaskFileError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Contents of a task file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFile {
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTaskFile {
    Wrapped(TaskFile),
    Bare(Vec<TaskSpec>),
}

/// Loads task files into orchestrator tasks
pub struct TaskLoader;

impl TaskLoader {
    fn read_file(path: &Path) -> Result<String, TaskFileError> {
        debug!("Loading task file: {:?}", path);

        fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TaskFileError::NotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::InvalidData => TaskFileError::NotUtf8 {
                path: path.to_path_buf(),
                hint: "File appears to be binary. Task files must be TOML or JSON text."
                    .to_string(),
            },
            _ => TaskFileError::IoError {
                path: path.to_path_buf(),
                source: e,
            },
        })
    }

    /// Parse task file content in the given format
    pub fn parse(content: &str, format: TaskFormat, path: &Path) -> Result<TaskFile, TaskFileError> {
        let parse_error = |reason: String| TaskFileError::ParseError {
            path: path.to_path_buf(),
            reason,
        };

        match format {
            TaskFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
            TaskFormat::Json => match serde_json::from_str(content) {
                Ok(JsonTaskFile::Wrapped(file)) => Ok(file),
                Ok(JsonTaskFile::Bare(tasks)) => Ok(TaskFile { tasks }),
                Err(e) => Err(parse_error(e.to_string())),
            },
        }
    }

    /// Load a task file, detecting its format from the extension
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<TaskFile, TaskFileError> {
        let path = path.as_ref();
        Self::load_file_as(path, TaskFormat::detect(path)?)
    }

    /// Load a task file in an already known format
    pub fn load_file_as<P: AsRef<Path>>(
        path: P,
        format: TaskFormat,
    ) -> Result<TaskFile, TaskFileError> {
        let path = path.as_ref();
        let content = Self::read_file(path)?;
        let file = Self::parse(&content, format, path)?;

        if file.tasks.is_empty() {
            warn!("No tasks found in file: {:?}", path);
        }
        debug!("Parsed {} task(s) from {:?}", file.tasks.len(), path);
        Ok(file)
    }

    /// Load a task file and build pending tasks, generating ids where missing
    pub fn load_tasks<P: AsRef<Path>>(path: P) -> Result<Vec<Task>, TaskFileError> {
        let file = Self::load_file(path)?;
        Ok(file.tasks.into_iter().map(Task::from_spec).collect())
    }

    /// Same as [`TaskLoader::load_tasks`] with the format given by the caller
    pub fn load_tasks_as<P: AsRef<Path>>(
        path: P,
        format: TaskFormat,
    ) -> Result<Vec<Task>, TaskFileError> {
        let file = Self::load_file_as(path, format)?;
        Ok(file.tasks.into_iter().map(Task::from_spec).collect())
    }
}
