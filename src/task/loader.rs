//! Validation and normalization of raw descriptor records.

use super::{Complexity, DEFAULT_PROJECT_ID, TaskDescriptor};
use crate::config::{Config, Platform, ProjectConfig};
use crate::error::{PipelineError, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::LazyLock;

/// Identifiers end up in branch names and file names: one git ref component, with no
/// `..` and no trailing `.`.
static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9_-]|\.[A-Za-z0-9_-])*$")
        .expect("identifier regex is valid")
});

// Accepted spellings per field, canonical name first.
const ID: &[&str] = &["id", "issue_id", "issueId"];
const TITLE: &[&str] = &["title"];
const BODY: &[&str] = &["body"];
const SOURCE_URL: &[&str] = &["sourceUrl", "source_url", "url"];
const REPOSITORY_URL: &[&str] = &["repositoryUrl", "repository_url", "repository"];
const COMPLEXITY: &[&str] = &["complexity"];
const PROJECT_ID: &[&str] = &["projectId", "project_id"];
const PROJECT_NAME: &[&str] = &["projectName", "project_name"];
const PROJECT_TYPE: &[&str] = &["projectType", "project_type"];
const PROJECT_PATH: &[&str] = &["projectPath", "project_path"];
const PLATFORM: &[&str] = &["platform"];
const LINT_COMMAND: &[&str] = &["lintCommand", "lint_command"];
const TEST_COMMAND: &[&str] = &["testCommand", "test_command"];
const BUILD_COMMAND: &[&str] = &["buildCommand", "build_command"];

impl TaskDescriptor {
    /// Parse a descriptor from JSON text.
    pub fn from_json(json: &str, config: &Config) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            PipelineError::Config(format!("failed to parse task descriptor JSON: {}", e))
        })?;
        Self::from_value(value, config)
    }

    /// Validate a raw record and resolve it against the configuration.
    ///
    /// Precedence for project fields: descriptor, then the matching `projects` entry,
    /// then the top-level configuration.
    pub fn from_value(value: Value, config: &Config) -> Result<Self> {
        let Value::Object(record) = value else {
            return Err(PipelineError::Config(
                "task descriptor must be a JSON object".to_string(),
            ));
        };

        let id = required_id(&record)?;
        let title = required_text(&record, TITLE)?;
        let body = required_text(&record, BODY)?;
        let source_url = required_text(&record, SOURCE_URL)?;
        let repository_url = required_text(&record, REPOSITORY_URL)?;

        let complexity = match optional_text(&record, COMPLEXITY)? {
            None => Complexity::default(),
            Some(raw) => Complexity::from_str(&raw).ok_or_else(|| invalid_field(COMPLEXITY))?,
        };

        let project_id = optional_text(&record, PROJECT_ID)?
            .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string());
        if !is_identifier(&project_id) {
            return Err(invalid_field(PROJECT_ID));
        }

        let project = config.project(&project_id);
        let from_project = |pick: fn(&ProjectConfig) -> Option<String>| project.and_then(pick);

        let project_name = optional_text(&record, PROJECT_NAME)?
            .or_else(|| from_project(|p| non_empty(&p.name)))
            .unwrap_or_else(|| project_id.clone());
        let project_type = optional_text(&record, PROJECT_TYPE)?
            .or_else(|| from_project(|p| non_empty(&p.project_type)))
            .unwrap_or_default();

        let project_path = optional_text(&record, PROJECT_PATH)?
            .map(PathBuf::from)
            .or_else(|| project.and_then(|p| p.path.clone()))
            .or_else(|| config.project_path.clone())
            .ok_or_else(|| missing_field(PROJECT_PATH))?;

        let platform = match optional_text(&record, PLATFORM)? {
            None => config.tracker.platform,
            Some(raw) => Platform::from_str(&raw).ok_or_else(|| invalid_field(PLATFORM))?,
        };

        let lint_command = command(&record, LINT_COMMAND, project.and_then(|p| p.lint_command.clone()))?;
        let test_command = command(&record, TEST_COMMAND, project.and_then(|p| p.test_command.clone()))?;
        let build_command =
            command(&record, BUILD_COMMAND, project.and_then(|p| p.build_command.clone()))?;

        Ok(TaskDescriptor {
            id,
            title,
            body,
            complexity,
            source_url,
            repository_url,
            project_id,
            project_name,
            project_type,
            project_path,
            platform,
            lint_command,
            test_command,
            build_command,
        })
    }
}

/// First present, non-null value among a field's spellings.
fn lookup<'a>(record: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| record.get(*name))
        .find(|value| !value.is_null())
}

fn required_id(record: &Map<String, Value>) -> Result<String> {
    let id = match lookup(record, ID) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) if n.is_u64() => n.to_string(),
        _ => return Err(missing_field(ID)),
    };
    if !is_identifier(&id) {
        return Err(invalid_field(ID));
    }
    Ok(id)
}

/// git refuses ref components ending in `.lock`.
fn is_identifier(s: &str) -> bool {
    IDENTIFIER_RE.is_match(s) && !s.ends_with(".lock")
}

fn required_text(record: &Map<String, Value>, names: &[&str]) -> Result<String> {
    match lookup(record, names) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(missing_field(names)),
    }
}

/// Optional string field. Empty strings count as unset.
fn optional_text(record: &Map<String, Value>, names: &[&str]) -> Result<Option<String>> {
    match lookup(record, names) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(non_empty(s)),
        Some(_) => Err(invalid_field(names)),
    }
}

/// Command fields keep an explicit empty string: it disables the step even when the
/// project entry configures one.
fn command(
    record: &Map<String, Value>,
    names: &[&str],
    fallback: Option<String>,
) -> Result<String> {
    match lookup(record, names) {
        None => Ok(fallback.unwrap_or_default().trim().to_string()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(invalid_field(names)),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn missing_field(names: &[&str]) -> PipelineError {
    PipelineError::Config(format!("missing field: {}", names[0]))
}

fn invalid_field(names: &[&str]) -> PipelineError {
    PipelineError::Config(format!("invalid field: {}", names[0]))
}
