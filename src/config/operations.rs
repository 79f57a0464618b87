//! Config loading, validation, and lookup operations.

use super::model::Config;
use super::types::{Platform, ProjectConfig};
use crate::error::{PipelineError, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// Capability names that would hand the agent an unrestricted shell.
const UNRESTRICTED_SHELL_TOOLS: &[&str] = &["Bash", "Bash(*)", "Bash(:*)", "Bash(*:*)"];

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(PipelineError::Config)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load the config file if one was given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml maps an empty document to unit, not to an empty mapping.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                PipelineError::Config(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate config values and return error on invalid values.
    pub fn validate(&self) -> Result<()> {
        if self.remote.trim().is_empty() {
            return Err(invalid("remote must not be empty"));
        }

        if self.branch_prefix.trim().is_empty()
            || self.branch_prefix.starts_with('/')
            || self.branch_prefix.ends_with('/')
            || self.branch_prefix.contains(char::is_whitespace)
        {
            return Err(invalid(&format!(
                "branch_prefix '{}' is not a valid branch name prefix",
                self.branch_prefix
            )));
        }

        if self.agent.timeout_seconds == 0 {
            return Err(invalid("agent.timeout_seconds must be greater than 0"));
        }

        if self.validation.timeout_seconds == 0 {
            return Err(invalid("validation.timeout_seconds must be greater than 0"));
        }

        let args = shell_words::split(&self.agent.command).map_err(|e| {
            invalid(&format!(
                "agent.command could not be parsed: {} (check for unmatched quotes)",
                e
            ))
        })?;
        if args.is_empty() {
            return Err(invalid("agent.command must not be empty"));
        }

        if self.agent.allowed_tools.is_empty() {
            return Err(invalid("agent.allowed_tools must list at least one tool"));
        }
        for tool in &self.agent.allowed_tools {
            let tool = tool.trim();
            if tool.is_empty() {
                return Err(invalid("agent.allowed_tools entries must be non-empty"));
            }
            if UNRESTRICTED_SHELL_TOOLS.contains(&tool) {
                return Err(invalid(&format!(
                    "agent.allowed_tools grants unrestricted shell access ('{}'). \
                     Scope shell tools to specific commands, e.g. 'Bash(git status:*)'.",
                    tool
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for project in &self.projects {
            if project.id.trim().is_empty() {
                return Err(invalid("projects entries must have a non-empty id"));
            }
            if !seen.insert(project.id.as_str()) {
                return Err(invalid(&format!("duplicate project id '{}'", project.id)));
            }
        }

        Ok(())
    }

    /// Find the capability record for a project id.
    pub fn project(&self, id: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// CLI binary for the given tracker platform.
    pub fn tracker_program(&self, platform: Platform) -> String {
        match &self.tracker.program {
            Some(program) if !program.trim().is_empty() => program.clone(),
            _ => platform.default_program().to_string(),
        }
    }
}

fn invalid(msg: &str) -> PipelineError {
    PipelineError::Config(format!("config validation failed: {}", msg))
}
