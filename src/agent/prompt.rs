//! Prompt and command-line construction for the agent.

use crate::config::AgentConfig;
use crate::error::{PipelineError, Result};
use crate::task::TaskDescriptor;
use crate::template::{self, TemplateError, Vars};
use crate::workspace::WorkspaceHandle;
use std::path::Path;

/// Appended to every prompt, whatever the configured template says.
pub const COMMIT_RULE: &str = "IMPORTANT: Do NOT run `git commit`, `git push`, or create branches. \
Your changes are committed, validated and published automatically once you finish.";

/// Render the agent prompt for a task, followed by [`COMMIT_RULE`].
pub fn render_prompt(config: &AgentConfig, task: &TaskDescriptor) -> Result<String> {
    let complexity = task.complexity.to_string();
    let vars = template::vars([
        ("task_id", task.id.as_str()),
        ("title", task.title.as_str()),
        ("body", task.body.as_str()),
        ("complexity", complexity.as_str()),
        ("project_name", task.project_name.as_str()),
        ("project_type", project_type_label(task)),
        ("source_url", task.source_url.as_str()),
    ]);

    let prompt = template::render(&config.prompt_template, &vars)
        .map_err(|e| template_error("agent.prompt_template", &e, &vars))?;
    Ok(format!("{}\n\n{}\n", prompt.trim_end(), COMMIT_RULE))
}

/// Build the agent argv.
///
/// The template is split into words before rendering, so a multi-line prompt or a
/// path with spaces always stays one argument.
pub fn build_command(
    config: &AgentConfig,
    task: &TaskDescriptor,
    handle: &WorkspaceHandle,
    prompt: &str,
    prompt_file: &Path,
) -> Result<Vec<String>> {
    let vars = template::vars([
        ("prompt", prompt.to_string()),
        ("prompt_file", prompt_file.display().to_string()),
        ("allowed_tools", allowed_tools_arg(&config.allowed_tools)),
        ("workspace", handle.path.display().to_string()),
        ("task_id", task.id.clone()),
        ("branch", handle.branch_name.clone()),
    ]);

    let words = shell_words::split(&config.command).map_err(|e| {
        PipelineError::Config(format!(
            "failed to parse agent.command '{}': {}\n\
             Fix: check for unmatched quotes or invalid escape sequences.",
            config.command, e
        ))
    })?;
    if words.is_empty() {
        return Err(PipelineError::Config(
            "agent.command is empty after parsing".to_string(),
        ));
    }

    words
        .iter()
        .map(|word| {
            template::render(word, &vars).map_err(|e| template_error("agent.command", &e, &vars))
        })
        .collect()
}

/// Capability allowlist as a single comma-separated argument.
pub fn allowed_tools_arg(tools: &[String]) -> String {
    tools
        .iter()
        .map(|t| t.trim())
        .collect::<Vec<_>>()
        .join(",")
}

fn project_type_label(task: &TaskDescriptor) -> &str {
    if task.project_type.is_empty() {
        "software"
    } else {
        &task.project_type
    }
}

fn template_error(field: &str, e: &TemplateError, vars: &Vars) -> PipelineError {
    let available = vars.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
    PipelineError::Config(format!(
        "{} is invalid: {}\nAvailable variables: {}",
        field, e, available
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::config::types::DEFAULT_PROMPT_TEMPLATE;
    use serde_json::json;
    use std::path::PathBuf;

    fn task() -> TaskDescriptor {
        let mut config = Config::default();
        config.project_path = Some(PathBuf::from("/srv/game"));
        TaskDescriptor::from_value(
            json!({
                "id": "42",
                "title": "Add health system",
                "body": "Add a Health node with {max} hit points.",
                "complexity": "simple",
                "sourceUrl": "https://github.com/acme/game/issues/42",
                "repositoryUrl": "https://github.com/acme/game",
                "projectId": "game",
                "projectName": "My Game",
                "projectType": "godot"
            }),
            &config,
        )
        .unwrap()
    }

    fn handle() -> WorkspaceHandle {
        WorkspaceHandle {
            path: PathBuf::from("/tmp/wt/game task-42"),
            branch_name: "perch/game/task-42".to_string(),
            base_project_path: PathBuf::from("/srv/game"),
            base_commit: "abc".to_string(),
            base_branch: "main".to_string(),
        }
    }

    #[test]
    fn test_default_prompt_embeds_task_and_commit_rule() {
        let prompt = render_prompt(&AgentConfig::default(), &task()).unwrap();

        assert!(prompt.contains("godot project \"My Game\""));
        assert!(prompt.contains("# Task #42: Add health system"));
        assert!(prompt.contains("Complexity: simple"));
        assert!(prompt.contains("{max} hit points"));
        assert!(prompt.contains("Do NOT run `git commit`"));
        assert!(DEFAULT_PROMPT_TEMPLATE.contains("{body}"));
    }

    #[test]
    fn test_custom_template_still_gets_commit_rule() {
        let config = AgentConfig {
            prompt_template: "Fix #{task_id}: {title}\n".to_string(),
            ..AgentConfig::default()
        };
        let prompt = render_prompt(&config, &task()).unwrap();

        assert!(prompt.starts_with("Fix #42: Add health system\n\n"));
        assert!(prompt.ends_with(&format!("{}\n", COMMIT_RULE)));
        assert_eq!(prompt.matches("Do NOT run `git commit`").count(), 1);
    }

    #[test]
    fn test_prompt_without_project_type() {
        let mut task = task();
        task.project_type.clear();
        let prompt = render_prompt(&AgentConfig::default(), &task).unwrap();
        assert!(prompt.contains("software project"));
    }

    #[test]
    fn test_prompt_template_undefined_variable() {
        let config = AgentConfig {
            prompt_template: "Do {objective}".to_string(),
            ..AgentConfig::default()
        };
        let err = render_prompt(&config, &task()).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(err.to_string().contains("agent.prompt_template"));
        assert!(err.to_string().contains("'objective'"));
    }

    #[test]
    fn test_default_command_keeps_prompt_as_one_argument() {
        let config = AgentConfig::default();
        let prompt = "line one\nline \"two\"";
        let argv = build_command(
            &config,
            &task(),
            &handle(),
            prompt,
            Path::new("/logs/prompt.md"),
        )
        .unwrap();

        assert_eq!(argv[0], "claude");
        assert_eq!(argv[1], "-p");
        assert_eq!(argv[2], prompt);
        assert_eq!(argv[3], "--allowedTools");
        assert!(argv[4].starts_with("Read,Write,Edit"));
        assert!(argv[4].contains("Bash(git diff:*)"));
        assert_eq!(argv.len(), 5);
    }

    #[test]
    fn test_command_variables() {
        let config = AgentConfig {
            command: "agent --file {prompt_file} --cwd {workspace} --id {task_id} --branch={branch}"
                .to_string(),
            ..AgentConfig::default()
        };
        let argv = build_command(
            &config,
            &task(),
            &handle(),
            "p",
            Path::new("/logs/prompt.md"),
        )
        .unwrap();

        assert_eq!(
            argv,
            vec![
                "agent",
                "--file",
                "/logs/prompt.md",
                "--cwd",
                "/tmp/wt/game task-42",
                "--id",
                "42",
                "--branch=perch/game/task-42",
            ]
        );
    }

    #[test]
    fn test_command_undefined_variable() {
        let config = AgentConfig {
            command: "agent {model}".to_string(),
            ..AgentConfig::default()
        };
        let err = build_command(&config, &task(), &handle(), "p", Path::new("/p")).unwrap_err();
        assert!(err.to_string().contains("agent.command is invalid"));
        assert!(err.to_string().contains("Available variables"));
    }

    #[test]
    fn test_allowed_tools_arg() {
        let tools = vec!["Read".to_string(), " Edit ".to_string()];
        assert_eq!(allowed_tools_arg(&tools), "Read,Edit");
    }
}
