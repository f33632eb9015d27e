//! Loading prompt definitions from the workspace.

use crate::builtin::builtin_prompt;
use crate::types::PromptDefinition;
use marquee_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".marquee/prompts")
}

/// Load a prompt definition `<id>.yml` from `.marquee/prompts/`.
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Resolve a prompt: a workspace override wins over the built-in definition.
pub fn resolve_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let override_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));
    if override_file.exists() {
        return load_prompt(workspace_path, prompt_id);
    }

    builtin_prompt(prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::RECOMMEND_PROMPT_ID;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, valid: bool) {
        let dir = prompts_dir(dir);
        fs::create_dir_all(&dir).unwrap();

        let content = if valid {
            format!(
                "id: {}\ntitle: \"Custom\"\napiVersion: \"1.0\"\ntemplate: \"Custom: {{{{query}}}}\"\n",
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        fs::write(dir.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "test.prompt", true);

        let prompt = load_prompt(temp_dir.path(), "test.prompt").unwrap();
        assert_eq!(prompt.id, "test.prompt");
        assert_eq!(prompt.template, "Custom: {{query}}");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "invalid", false);
        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_resolve_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = resolve_prompt(temp_dir.path(), RECOMMEND_PROMPT_ID).unwrap();
        assert_eq!(prompt.title, "Movie recommendations");
    }

    #[test]
    fn test_resolve_prefers_override() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), RECOMMEND_PROMPT_ID, true);

        let prompt = resolve_prompt(temp_dir.path(), RECOMMEND_PROMPT_ID).unwrap();
        assert_eq!(prompt.title, "Custom");
    }

    #[test]
    fn test_resolve_unknown() {
        let temp_dir = TempDir::new().unwrap();
        assert!(resolve_prompt(temp_dir.path(), "movie.nope").is_err());
    }
}
