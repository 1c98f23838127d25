//! Prompt loader for YAML prompt definitions.
//!
//! Built-in definitions ship inside the binary. A prompts directory, when
//! configured, may override any of them by dropping in `<id>.yml`.

use crate::types::PromptDefinition;
use std::path::Path;
use studyqa_core::{AppError, AppResult};

/// Built-in prompt definitions as `(id, yaml)` pairs.
const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (
        "studyqa.answer",
        include_str!("../prompts/studyqa.answer.yml"),
    ),
    (
        "studyqa.rephrase",
        include_str!("../prompts/studyqa.rephrase.yml"),
    ),
];

/// Load a prompt definition by ID.
///
/// Looks for `<id>.yml` in `prompts_dir` first, then falls back to the
/// built-in definition with the same ID.
///
/// # Example
/// ```no_run
/// use studyqa_prompt::load_prompt;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(None, "studyqa.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(prompts_dir: Option<&Path>, prompt_id: &str) -> AppResult<PromptDefinition> {
    if let Some(dir) = prompts_dir {
        let prompt_file = dir.join(format!("{}.yml", prompt_id));
        if prompt_file.exists() {
            tracing::debug!("Loading prompt from: {:?}", prompt_file);

            let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
                AppError::Prompt(format!(
                    "Failed to read prompt file {:?}: {}",
                    prompt_file, e
                ))
            })?;

            let definition = parse_prompt(&contents, &format!("{:?}", prompt_file))?;
            if definition.id != prompt_id {
                return Err(AppError::Prompt(format!(
                    "Prompt file {:?} declares id '{}', expected '{}'",
                    prompt_file, definition.id, prompt_id
                )));
            }

            tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);
            return Ok(definition);
        }
    }

    let (_, yaml) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Prompt not found: {}", prompt_id)))?;

    parse_prompt(yaml, prompt_id)
}

/// List all available prompt IDs: built-ins plus overrides in `prompts_dir`.
pub fn list_prompts(prompts_dir: Option<&Path>) -> AppResult<Vec<String>> {
    let mut prompt_ids: Vec<String> = BUILTIN_PROMPTS
        .iter()
        .map(|(id, _)| id.to_string())
        .collect();

    let Some(dir) = prompts_dir else {
        return Ok(prompt_ids);
    };
    if !dir.exists() {
        return Ok(prompt_ids);
    }

    for entry in walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !prompt_ids.iter().any(|id| id == stem) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

fn parse_prompt(contents: &str, source: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", source, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Validate API version format (simple check)
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    for var in &def.variables {
        if !def.template.contains(&format!("{{{{{}}}}}", var)) {
            return Err(AppError::Prompt(format!(
                "Prompt {} declares variable '{}' but its template never uses it",
                def.id, var
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptRole;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, body: &str) {
        fs::write(dir.join(format!("{}.yml", id)), body).unwrap();
    }

    fn override_yaml(id: &str) -> String {
        format!(
            r#"
id: {}
title: "Override"
apiVersion: "1.0"
role: system
behavior:
  tone: academic
  style: terse
variables:
  - context
template: "Only use: {{{{context}}}}"
output:
  format: text
"#,
            id
        )
    }

    #[test]
    fn test_builtin_prompts_load() {
        let answer = load_prompt(None, "studyqa.answer").unwrap();
        assert_eq!(answer.role, PromptRole::System);
        assert!(answer.template.contains("{{context}}"));
        assert!(answer.template.contains("<study information>"));

        let rephrase = load_prompt(None, "studyqa.rephrase").unwrap();
        assert_eq!(rephrase.role, PromptRole::Human);
        assert!(rephrase.template.ends_with("Standalone Question:"));
    }

    #[test]
    fn test_override_wins_over_builtin() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "studyqa.answer", &override_yaml("studyqa.answer"));

        let prompt = load_prompt(Some(temp_dir.path()), "studyqa.answer").unwrap();
        assert_eq!(prompt.title, "Override");
    }

    #[test]
    fn test_missing_override_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(Some(temp_dir.path()), "studyqa.rephrase").unwrap();
        assert_eq!(prompt.id, "studyqa.rephrase");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        assert!(load_prompt(None, "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "studyqa.answer", "invalid: yaml: content:");

        let result = load_prompt(Some(temp_dir.path()), "studyqa.answer");
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_mismatched_id_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "studyqa.answer", &override_yaml("other.id"));

        assert!(load_prompt(Some(temp_dir.path()), "studyqa.answer").is_err());
    }

    #[test]
    fn test_unused_variable_rejected() {
        let yaml = r#"
id: bad
title: Bad
apiVersion: "1.0"
behavior:
  tone: neutral
  style: concise
variables:
  - context
template: "no placeholders here"
output:
  format: text
"#;
        assert!(parse_prompt(yaml, "inline").is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "custom.extra", &override_yaml("custom.extra"));
        write_prompt(temp_dir.path(), "studyqa.answer", &override_yaml("studyqa.answer"));

        let prompts = list_prompts(Some(temp_dir.path())).unwrap();
        assert_eq!(
            prompts,
            vec!["custom.extra", "studyqa.answer", "studyqa.rephrase"]
        );
    }
}
