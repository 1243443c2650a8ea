//! The system instruction sent ahead of every model call.
//!
//! The text is a versioned template (`prompts/system_v1.md`) with
//! `{{placeholder}}` slots filled from configuration. It encodes the
//! path-resolution procedure: after a not-found result the model lists files
//! and retries only on a unique filename match. A replacement template can be
//! supplied through `agent.instructions_path`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use gitscribe_config::AppConfig;
use gitscribe_repository::FILE_NOT_FOUND_MARKER;
use gitscribe_tools::names;
use thiserror::Error;

/// The embedded instruction template.
pub const SYSTEM_V1: &str = include_str!("../prompts/system_v1.md");

/// Layout category rendered last, as the catch-all directory.
const DEFAULT_CATEGORY: &str = "default";

#[derive(Debug, Error)]
pub enum InstructionError {
    #[error("Failed to read instruction template {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Instruction template has unresolved placeholder '{{{{{0}}}}}'")]
    UnresolvedPlaceholder(String),

    #[error("Instruction template never quotes the file-not-found marker")]
    MissingMarker,
}

/// Values substituted into the template.
#[derive(Debug, Clone)]
pub struct InstructionParams {
    pub repository: String,
    pub branch: String,
    /// Category → directory for new structured files
    pub directories: BTreeMap<String, String>,
    pub template_path: String,
}

impl InstructionParams {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            repository: config.repository.name.clone().unwrap_or_default(),
            branch: config.repository.branch.clone(),
            directories: config.layout.directories.clone(),
            template_path: config.layout.template_path.clone(),
        }
    }

    fn directory_structure(&self) -> String {
        let mut lines: Vec<String> = self
            .directories
            .iter()
            .filter(|(category, _)| category.as_str() != DEFAULT_CATEGORY)
            .map(|(category, dir)| format!("      - {} -> `{dir}`", humanize(category)))
            .collect();
        if let Some(dir) = self.directories.get(DEFAULT_CATEGORY) {
            lines.push(format!("      - anything else -> `{dir}`"));
        }
        lines.join("\n")
    }

    fn substitutions(&self) -> Vec<(&'static str, String)> {
        vec![
            ("repository", self.repository.clone()),
            ("branch", self.branch.clone()),
            ("directory_structure", self.directory_structure()),
            ("template_path", self.template_path.clone()),
            ("not_found_marker", FILE_NOT_FOUND_MARKER.to_string()),
            ("list_files", names::LIST_FILES.to_string()),
            ("read_file", names::READ_FILE.to_string()),
            ("write_file", names::WRITE_FILE.to_string()),
            ("replace_line", names::REPLACE_LINE.to_string()),
        ]
    }
}

/// A rendered system instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInstruction {
    text: String,
}

impl SystemInstruction {
    /// Fill `template` with `params`.
    ///
    /// Fails if any `{{name}}` slot is left over or the result does not
    /// quote the not-found marker the recovery procedure depends on.
    pub fn render(template: &str, params: &InstructionParams) -> Result<Self, InstructionError> {
        let mut text = template.to_string();
        for (key, value) in params.substitutions() {
            text = text.replace(&format!("{{{{{key}}}}}"), &value);
        }

        if let Some(start) = text.find("{{") {
            let rest = &text[start + 2..];
            let name = rest.split("}}").next().unwrap_or(rest);
            return Err(InstructionError::UnresolvedPlaceholder(name.to_string()));
        }
        if !text.contains(FILE_NOT_FOUND_MARKER) {
            return Err(InstructionError::MissingMarker);
        }
        Ok(Self { text })
    }

    /// Render the configured template, or the embedded one.
    pub fn from_config(config: &AppConfig) -> Result<Self, InstructionError> {
        let params = InstructionParams::from_config(config);
        match &config.agent.instructions_path {
            Some(path) => {
                let template =
                    std::fs::read_to_string(path).map_err(|source| InstructionError::Read {
                        path: path.clone(),
                        source,
                    })?;
                tracing::info!(path = %path.display(), "Using custom instruction template");
                Self::render(&template, &params)
            }
            None => Self::render(SYSTEM_V1, &params),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for SystemInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

fn humanize(category: &str) -> String {
    let spaced = category.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn params() -> InstructionParams {
        let mut config = AppConfig::default();
        config.repository.name = Some("acme/formulas".into());
        config.repository.branch = "dev".into();
        InstructionParams::from_config(&config)
    }

    #[test]
    fn embedded_template_renders_completely() {
        let instruction = SystemInstruction::render(SYSTEM_V1, &params()).unwrap();
        let text = instruction.as_str();

        assert!(text.contains("acme/formulas"));
        assert!(text.contains("branch dev"));
        assert!(text.contains(FILE_NOT_FOUND_MARKER));
        assert!(text.contains("read_file(file_path='base_template.md')"));
        assert!(!text.contains("{{"));
    }

    #[test]
    fn names_every_tool() {
        let instruction = SystemInstruction::render(SYSTEM_V1, &params()).unwrap();
        for name in [names::LIST_FILES, names::READ_FILE, names::WRITE_FILE, names::REPLACE_LINE] {
            assert!(instruction.as_str().contains(name), "missing tool {name}");
        }
    }

    #[test]
    fn directory_structure_lists_default_last() {
        let rendered = params().directory_structure();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.contains(&"      - Ingredient -> `docs/ingredients`"));
        assert!(lines.contains(&"      - Test result -> `data/results`"));
        assert_eq!(lines[3], "      - anything else -> `docs`");
    }

    #[test]
    fn unresolved_placeholder_rejected() {
        let err = SystemInstruction::render(
            "Repo {{repository}} {{mystery}} Error: File not found",
            &params(),
        )
        .unwrap_err();
        assert!(matches!(err, InstructionError::UnresolvedPlaceholder(name) if name == "mystery"));
    }

    #[test]
    fn template_without_marker_rejected() {
        let err = SystemInstruction::render("Manage {{repository}}.", &params()).unwrap_err();
        assert!(matches!(err, InstructionError::MissingMarker));
    }

    #[test]
    fn custom_template_from_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Only {{{{repository}}}}. On '{{{{not_found_marker}}}}' list files.").unwrap();

        let mut config = AppConfig::default();
        config.repository.name = Some("acme/formulas".into());
        config.agent.instructions_path = Some(file.path().to_path_buf());

        let instruction = SystemInstruction::from_config(&config).unwrap();
        assert_eq!(
            instruction.as_str().trim(),
            "Only acme/formulas. On 'Error: File not found' list files."
        );
    }

    #[test]
    fn missing_custom_template_is_read_error() {
        let mut config = AppConfig::default();
        config.agent.instructions_path = Some("/nonexistent/gitscribe/prompt.md".into());
        assert!(matches!(
            SystemInstruction::from_config(&config),
            Err(InstructionError::Read { .. })
        ));
    }
}
