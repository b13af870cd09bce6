//! Project files listing the commands to multiplex.
//!
//! ```toml
//! [commands.web]
//! argv = ["python3", "-m", "http.server"]
//! env = { PORT = "8000" }
//! env_mode = "inherit"
//! supervise = true
//!
//! [commands.worker]
//! argv = ["./worker.sh"]
//! cwd = "scripts"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::command::CommandSpec;

/// File names probed when no project file is given.
pub const DEFAULT_FILENAMES: &[&str] = &["multiplex.toml", "multiplex.json"];

/// Error type for configuration parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation error(s): {0}")]
    Validation(String),
}

/// A validated project: named commands in name order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawProject")]
pub struct Project {
    pub commands: BTreeMap<String, CommandSpec>,
}

impl Project {
    /// Keep only the named commands; an empty list keeps everything.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::Validation` naming the first unknown command.
    pub fn select(mut self, names: &[String]) -> Result<Self, ConfigError> {
        if names.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = names.iter().find(|n| !self.commands.contains_key(*n)) {
            return Err(ConfigError::Validation(format!(
                "command `{unknown}` not found"
            )));
        }
        self.commands.retain(|name, _| names.contains(name));
        Ok(self)
    }
}

#[derive(Deserialize)]
struct RawProject {
    #[serde(default)]
    commands: BTreeMap<String, CommandSpec>,
}

impl TryFrom<RawProject> for Project {
    type Error = ConfigError;

    fn try_from(raw: RawProject) -> Result<Self, Self::Error> {
        if raw.commands.is_empty() {
            return Err(ConfigError::Validation("no commands defined".into()));
        }
        for (name, spec) in &raw.commands {
            if spec.argv.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "command `{name}`: argv is empty"
                )));
            }
            if spec.argv.iter().any(|arg| arg.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "command `{name}`: argv contains empty element"
                )));
            }
        }
        Ok(Self {
            commands: raw.commands,
        })
    }
}

/// Load a project from a file path.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read or parsed.
pub fn load_from_path(path: &Path) -> Result<Project, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse_auto(&text, path)
}

/// Parse a project, picking the format from the file extension.
///
/// # Errors
///
/// Returns a `ConfigError` for unknown extensions or invalid content.
pub fn parse_auto(text: &str, path: &Path) -> Result<Project, ConfigError> {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    match ext {
        "toml" => parse_toml(text),
        "json" => parse_json(text),
        _ => Err(ConfigError::Validation(format!(
            "unknown config extension `{ext}`"
        ))),
    }
}

/// Parse a TOML project.
///
/// # Errors
///
/// Returns a `ConfigError` if the text is not a valid project.
pub fn parse_toml(text: &str) -> Result<Project, ConfigError> {
    let raw = toml::from_str::<RawProject>(text)?;
    raw.try_into()
}

/// Parse a JSON project.
///
/// # Errors
///
/// Returns a `ConfigError` if the text is not a valid project.
pub fn parse_json(text: &str) -> Result<Project, ConfigError> {
    let raw = serde_json::from_str::<RawProject>(text)?;
    raw.try_into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::EnvMode;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn parse_toml_ok() {
        let txt = r#"
            [commands.api]
            argv = ["cargo", "run", "--bin", "api"]
            env = { PORT = "8080" }
            env_mode = "inherit"
            supervise = true

            [commands.db]
            argv = ["postgres", "-D", ".pg"]
            cwd = "/tmp"
        "#;
        let p = parse_toml(txt).unwrap();

        let api = &p.commands["api"];
        assert_eq!(api.argv, vec!["cargo", "run", "--bin", "api"]);
        assert_eq!(api.env["PORT"], "8080");
        assert_eq!(api.env_mode, EnvMode::Inherit);
        assert!(api.supervise);

        let db = &p.commands["db"];
        assert_eq!(db.env_mode, EnvMode::Replace);
        assert!(!db.supervise);
        assert_eq!(db.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn parse_json_ok() {
        let txt = r#"{"commands": {"tick": {"argv": ["sh", "-c", "echo tick"], "supervise": true}}}"#;
        let p = parse_json(txt).unwrap();

        assert_eq!(p.commands.len(), 1);
        assert!(p.commands["tick"].supervise);
    }

    #[test]
    fn test_empty_argv() {
        let err = parse_toml("[commands.bad]\nargv = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("argv is empty")));

        let err = parse_toml("[commands.bad]\nargv = [\"echo\", \" \"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("empty element")));
    }

    #[test]
    fn test_no_commands() {
        assert!(matches!(
            parse_toml("").unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_unknown_field_type() {
        let err = parse_toml("[commands.x]\nargv = \"echo\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_unknown_extension() {
        let err = parse_auto("", Path::new("multiplex.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[commands.echo]\nargv = [\"echo\", \"hi\"]").unwrap();

        let p = load_from_path(file.path()).unwrap();
        assert_eq!(p.commands["echo"].argv, vec!["echo", "hi"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_path(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_select() {
        let txt = r#"
            [commands.a]
            argv = ["true"]
            [commands.b]
            argv = ["true"]
        "#;
        let p = parse_toml(txt).unwrap();

        let only_a = p.clone().select(&["a".to_owned()]).unwrap();
        assert_eq!(only_a.commands.keys().collect::<Vec<_>>(), vec!["a"]);

        let all = p.clone().select(&[]).unwrap();
        assert_eq!(all.commands.len(), 2);

        let err = p.select(&["c".to_owned()]).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("`c`")));
    }
}
