//! Plain-data command descriptor with a builder API.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{EnvMode, MultiplexCommand};

/// A command to multiplex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Program followed by its arguments.
    pub argv: Vec<String>,

    /// Environment variables for the child.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Whether `env` replaces or extends the inherited environment.
    #[serde(default)]
    pub env_mode: EnvMode,

    /// Working directory for the child.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Respawn the command whenever it exits.
    #[serde(default)]
    pub supervise: bool,
}

impl CommandSpec {
    /// Create a command from a program and its arguments.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set multiple environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    pub const fn env_mode(mut self, mode: EnvMode) -> Self {
        self.env_mode = mode;
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Enable or disable respawn-on-exit.
    pub const fn supervise(mut self, enabled: bool) -> Self {
        self.supervise = enabled;
        self
    }

    /// The program name, if any.
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}

impl MultiplexCommand for CommandSpec {
    fn argv(&self) -> &[String] {
        &self.argv
    }

    fn environment(&self) -> &HashMap<String, String> {
        &self.env
    }

    fn env_mode(&self) -> EnvMode {
        self.env_mode
    }

    fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn supervision_enabled(&self) -> bool {
        self.supervise
    }
}
