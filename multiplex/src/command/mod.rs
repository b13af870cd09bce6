//! Command descriptors: what to run, with which environment, and whether to
//! respawn it when it exits.

mod spec;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::process::Process;

pub use spec::CommandSpec;

/// How a command's environment mapping reaches the child.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvMode {
    /// The mapping is the child's entire environment.
    #[default]
    Replace,
    /// The mapping is layered over the parent's environment.
    Inherit,
}

/// Describes a child to spawn.
///
/// Implementors are immutable data plus a factory for [`Process`]es bound to
/// them. Enabling supervision respawns the command on every exit with no
/// delay and no limit, so a command that exits immediately will be restarted
/// on every loop iteration.
pub trait MultiplexCommand: Send + Sync {
    /// Program followed by its arguments. Must not be empty.
    fn argv(&self) -> &[String];

    /// Environment supplied to the child.
    fn environment(&self) -> &HashMap<String, String>;

    fn env_mode(&self) -> EnvMode {
        EnvMode::Replace
    }

    /// Working directory; `None` means the caller's current directory.
    fn working_dir(&self) -> Option<&Path> {
        None
    }

    /// Respawn whenever the process terminates.
    fn supervision_enabled(&self) -> bool;

    /// A fresh, not yet created process for this command.
    fn new_process(&self) -> Process {
        Process::for_command(self)
    }
}
