//! CLI command execution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use multiplex::config::{self, Project, DEFAULT_FILENAMES};
use multiplex::{CommandSpec, EnvMode, MultiplexCommand, Observer};
use tokio::signal;

use super::args::{Cli, Commands};
use super::printer::LinePrinter;

/// Execute the parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run { config, names } => {
            let path = resolve_config(config)?;
            let project = config::load_from_path(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?
                .select(&names)?;
            run_project(project).await
        }
        Commands::Exec {
            supervise,
            inherit_env,
            name,
            argv,
        } => {
            let env_mode = if inherit_env {
                EnvMode::Inherit
            } else {
                EnvMode::Replace
            };
            let spec = CommandSpec::new(argv)
                .env_mode(env_mode)
                .supervise(supervise);
            let name = name
                .or_else(|| spec.program().map(program_label))
                .unwrap_or_else(|| "exec".to_owned());

            let mut project = Project {
                commands: Default::default(),
            };
            project.commands.insert(name, spec);
            run_project(project).await
        }
    }
}

fn resolve_config(config: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = config {
        return Ok(path);
    }
    for filename in DEFAULT_FILENAMES {
        let path = Path::new(filename);
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }
    bail!(
        "No project file found (looked for {}). Pass one with --config.",
        DEFAULT_FILENAMES.join(", ")
    );
}

/// Last path component of a program, used as its default label.
fn program_label(program: &str) -> String {
    Path::new(program)
        .file_name()
        .map_or_else(|| program.to_owned(), |n| n.to_string_lossy().into_owned())
}

async fn run_project(project: Project) -> Result<()> {
    let mut observer = Observer::new();
    for (name, spec) in project.commands {
        tracing::debug!(%name, argv = ?spec.argv, supervise = spec.supervise, "registering");
        let command: Arc<dyn MultiplexCommand> = Arc::new(spec);
        observer.listen_with(command, LinePrinter::stdio(&name));
    }

    tokio::select! {
        result = observer.run() => {
            match result {
                Ok(never) => match never {},
                Err(err) => Err(err).context("Multiplexing stopped"),
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Ctrl+C: stopping all commands");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_label() {
        assert_eq!(program_label("/usr/bin/python3"), "python3");
        assert_eq!(program_label("sh"), "sh");
    }

    #[test]
    fn test_resolve_explicit_config() {
        let path = resolve_config(Some(PathBuf::from("custom.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("custom.toml"));
    }
}
