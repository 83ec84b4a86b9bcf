//! Step execution.
//!
//! The installer hands each recipe's opaque install payload to a
//! [`StepExecutor`]. [`TaskExecutor`] renders the payload to a temporary
//! taskfile and runs the external `task` runner against it. Variables reach
//! the runner through its environment, never its command line.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::recipe::InstallSteps;

use super::variables::VariableSet;

/// Default runner binary, resolved through `PATH`.
pub const DEFAULT_TASK_BINARY: &str = "task";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to render install steps: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("failed to write taskfile: {0}")]
    Taskfile(#[source] std::io::Error),

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("install steps exited with {status}")]
    Failed { status: String },

    #[error("execution cancelled")]
    Cancelled,
}

/// Everything an executor needs to run one recipe.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub recipe: String,
    pub install_steps: InstallSteps,
    pub variables: VariableSet,
}

pub trait StepExecutor {
    fn run(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<(), ExecutionError>;
}

/// Runs install steps through the `task` runner.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    program: PathBuf,
}

impl Default for TaskExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_BINARY)
    }
}

impl TaskExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, taskfile: &Path, variables: &VariableSet) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--taskfile")
            .arg(taskfile)
            .envs(variables.iter())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command
    }
}

impl StepExecutor for TaskExecutor {
    fn run(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<(), ExecutionError> {
        if cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }

        let yaml = request.install_steps.to_yaml_string()?;
        let mut taskfile = tempfile::Builder::new()
            .prefix(&format!("{}-", request.recipe))
            .suffix(".yml")
            .tempfile()
            .map_err(ExecutionError::Taskfile)?;
        taskfile
            .write_all(yaml.as_bytes())
            .and_then(|_| taskfile.flush())
            .map_err(ExecutionError::Taskfile)?;

        let program = self.program.display().to_string();
        debug!(recipe = %request.recipe, taskfile = %taskfile.path().display(), "running install steps");

        let mut child = self
            .command(taskfile.path(), &request.variables)
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                program: program.clone(),
                source,
            })?;

        loop {
            if cancel.is_cancelled() {
                warn!(recipe = %request.recipe, "cancelling running install steps");
                if let Err(e) = child.kill() {
                    debug!(error = %e, "child already exited");
                }
                if let Err(e) = child.wait() {
                    debug!(error = %e, "failed to reap cancelled child");
                }
                return Err(ExecutionError::Cancelled);
            }

            match child.try_wait() {
                Ok(Some(status)) if status.success() => {
                    info!(recipe = %request.recipe, "install steps completed");
                    return Ok(());
                }
                Ok(Some(status)) => {
                    return Err(ExecutionError::Failed {
                        status: status.to_string(),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => return Err(ExecutionError::Wait { program, source }),
            }
        }
    }
}
