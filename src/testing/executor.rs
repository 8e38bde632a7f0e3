//! External executor invocation
//!
//! Runs `pfish test -c <category> -o <name>` as an argument vector, so record
//! values reach the executor verbatim and are never interpreted by a shell.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::common::config::ExecutorConfig;
use crate::common::{Error, Result};

use super::definition::DefinitionRecord;

/// A single executor call for one definition record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub category: String,
    pub name: String,
}

impl Invocation {
    /// Build the invocation for a record
    pub fn for_record(record: &DefinitionRecord) -> Self {
        Self {
            category: record.category.clone(),
            name: record.name.clone(),
        }
    }

    /// Arguments following the subcommand
    pub fn args(&self) -> [&str; 4] {
        ["-c", self.category.as_str(), "-o", self.name.as_str()]
    }
}

/// Something that can run a test invocation and capture its stdout
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run the invocation to completion and return its captured stdout
    ///
    /// A non-zero exit must be reported as `Error::Execution`.
    async fn execute(&self, invocation: &Invocation) -> Result<Vec<u8>>;
}

/// The `pfish` command-line tool
#[derive(Debug, Clone)]
pub struct PfishExecutor {
    program: PathBuf,
    subcommand: String,
    leading_args: Vec<String>,
}

impl PfishExecutor {
    /// Resolve the configured program and build an executor
    ///
    /// Bare names are looked up on PATH; anything containing a path
    /// separator is used as given.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        let program = resolve_program(&config.program)?;
        tracing::debug!("Using executor {}", program.display());
        Ok(Self {
            program,
            subcommand: config.subcommand.clone(),
            leading_args: config.args.clone(),
        })
    }

    /// Path of the resolved program
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg(&self.subcommand)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Executor for PfishExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<Vec<u8>> {
        tracing::info!(
            category = %invocation.category,
            name = %invocation.name,
            "Running {} {}",
            self.program.display(),
            self.subcommand
        );

        let output = self
            .command(invocation)
            .output()
            .await
            .map_err(|e| Error::ExecutorSpawn {
                program: self.program.display().to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(Error::Execution {
                name: invocation.name.clone(),
                category: invocation.category.clone(),
                status: output.status,
            });
        }

        Ok(output.stdout)
    }
}

fn resolve_program(program: &str) -> Result<PathBuf> {
    let path = PathBuf::from(program);
    if path.components().count() > 1 {
        return Ok(path);
    }
    which::which(program).map_err(|_| Error::ExecutorNotFound {
        program: program.to_string(),
    })
}
