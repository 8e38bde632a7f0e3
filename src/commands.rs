//! CLI command definitions
//!
//! Defines the clap commands and global options for the pfish runner.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::Config;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run every test definition through pfish (default)
    Run,

    /// List discovered definitions and whether they would run
    List {
        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Options shared by every command
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Directory the discovery pattern is expanded against
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Discovery pattern (default: */operation_types/*/definition.json)
    #[arg(long, global = true)]
    pub pattern: Option<String>,

    /// Executor program name or path (default: pfish)
    #[arg(long, global = true)]
    pub executor: Option<String>,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only run definitions in this category
    /// Can be specified multiple times: --category "PCR Libs" --category Kits
    #[arg(long = "category", short = 'c', global = true)]
    pub categories: Vec<String>,

    /// Keep running after a failed definition and fail at the end
    #[arg(long, global = true)]
    pub keep_going: bool,

    /// Process definitions in sorted path order
    #[arg(long, global = true)]
    pub sort: bool,

    /// Verbose logging (ignored when RUST_LOG is set)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Override configuration values with the ones given on the command line
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.discovery.root = root.clone();
        }
        if let Some(pattern) = &self.pattern {
            config.discovery.pattern = pattern.clone();
        }
        if self.sort {
            config.discovery.sort = true;
        }
        if let Some(executor) = &self.executor {
            config.executor.program = executor.clone();
        }
        if !self.categories.is_empty() {
            config.run.categories = self.categories.clone();
        }
        if self.keep_going {
            config.run.keep_going = true;
        }
    }
}
