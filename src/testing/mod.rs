//! Operation type test runner
//!
//! Discovers `definition.json` files, selects the ones whose name marks them
//! as tests, and runs each through pfish in discovery order, relaying the
//! tool's output to stdout.

mod definition;
mod discovery;
mod executor;
mod runner;

pub use definition::DefinitionRecord;
pub use discovery::{discover, DiscoveryPattern};
pub use executor::{Executor, Invocation, PfishExecutor};
pub use runner::{plan, split_output, PlanEntry, RunOptions, RunSummary, Runner, Selection};
