//! Test runner implementation
//!
//! Walks the discovery set in order, runs every selected definition through
//! the executor one at a time, and relays the captured output line by line.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::config::Config;
use crate::common::{Error, Result};

use super::definition::DefinitionRecord;
use super::discovery::{discover, DiscoveryPattern};
use super::executor::{Executor, Invocation};

/// Separator between output records produced by pfish
pub const LINE_SEPARATOR: &str = "\r\n";

/// Settings for a single run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    pub pattern: DiscoveryPattern,
    pub sort: bool,
    pub name_prefix: String,
    pub categories: Vec<String>,
    pub keep_going: bool,
}

impl RunOptions {
    /// Build run options from a loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            root: config.discovery.root.clone(),
            pattern: DiscoveryPattern::parse(&config.discovery.pattern)?,
            sort: config.discovery.sort,
            name_prefix: config.run.name_prefix.clone(),
            categories: config.run.categories.clone(),
            keep_going: config.run.keep_going,
        })
    }

    /// Options for `root` with every other setting at its default
    pub fn for_root(root: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.discovery.root = root.into();
        Self::from_config(&config)
    }
}

/// What the runner will do with a parsed record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The record is sent to the executor
    Run,
    /// The name does not carry the test prefix
    NotATest,
    /// The category is outside the requested set
    CategoryExcluded,
}

impl Selection {
    /// Decide whether a record should be executed
    pub fn of(record: &DefinitionRecord, options: &RunOptions) -> Self {
        if !record.is_test(&options.name_prefix) {
            Selection::NotATest
        } else if !options.categories.is_empty()
            && !options.categories.iter().any(|c| *c == record.category)
        {
            Selection::CategoryExcluded
        } else {
            Selection::Run
        }
    }
}

/// Counts collected over one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub skipped: usize,
    pub executed: usize,
    pub failed: usize,
}

/// A discovered definition and what a run would do with it
#[derive(Debug)]
pub struct PlanEntry {
    pub path: PathBuf,
    pub record: std::result::Result<DefinitionRecord, String>,
    pub selection: Option<Selection>,
}

/// Discover and classify definitions without executing anything
///
/// Unparseable definitions are reported in the entry rather than aborting.
pub fn plan(options: &RunOptions) -> Result<Vec<PlanEntry>> {
    let paths = discover(&options.root, &options.pattern, options.sort)?;
    Ok(paths
        .into_iter()
        .map(|path| match DefinitionRecord::load(&path) {
            Ok(record) => PlanEntry {
                selection: Some(Selection::of(&record, options)),
                record: Ok(record),
                path,
            },
            Err(e) => PlanEntry {
                path,
                record: Err(e.to_string()),
                selection: None,
            },
        })
        .collect())
}

/// Split captured executor output into lines
///
/// Splits only on the exact CRLF sequence. A bare LF stays inside the line
/// and a trailing CRLF yields a final empty line.
pub fn split_output(text: &str) -> std::str::Split<'_, &'static str> {
    text.split(LINE_SEPARATOR)
}

/// Runs discovered definitions through an executor
pub struct Runner<E> {
    executor: E,
    options: RunOptions,
}

impl<E: Executor> Runner<E> {
    pub fn new(executor: E, options: RunOptions) -> Self {
        Self { executor, options }
    }

    /// Run every selected definition, writing relayed output to `out`
    ///
    /// The first failure aborts the run unless keep-going mode is on, in
    /// which case per-record failures are counted and reported at the end.
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<RunSummary> {
        let paths = discover(&self.options.root, &self.options.pattern, self.options.sort)?;
        let mut summary = RunSummary {
            discovered: paths.len(),
            ..RunSummary::default()
        };

        if paths.is_empty() {
            tracing::warn!(
                "No definitions matching {} under {}",
                self.options.pattern,
                self.options.root.display()
            );
        }

        for path in &paths {
            match self.run_one(path, out).await {
                Ok(Selection::Run) => summary.executed += 1,
                Ok(_) => summary.skipped += 1,
                Err(e) if self.options.keep_going && e.is_per_record() => {
                    tracing::error!("{}", e);
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            discovered = summary.discovered,
            executed = summary.executed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Run finished"
        );

        if summary.failed > 0 {
            return Err(Error::RunFailed {
                failed: summary.failed,
                total: summary.discovered,
            });
        }
        Ok(summary)
    }

    async fn run_one<W: Write>(&self, path: &Path, out: &mut W) -> Result<Selection> {
        let record = DefinitionRecord::load(path)?;

        let selection = Selection::of(&record, &self.options);
        if selection != Selection::Run {
            tracing::debug!("Skipping {} ({:?})", record.name, selection);
            return Ok(selection);
        }

        let invocation = Invocation::for_record(&record);
        let stdout = self.executor.execute(&invocation).await?;
        let text = String::from_utf8(stdout).map_err(|e| Error::OutputDecode {
            name: record.name.clone(),
            source: e,
        })?;

        for line in split_output(&text) {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;

        Ok(Selection::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::ExecutorConfig;
    use crate::testing::PfishExecutor;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;

    /// Scripted response for a test name
    enum Reply {
        Output(&'static [u8]),
        #[cfg(unix)]
        Exit(i32),
    }

    /// Executor fake that records invocations
    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<Invocation>>,
        replies: HashMap<String, Reply>,
    }

    impl RecordingExecutor {
        fn reply(mut self, name: &str, reply: Reply) -> Self {
            self.replies.insert(name.to_string(), reply);
            self
        }

        fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Executor for RecordingExecutor {
        async fn execute(&self, invocation: &Invocation) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(invocation.clone());
            match self.replies.get(&invocation.name) {
                Some(Reply::Output(bytes)) => Ok(bytes.to_vec()),
                #[cfg(unix)]
                Some(Reply::Exit(code)) => {
                    use std::os::unix::process::ExitStatusExt;
                    Err(Error::Execution {
                        name: invocation.name.clone(),
                        category: invocation.category.clone(),
                        status: std::process::ExitStatus::from_raw(code << 8),
                    })
                }
                None => Ok(format!("ran {}", invocation.name).into_bytes()),
            }
        }
    }

    /// Write `category_dir/operation_types/<op>/definition.json`
    fn write_definition(root: &Path, category_dir: &str, op: &str, body: &str) {
        let dir = root.join(category_dir).join("operation_types").join(op);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("definition.json"), body).unwrap();
    }

    fn record_json(name: &str, category: &str) -> String {
        serde_json::json!({ "name": name, "category": category }).to_string()
    }

    fn sorted_options(root: &Path) -> RunOptions {
        let mut options = RunOptions::for_root(root).unwrap();
        options.sort = true;
        options
    }

    fn inv(category: &str, name: &str) -> Invocation {
        Invocation {
            category: category.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_split_output_on_crlf_only() {
        assert_eq!(split_output("a\r\nb\r\nc").collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(split_output("a\nb").collect::<Vec<_>>(), vec!["a\nb"]);
        assert_eq!(split_output("a\r\n").collect::<Vec<_>>(), vec!["a", ""]);
        assert_eq!(split_output("").collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn test_selection() {
        let mut options = RunOptions::for_root(".").unwrap();
        let record = |name: &str, category: &str| DefinitionRecord {
            name: name.to_string(),
            category: category.to_string(),
        };

        assert_eq!(Selection::of(&record("TestFoo", "c1"), &options), Selection::Run);
        assert_eq!(Selection::of(&record("Bar", "c1"), &options), Selection::NotATest);

        options.categories = vec!["c2".to_string()];
        assert_eq!(
            Selection::of(&record("TestFoo", "c1"), &options),
            Selection::CategoryExcluded
        );
        assert_eq!(Selection::of(&record("TestFoo", "c2"), &options), Selection::Run);
        assert_eq!(Selection::of(&record("Bar", "c2"), &options), Selection::NotATest);
    }

    #[tokio::test]
    async fn test_only_test_prefixed_records_run() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "test_foo", &record_json("TestFoo", "c1"));
        write_definition(dir.path(), "b", "bar", &record_json("Bar", "c2"));

        let executor = RecordingExecutor::default();
        let runner = Runner::new(executor, sorted_options(dir.path()));
        let mut out = Vec::new();
        let summary = runner.run(&mut out).await.unwrap();

        assert_eq!(runner.executor.calls(), vec![inv("c1", "TestFoo")]);
        assert_eq!(
            summary,
            RunSummary {
                discovered: 2,
                skipped: 1,
                executed: 1,
                failed: 0,
            }
        );
        assert_eq!(String::from_utf8(out).unwrap(), "ran TestFoo\n");
    }

    #[tokio::test]
    async fn test_output_follows_discovery_then_line_order() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "one", &record_json("TestOne", "c"));
        write_definition(dir.path(), "b", "two", &record_json("TestTwo", "c"));

        let executor = RecordingExecutor::default()
            .reply("TestOne", Reply::Output(b"1a\r\n1b"))
            .reply("TestTwo", Reply::Output(b"2a\r\n2b\nstill 2b"));
        let runner = Runner::new(executor, sorted_options(dir.path()));
        let mut out = Vec::new();
        runner.run(&mut out).await.unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1a\n1b\n2a\n2b\nstill 2b\n"
        );
    }

    #[tokio::test]
    async fn test_values_pass_through_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(
            dir.path(),
            "a",
            "quoted",
            &record_json("Test 'quoted'; echo $HOME", "Cat \"x\" & y"),
        );

        let runner = Runner::new(RecordingExecutor::default(), sorted_options(dir.path()));
        runner.run(&mut Vec::new()).await.unwrap();

        assert_eq!(
            runner.executor.calls(),
            vec![inv("Cat \"x\" & y", "Test 'quoted'; echo $HOME")]
        );
    }

    #[tokio::test]
    async fn test_malformed_definition_halts_run() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "first", &record_json("TestFirst", "c"));
        write_definition(dir.path(), "b", "broken", "{ \"name\": ");
        write_definition(dir.path(), "c", "last", &record_json("TestLast", "c"));

        let runner = Runner::new(RecordingExecutor::default(), sorted_options(dir.path()));
        let mut out = Vec::new();
        let err = runner.run(&mut out).await.unwrap_err();

        assert!(matches!(err, Error::Parse { .. }));
        assert_eq!(runner.executor.calls(), vec![inv("c", "TestFirst")]);
        assert_eq!(String::from_utf8(out).unwrap(), "ran TestFirst\n");
    }

    #[tokio::test]
    async fn test_missing_field_halts_run() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "nameless", r#"{"category": "c"}"#);
        write_definition(dir.path(), "b", "later", &record_json("TestLater", "c"));

        let runner = Runner::new(RecordingExecutor::default(), sorted_options(dir.path()));
        let err = runner.run(&mut Vec::new()).await.unwrap_err();

        assert!(matches!(err, Error::Parse { .. }));
        assert!(runner.executor.calls().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_execution_halts_run() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "fails", &record_json("TestFails", "c"));
        write_definition(dir.path(), "b", "after", &record_json("TestAfter", "c"));

        let executor = RecordingExecutor::default().reply("TestFails", Reply::Exit(1));
        let runner = Runner::new(executor, sorted_options(dir.path()));
        let mut out = Vec::new();
        let err = runner.run(&mut out).await.unwrap_err();

        match err {
            Error::Execution { name, status, .. } => {
                assert_eq!(name, "TestFails");
                assert_eq!(status.code(), Some(1));
            }
            other => panic!("Expected Execution error, got {other:?}"),
        }
        assert_eq!(runner.executor.calls(), vec![inv("c", "TestFails")]);
        assert!(out.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_keep_going_runs_everything_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "fails", &record_json("TestFails", "c"));
        write_definition(dir.path(), "b", "broken", "not json");
        write_definition(dir.path(), "c", "ok", &record_json("TestOk", "c"));

        let executor = RecordingExecutor::default().reply("TestFails", Reply::Exit(2));
        let mut options = sorted_options(dir.path());
        options.keep_going = true;
        let runner = Runner::new(executor, options);
        let mut out = Vec::new();
        let err = runner.run(&mut out).await.unwrap_err();

        assert!(matches!(err, Error::RunFailed { failed: 2, total: 3 }));
        assert_eq!(
            runner.executor.calls(),
            vec![inv("c", "TestFails"), inv("c", "TestOk")]
        );
        assert_eq!(String::from_utf8(out).unwrap(), "ran TestOk\n");
    }

    fn missing_program_executor() -> PfishExecutor {
        let config = ExecutorConfig {
            program: "./no/such/pfish".to_string(),
            ..ExecutorConfig::default()
        };
        PfishExecutor::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_spawn_failure_halts_run() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "one", &record_json("TestOne", "c"));
        write_definition(dir.path(), "b", "two", &record_json("TestTwo", "c"));

        let runner = Runner::new(missing_program_executor(), sorted_options(dir.path()));
        let err = runner.run(&mut Vec::new()).await.unwrap_err();

        match err {
            Error::ExecutorSpawn { program, .. } => assert_eq!(program, "./no/such/pfish"),
            other => panic!("Expected ExecutorSpawn error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_keep_going_counts_spawn_failures() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "one", &record_json("TestOne", "c"));
        write_definition(dir.path(), "b", "two", &record_json("TestTwo", "c"));

        let mut options = sorted_options(dir.path());
        options.keep_going = true;
        let runner = Runner::new(missing_program_executor(), options);
        let err = runner.run(&mut Vec::new()).await.unwrap_err();

        assert!(
            matches!(err, Error::RunFailed { failed: 2, total: 2 }),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_output() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "bytes", &record_json("TestBytes", "c"));

        let executor = RecordingExecutor::default().reply("TestBytes", Reply::Output(b"\xff\xfe"));
        let runner = Runner::new(executor, sorted_options(dir.path()));
        let err = runner.run(&mut Vec::new()).await.unwrap_err();

        assert!(matches!(err, Error::OutputDecode { .. }));
    }

    #[tokio::test]
    async fn test_category_filter() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "one", &record_json("TestOne", "pcr"));
        write_definition(dir.path(), "b", "two", &record_json("TestTwo", "plates"));

        let mut options = sorted_options(dir.path());
        options.categories = vec!["plates".to_string()];
        let runner = Runner::new(RecordingExecutor::default(), options);
        let summary = runner.run(&mut Vec::new()).await.unwrap();

        assert_eq!(runner.executor.calls(), vec![inv("plates", "TestTwo")]);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_empty_discovery_set_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new(RecordingExecutor::default(), sorted_options(dir.path()));
        let summary = runner.run(&mut Vec::new()).await.unwrap();
        assert_eq!(summary, RunSummary::default());
    }

    #[test]
    fn test_plan_reports_invalid_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "a", "broken", "[]");
        write_definition(dir.path(), "b", "demo", &record_json("DemoThing", "c"));
        write_definition(dir.path(), "c", "test", &record_json("TestThing", "c"));

        let entries = plan(&sorted_options(dir.path())).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].record.is_err());
        assert_eq!(entries[0].selection, None);
        assert_eq!(entries[1].selection, Some(Selection::NotATest));
        assert_eq!(entries[2].selection, Some(Selection::Run));
    }
}
