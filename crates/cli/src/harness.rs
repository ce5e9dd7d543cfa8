//! Partition test harness.
//!
//! Loads a dataset, builds range and round-robin layouts, routes inserts and
//! checks every invariant along the way. Which stages run is decided by an
//! explicit [`HarnessConfig`]; there is no global state.

use crate::fixtures;
use anyhow::{bail, ensure, Result};
use partcore::checker::{verify, verify_membership, verify_partition_count, verify_partition_sizes};
use partcore::{
    BulkStore, Error, MemoryStore, PartitionLayout, Partitioner, RangePartitioner,
    RoundRobinPartitioner,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A row to insert after partitioning, and where it is expected to land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertCase {
    pub path: PathBuf,
    /// Expected partition index. For round-robin inserts `None` means
    /// "derive from the number of rows stored so far".
    #[serde(default)]
    pub expected_partition: Option<usize>,
}

impl InsertCase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expected_partition: None,
        }
    }

    #[must_use]
    pub fn expecting(mut self, index: usize) -> Self {
        self.expected_partition = Some(index);
        self
    }
}

/// Configuration for one harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Header file describing the schema.
    pub header_path: PathBuf,
    /// Data file holding the source rows.
    pub data_path: PathBuf,
    /// Requested partition count. Non-positive values expect the build to fail.
    pub partitions: i64,
    /// Range partitioning column.
    pub column: String,
    /// Expected number of source rows, if known.
    pub expected_rows: Option<usize>,
    /// Report the load stage.
    pub load_data: bool,
    /// Run the range partition and insert stages.
    pub range: bool,
    /// Run the round-robin partition and insert stages.
    pub round_robin: bool,
    pub range_prefix: String,
    pub round_robin_prefix: String,
    pub range_inserts: Vec<InsertCase>,
    pub round_robin_inserts: Vec<InsertCase>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            header_path: PathBuf::from("headers.json"),
            data_path: PathBuf::from("data.jsonl"),
            partitions: 5,
            column: "created_utc".to_string(),
            expected_rows: None,
            load_data: true,
            range: true,
            round_robin: true,
            range_prefix: "range_part".to_string(),
            round_robin_prefix: "rrobin_part".to_string(),
            range_inserts: Vec::new(),
            round_robin_inserts: Vec::new(),
        }
    }
}

impl HarnessConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON config; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    #[must_use]
    pub fn with_fixtures(mut self, header: impl Into<PathBuf>, data: impl Into<PathBuf>) -> Self {
        self.header_path = header.into();
        self.data_path = data.into();
        self
    }

    #[must_use]
    pub const fn with_partitions(mut self, partitions: i64) -> Self {
        self.partitions = partitions;
        self
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    #[must_use]
    pub const fn with_expected_rows(mut self, rows: usize) -> Self {
        self.expected_rows = Some(rows);
        self
    }

    #[must_use]
    pub const fn with_stages(mut self, load_data: bool, range: bool, round_robin: bool) -> Self {
        self.load_data = load_data;
        self.range = range;
        self.round_robin = round_robin;
        self
    }

    #[must_use]
    pub fn with_range_insert(mut self, case: InsertCase) -> Self {
        self.range_inserts.push(case);
        self
    }

    #[must_use]
    pub fn with_round_robin_insert(mut self, case: InsertCase) -> Self {
        self.round_robin_inserts.push(case);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.range {
            ensure!(!self.column.is_empty(), "range stage needs a partitioning column");
        }
        Ok(())
    }
}

/// Result of a single harness stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Outcomes of every stage that ran, in order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    stages: Vec<StageOutcome>,
}

impl Report {
    pub fn stages(&self) -> &[StageOutcome] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn passed(&self) -> bool {
        self.stages.iter().all(|s| s.passed)
    }

    pub fn failures(&self) -> usize {
        self.stages.iter().filter(|s| !s.passed).count()
    }

    fn record(&mut self, name: impl Into<String>, outcome: Result<String>) {
        let name = name.into();
        let stage = match outcome {
            Ok(detail) => {
                info!(stage = %name, "stage passed");
                StageOutcome {
                    name,
                    passed: true,
                    detail,
                }
            }
            Err(err) => {
                warn!(stage = %name, error = %format!("{err:#}"), "stage failed");
                StageOutcome {
                    name,
                    passed: false,
                    detail: format!("{err:#}"),
                }
            }
        };
        self.stages.push(stage);
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(76);
        for stage in &self.stages {
            writeln!(f, "{rule}")?;
            writeln!(f, "Testing {}", stage.name)?;
            if stage.passed {
                writeln!(f, "{} pass! {}", stage.name, stage.detail)?;
            } else {
                writeln!(f, "{} FAILED: {}", stage.name, stage.detail)?;
            }
        }
        writeln!(f, "{rule}")?;
        write!(
            f,
            "{} of {} stages passed",
            self.stages.len() - self.failures(),
            self.stages.len()
        )
    }
}

/// Runs every stage enabled in `config`.
///
/// Stage failures are collected in the report; only an unusable config is
/// returned as an error.
pub fn run(config: &HarnessConfig) -> Result<Report> {
    config.validate()?;
    let mut report = Report::default();
    if !(config.load_data || config.range || config.round_robin) {
        return Ok(report);
    }

    let store = match load(config) {
        Ok(store) => {
            if config.load_data {
                report.record("load_data", Ok(format!("{} rows loaded", store.len())));
            }
            store
        }
        Err(err) => {
            report.record("load_data", Err(err));
            return Ok(report);
        }
    };

    if config.range {
        let partitioner = RangePartitioner::new(config.column.clone());
        run_scheme(
            config,
            &partitioner,
            &store,
            "range",
            &config.range_prefix,
            &config.range_inserts,
            &mut report,
        );
    }
    if config.round_robin {
        run_scheme(
            config,
            &RoundRobinPartitioner::new(),
            &store,
            "round_robin",
            &config.round_robin_prefix,
            &config.round_robin_inserts,
            &mut report,
        );
    }
    Ok(report)
}

fn load(config: &HarnessConfig) -> Result<MemoryStore> {
    let schema = fixtures::load_header(&config.header_path)?;
    let rows = fixtures::load_rows(&schema, &config.data_path)?;
    let store = MemoryStore::load(schema, rows)?;
    if let Some(expected) = config.expected_rows {
        ensure!(
            store.len() == expected,
            "expected {expected} rows, but {} rows were loaded",
            store.len()
        );
    }
    Ok(store)
}

fn run_scheme(
    config: &HarnessConfig,
    partitioner: &dyn Partitioner,
    base: &MemoryStore,
    scheme: &str,
    prefix: &str,
    inserts: &[InsertCase],
    report: &mut Report,
) {
    // Each scheme works on its own copy so inserts never leak across stages.
    let mut store = base.clone();
    let stage = format!("{scheme}_partition");

    if config.partitions <= 0 {
        let outcome = match partitioner.build(&store, config.partitions) {
            Err(Error::InvalidArgument(msg)) => Ok(format!("rejected as expected: {msg}")),
            Err(other) => Err(other.into()),
            Ok(layout) => Err(anyhow::anyhow!(
                "expected no partitions for N={}, found {}",
                config.partitions,
                layout.len()
            )),
        };
        report.record(stage, outcome);
        return;
    }

    let mut layout = match build_and_check(partitioner, &store, config.partitions, prefix) {
        Ok((layout, detail)) => {
            report.record(stage, Ok(detail));
            layout
        }
        Err(err) => {
            report.record(stage, Err(err));
            return;
        }
    };

    for (i, case) in inserts.iter().enumerate() {
        // Round-robin default: the slot after every row stored so far.
        let expected = case
            .expected_partition
            .or_else(|| layout.cursor().map(|_| layout.row_count() % layout.len()));
        let outcome = insert_and_check(&mut layout, &mut store, case, expected, prefix);
        report.record(format!("{scheme}_insert[{i}]"), outcome);
    }
}

fn build_and_check(
    partitioner: &dyn Partitioner,
    store: &MemoryStore,
    partitions: i64,
    prefix: &str,
) -> Result<(PartitionLayout, String)> {
    let layout = partitioner.build(store, partitions)?;
    verify_partition_count(&layout, partitions as usize)?;
    verify(&layout, store)?;
    verify_partition_sizes(&layout, store)?;

    let listing: Vec<String> = layout
        .partitions()
        .iter()
        .map(|p| match p.interval() {
            Some(interval) => format!("{}={} {}", p.name(prefix), p.len(), interval),
            None => format!("{}={}", p.name(prefix), p.len()),
        })
        .collect();
    Ok((layout, listing.join(", ")))
}

fn insert_and_check(
    layout: &mut PartitionLayout,
    store: &mut MemoryStore,
    case: &InsertCase,
    expected: Option<usize>,
    prefix: &str,
) -> Result<String> {
    let row = fixtures::load_insert(store.schema(), &case.path)?;
    let id = row.values()[store.schema().id_index()].clone();
    let index = layout.insert_into(&mut *store, row)?;

    if let Some(expected) = expected {
        if index != expected {
            bail!("insert failed! could not find tuple {id} in {prefix}{expected}, it went to {prefix}{index}");
        }
    }
    verify_membership(layout, store.schema(), index, &id)?;
    verify(layout, store)?;
    verify_partition_sizes(layout, store)?;
    Ok(format!("row {id} in {prefix}{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static SCRATCH: AtomicUsize = AtomicUsize::new(0);

    /// Writes fixture files into a fresh scratch directory.
    fn scratch(files: &[(&str, String)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "partcli-harness-{}-{}",
            std::process::id(),
            SCRATCH.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).unwrap();
        for (name, body) in files {
            fs::write(dir.join(name), body).unwrap();
        }
        dir
    }

    fn dataset(rows: i64) -> Vec<(&'static str, String)> {
        let header = r#"{"id": "INTEGER", "created_utc": "BIGINT", "name": "TEXT"}"#.to_string();
        let data = (0..rows)
            .map(|i| format!(r#"{{"id": {i}, "created_utc": {}, "name": "sub{i}"}}"#, 100 + i))
            .collect::<Vec<_>>()
            .join("\n");
        vec![("headers.json", header), ("data.jsonl", data)]
    }

    fn config_for(dir: &Path) -> HarnessConfig {
        HarnessConfig::new().with_fixtures(dir.join("headers.json"), dir.join("data.jsonl"))
    }

    #[test]
    fn test_full_run_passes() {
        let mut files = dataset(11);
        files.push(("insert1.json", r#"{"id": 11, "created_utc": 100, "name": "x"}"#.into()));
        files.push(("insert2.json", r#"{"id": 12, "created_utc": 105, "name": "y"}"#.into()));
        let dir = scratch(&files);

        let config = config_for(&dir)
            .with_partitions(3)
            .with_expected_rows(11)
            .with_range_insert(InsertCase::new(dir.join("insert1.json")).expecting(0))
            .with_round_robin_insert(InsertCase::new(dir.join("insert1.json")))
            .with_round_robin_insert(InsertCase::new(dir.join("insert2.json")).expecting(0));

        let report = run(&config).unwrap();
        assert!(report.passed(), "{report}");
        assert_eq!(report.stages().len(), 6);
        assert_eq!(
            report.stage("round_robin_insert[0]").unwrap().detail,
            "row 11 in rrobin_part2"
        );
    }

    #[test]
    fn test_wrong_expected_partition_fails_stage() {
        let mut files = dataset(6);
        files.push(("insert.json", r#"{"id": 6, "created_utc": 100, "name": "x"}"#.into()));
        let dir = scratch(&files);

        let config = config_for(&dir)
            .with_partitions(2)
            .with_stages(true, true, false)
            .with_range_insert(InsertCase::new(dir.join("insert.json")).expecting(1));

        let report = run(&config).unwrap();
        assert!(!report.passed());
        assert_eq!(report.failures(), 1);
        assert!(report.stage("range_partition").unwrap().passed);
        assert!(!report.stage("range_insert[0]").unwrap().passed);
    }

    #[test]
    fn test_rejected_insert_does_not_fail_later_stages() {
        let mut files = dataset(6);
        files.push(("dup.json", r#"{"id": 3, "created_utc": 101, "name": "dup"}"#.into()));
        files.push(("fresh.json", r#"{"id": 50, "created_utc": 102, "name": "new"}"#.into()));
        let dir = scratch(&files);

        let config = config_for(&dir)
            .with_partitions(2)
            .with_range_insert(InsertCase::new(dir.join("dup.json")))
            .with_range_insert(InsertCase::new(dir.join("fresh.json")).expecting(0))
            .with_round_robin_insert(InsertCase::new(dir.join("dup.json")))
            .with_round_robin_insert(InsertCase::new(dir.join("fresh.json")));

        let report = run(&config).unwrap();
        assert_eq!(report.failures(), 2, "{report}");
        assert!(report
            .stage("range_insert[0]")
            .unwrap()
            .detail
            .contains("duplicate row identifier 3"));
        assert!(report.stage("range_insert[1]").unwrap().passed, "{report}");
        assert!(!report.stage("round_robin_insert[0]").unwrap().passed);
        assert_eq!(
            report.stage("round_robin_insert[1]").unwrap().detail,
            "row 50 in rrobin_part0"
        );
    }

    #[test]
    fn test_invalid_partition_count_expects_rejection() {
        let dir = scratch(&dataset(4));
        for n in [0, -1] {
            let report = run(&config_for(&dir).with_partitions(n)).unwrap();
            assert!(report.passed(), "{report}");
            assert!(report
                .stage("range_partition")
                .unwrap()
                .detail
                .starts_with("rejected as expected"));
        }
    }

    #[test]
    fn test_row_count_mismatch_stops_run() {
        let dir = scratch(&dataset(4));
        let report = run(&config_for(&dir).with_expected_rows(5)).unwrap();
        assert_eq!(report.stages().len(), 1);
        assert!(!report.stage("load_data").unwrap().passed);
    }

    #[test]
    fn test_out_of_range_insert_fails_stage() {
        let mut files = dataset(4);
        files.push(("low.json", r#"{"id": 9, "created_utc": 1, "name": "x"}"#.into()));
        let dir = scratch(&files);
        let config = config_for(&dir)
            .with_partitions(2)
            .with_stages(false, true, false)
            .with_range_insert(InsertCase::new(dir.join("low.json")));

        let report = run(&config).unwrap();
        let stage = report.stage("range_insert[0]").unwrap();
        assert!(!stage.passed);
        assert!(stage.detail.contains("outside all partition bounds"));
    }

    #[test]
    fn test_text_column_fails_range_stage_only() {
        let dir = scratch(&dataset(4));
        let report = run(&config_for(&dir).with_partitions(2).with_column("name")).unwrap();
        let range = report.stage("range_partition").unwrap();
        assert!(!range.passed);
        assert!(range.detail.contains("numeric"));
        assert!(report.stage("round_robin_partition").unwrap().passed);
    }

    #[test]
    fn test_no_stages_is_empty_report() {
        let config = HarnessConfig::new().with_stages(false, false, false);
        let report = run(&config).unwrap();
        assert!(report.stages().is_empty());
        assert!(report.passed());
    }

    #[test]
    fn test_config_from_json_keeps_defaults() {
        let dir = scratch(&[(
            "harness.json",
            r#"{"partitions": 3, "round_robin_inserts": [{"path": "a.json", "expected_partition": 2}]}"#
                .to_string(),
        )]);
        let config = HarnessConfig::from_file(&dir.join("harness.json")).unwrap();
        assert_eq!(config.partitions, 3);
        assert_eq!(config.column, "created_utc");
        assert_eq!(
            config.round_robin_inserts,
            vec![InsertCase::new("a.json").expecting(2)]
        );
    }
}
