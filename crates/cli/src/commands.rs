//! Subcommands.

use crate::fixtures;
use crate::harness::{self, HarnessConfig};
use anyhow::Result;
use clap::{Args, Subcommand};
use partcore::checker::{verify, verify_membership, verify_partition_count, verify_partition_sizes};
use partcore::{
    BulkStore, MemoryStore, PartitionLayout, Partitioner, RangePartitioner, RoundRobinPartitioner,
};
use std::fmt::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Source fixtures and partition count shared by the partitioning commands.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Header file mapping column names to SQL types.
    #[arg(long)]
    pub header: PathBuf,
    /// Data file: `.csv` with a header row, otherwise JSON Lines or a JSON array.
    #[arg(long)]
    pub data: PathBuf,
    /// Number of partitions to create.
    #[arg(short = 'n', long, allow_negative_numbers = true, default_value_t = 5)]
    pub partitions: i64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Split the source into equal-width ranges of a numeric column.
    Range {
        #[command(flatten)]
        source: SourceArgs,
        /// Partitioning column.
        #[arg(long, default_value = "created_utc")]
        column: String,
        /// Row files to insert after partitioning, in order.
        #[arg(long = "insert")]
        inserts: Vec<PathBuf>,
        #[arg(long, default_value = "range_part")]
        prefix: String,
    },
    /// Split the source into even blocks and rotate inserts across partitions.
    RoundRobin {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long = "insert")]
        inserts: Vec<PathBuf>,
        #[arg(long, default_value = "rrobin_part")]
        prefix: String,
    },
    /// Run the staged harness from a JSON config (defaults when omitted).
    Harness {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Printable outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub output: String,
    pub success: bool,
    pub failures: usize,
}

impl Command {
    pub fn execute(&self) -> Result<CommandResult> {
        match self {
            Command::Range {
                source,
                column,
                inserts,
                prefix,
            } => partition(&RangePartitioner::new(column.clone()), source, inserts, prefix),
            Command::RoundRobin {
                source,
                inserts,
                prefix,
            } => partition(&RoundRobinPartitioner::new(), source, inserts, prefix),
            Command::Harness { config } => {
                let config = match config {
                    Some(path) => HarnessConfig::from_file(path)?,
                    None => HarnessConfig::default(),
                };
                let report = harness::run(&config)?;
                Ok(CommandResult {
                    output: report.to_string(),
                    success: report.passed(),
                    failures: report.failures(),
                })
            }
        }
    }
}

fn partition(
    partitioner: &dyn Partitioner,
    args: &SourceArgs,
    inserts: &[PathBuf],
    prefix: &str,
) -> Result<CommandResult> {
    let schema = fixtures::load_header(&args.header)?;
    let rows = fixtures::load_rows(&schema, &args.data)?;
    let mut store = MemoryStore::load(schema, rows)?;

    let mut layout = partitioner.build(&store, args.partitions)?;
    info!(
        partitioner = partitioner.name(),
        scheme = layout.scheme().name(),
        partitions = layout.len(),
        rows = layout.row_count(),
        "layout built"
    );

    let mut output = String::new();
    let mut failures = 0;
    check(&mut output, &mut failures, "partition", || {
        verify_partition_count(&layout, args.partitions as usize)?;
        verify(&layout, &store)?;
        verify_partition_sizes(&layout, &store)?;
        Ok(())
    })?;

    for path in inserts {
        let row = fixtures::load_insert(store.schema(), path)?;
        let id = row.values()[store.schema().id_index()].clone();
        let label = format!("insert {id}");
        check(&mut output, &mut failures, &label, || {
            let index = layout.insert_into(&mut store, row)?;
            verify_membership(&layout, store.schema(), index, &id)?;
            verify(&layout, &store)?;
            Ok(())
        })?;
    }

    write_listing(&mut output, &layout, prefix)?;
    Ok(CommandResult {
        output,
        success: failures == 0,
        failures,
    })
}

fn check(
    output: &mut String,
    failures: &mut usize,
    label: &str,
    f: impl FnOnce() -> Result<()>,
) -> fmt::Result {
    match f() {
        Ok(()) => writeln!(output, "{label}: ok"),
        Err(err) => {
            warn!(step = label, error = %format!("{err:#}"), "check failed");
            *failures += 1;
            writeln!(output, "{label}: FAILED: {err:#}")
        }
    }
}

fn write_listing(output: &mut String, layout: &PartitionLayout, prefix: &str) -> fmt::Result {
    for partition in layout.partitions() {
        write!(
            output,
            "{:<16} {:>8} rows",
            partition.name(prefix),
            partition.len()
        )?;
        match partition.interval() {
            Some(interval) => writeln!(output, "  {interval}")?,
            None => writeln!(output)?,
        }
    }
    if let Some(cursor) = layout.cursor() {
        write!(output, "next insert goes to {}", cursor.peek())?;
    }
    Ok(())
}
