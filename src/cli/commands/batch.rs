//! `batch`: drive the engine from a CSV table
//!
//! The table has the columns `loc_id`, `date` and `classes`, where classes
//! are written as a braced integer list such as `{1,2,3}`. Rows run one at a
//! time, in table order, and the first failing row stops the batch.

use super::cancel_on_ctrl_c;
use crate::config::EngineConfig;
use crate::engine::{CombineRequest, Engine, RunPhase};
use crate::error::{ConsensusError, ErrorCode, Result as ConsensusResult};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct TableRow {
    loc_id: String,
    date: String,
    #[serde(default)]
    classes: String,
}

/// One row of the driver table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    /// Zero-based data row index
    pub index: usize,
    pub request: CombineRequest,
}

pub async fn run_batch(config: EngineConfig, table: &Path, skip_rows: usize) -> Result<()> {
    let file = std::fs::File::open(table)
        .with_context(|| format!("Failed to open batch table {}", table.display()))?;
    let rows = read_table(file, skip_rows)?;
    info!(
        "Batch {}: {} row(s) to combine, {} skipped",
        table.display(),
        rows.len(),
        skip_rows
    );

    let engine = Engine::new(config)?;
    let cancel = cancel_on_ctrl_c();
    let pb = create_progress_bar(rows.len());

    for row in &rows {
        let request = &row.request;
        let label = format!("location {} on {}", request.location, request.date);
        pb.set_message(label.clone());
        let phase_pb = pb.clone();
        let on_phase = move |phase: RunPhase| phase_pb.set_message(format!("{}: {}", label, phase));
        let report = match engine.combine_with_progress(request, &cancel, on_phase).await {
            Ok(report) => report,
            Err(e) => {
                pb.abandon();
                return Err(e).with_context(|| {
                    format!(
                        "Row {} (location {} on {}) failed",
                        row.index, request.location, request.date
                    )
                });
            }
        };
        debug!("{}", report);
        pb.inc(1);
    }

    pb.finish_with_message("done");
    println!("Combined {} row(s) from {}", rows.len(), table.display());
    Ok(())
}

/// Parse the driver table, dropping the first `skip_rows` data rows
pub fn read_table<R: Read>(reader: R, skip_rows: usize) -> ConsensusResult<Vec<BatchRow>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in reader.deserialize::<TableRow>().enumerate() {
        let record = record.map_err(|e| {
            ConsensusError::validation(
                ErrorCode::VALIDATION_INVALID_ARGUMENT,
                format!("malformed batch table row {}", index),
                Some("table".to_string()),
            )
            .with_source(e)
        })?;
        if index < skip_rows {
            continue;
        }

        let classes = parse_classes(&record.classes).map_err(|e| {
            e.with_context(format!("row {}", index))
        })?;
        let request = CombineRequest::new(normalize_location(&record.loc_id), record.date)
            .with_classes(classes);
        request.validate()?;
        rows.push(BatchRow { index, request });
    }
    Ok(rows)
}

/// Location ids exported as floats (`12.0`) name the same location as `12`
fn normalize_location(raw: &str) -> String {
    raw.strip_suffix(".0").unwrap_or(raw).to_string()
}

/// Parse `{1,2,3}` into class names; blank or `{}` means none
fn parse_classes(raw: &str) -> ConsensusResult<Vec<String>> {
    let inner = raw.trim().trim_start_matches('{').trim_end_matches('}');
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map(|n| n.to_string()).map_err(|e| {
                ConsensusError::validation(
                    ErrorCode::VALIDATION_INVALID_ARGUMENT,
                    format!("class '{}' is not an integer", s),
                    Some("classes".to_string()),
                )
                .with_source(e)
            })
        })
        .collect()
}

fn create_progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("█▓▒░ "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
