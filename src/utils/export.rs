//! export.rs
//! CSV export of closed-loop runs.
//!
//! Two outputs:
//! - trace files: one row per control cycle (`step,time_s,setpoint,measurement,error,p,i,d,output,saturated`).
//! - `summary.csv`: one appended row of `StepMetrics` per run, tagged with a label.

use std::{
    fs::{OpenOptions, create_dir_all},
    io,
    path::Path,
};

use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::utils::{metrics::StepMetrics, trace::Trace};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

// csv cannot serialize flattened structs, so the summary row spells out every column
#[derive(Serialize)]
struct SummaryRow<'a> {
    label: &'a str,
    samples: usize,
    final_setpoint: f64,
    final_error: f64,
    steady_state_error: f64,
    overshoot: f64,
    settling_time_s: Option<f64>,
    saturation_ratio: f64,
    output_min: f64,
    output_max: f64,
}

impl<'a> SummaryRow<'a> {
    fn new(label: &'a str, m: &StepMetrics) -> Self {
        Self {
            label,
            samples: m.samples,
            final_setpoint: m.final_setpoint,
            final_error: m.final_error,
            steady_state_error: m.steady_state_error,
            overshoot: m.overshoot,
            settling_time_s: m.settling_time_s,
            saturation_ratio: m.saturation_ratio,
            output_min: m.output_min,
            output_max: m.output_max,
        }
    }
}

/// Write every sample of `trace` as CSV (with header) into `writer`.
pub fn write_trace_to<W: io::Write>(writer: W, trace: &Trace) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for sample in trace.iter() {
        wtr.serialize(sample)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `trace` to `path`, creating parent directories. Overwrites an existing file.
pub fn write_trace<P: AsRef<Path>>(path: P, trace: &Trace) -> Result<(), ExportError> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let file = std::fs::File::create(path)?;
    write_trace_to(file, trace)?;
    info!("Trace ({} samples) exported to: {:?}", trace.len(), path);
    Ok(())
}

/// Append one summary row to `path`; the header is written only when the file is new.
pub fn write_summary<P: AsRef<Path>>(
    path: P,
    label: &str,
    metrics: &StepMetrics,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let file_exists = path.exists();

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(SummaryRow::new(label, metrics))?;
    wtr.flush()?;

    info!("Summary for '{}' appended to: {:?}", label, path);
    Ok(())
}
