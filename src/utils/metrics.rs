//! metrics.rs
//! Step-response summary of a closed-loop trace.
//!
//! All figures are taken against the setpoint of the *last* sample, so a run with setpoint
//! changes is judged on its final step.

use serde::Serialize;

use crate::utils::trace::Trace;

const TAIL_FRACTION: usize = 10; // steady-state window = last 1/10 of the run

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepMetrics {
    pub samples: usize,
    pub final_setpoint: f64,
    pub final_error: f64,
    pub steady_state_error: f64, // mean |error| over the tail window
    pub overshoot: f64,          // beyond the setpoint, in the direction of the step (>= 0)
    pub settling_time_s: Option<f64>,
    pub saturation_ratio: f64,
    pub output_min: f64,
    pub output_max: f64,
}

/// Summarise `trace`. `band` is the absolute tolerance used for settling time.
/// Returns `None` for an empty trace.
pub fn step_metrics(trace: &Trace, band: f64) -> Option<StepMetrics> {
    let first = trace.first()?;
    let last = trace.last()?;
    let len = trace.len();
    let target = last.setpoint;

    // Step direction from the first measurement; overshoot is measured past the target.
    let direction = if first.measurement <= target { 1.0 } else { -1.0 };
    let overshoot = trace
        .iter()
        .map(|s| direction * (s.measurement - target))
        .fold(0.0_f64, f64::max);

    let settling_time_s = match trace
        .iter()
        .rposition(|s| (s.measurement - target).abs() > band)
    {
        None => Some(first.time_s),
        Some(idx) => trace.get(idx + 1).map(|s| s.time_s),
    };

    let tail_len = (len / TAIL_FRACTION).max(1);
    let steady_state_error = trace
        .iter()
        .skip(len - tail_len)
        .map(|s| s.error.abs())
        .sum::<f64>()
        / tail_len as f64;

    let saturated = trace.iter().filter(|s| s.saturated).count();

    let (output_min, output_max) = trace
        .outputs()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| (lo.min(o), hi.max(o)));

    Some(StepMetrics {
        samples: len,
        final_setpoint: target,
        final_error: last.error,
        steady_state_error,
        overshoot,
        settling_time_s,
        saturation_ratio: saturated as f64 / len as f64,
        output_min,
        output_max,
    })
}
