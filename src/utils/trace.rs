//! trace.rs
//! Per-cycle record of a closed-loop run.
//!
//! A trace is either unbounded (fixed-length simulated runs) or capped: once full, the oldest
//! sample is dropped for each new one, so a long-running loop keeps only its recent history.

use std::collections::VecDeque;

use serde::Serialize;

use crate::controller::ControlTerms;

/// One control cycle. Field order is the CSV column order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub step: u64,
    pub time_s: f64,
    pub setpoint: f64,
    pub measurement: f64,
    pub error: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub output: f64,
    pub saturated: bool,
}

impl Sample {
    pub fn from_terms(step: u64, time_s: f64, setpoint: f64, measurement: f64, terms: &ControlTerms) -> Self {
        Self {
            step,
            time_s,
            setpoint,
            measurement,
            error: terms.error,
            p: terms.p,
            i: terms.i,
            d: terms.d,
            output: terms.output,
            saturated: terms.saturated,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Trace {
    samples: VecDeque<Sample>,
    max_points: Option<usize>, // None: keep everything
    dropped: u64,              // samples evicted by the cap
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unbounded trace with room for `capacity` samples preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Trace keeping at most the `max_points` most recent samples (at least one).
    pub fn capped(max_points: usize) -> Self {
        let max_points = max_points.max(1);
        Self {
            samples: VecDeque::with_capacity(max_points),
            max_points: Some(max_points),
            dropped: 0,
        }
    }

    /// Append a sample; removes the oldest if at capacity (FIFO).
    #[inline]
    pub fn push(&mut self, sample: Sample) {
        if let Some(max) = self.max_points {
            if self.samples.len() >= max {
                self.samples.pop_front();
                self.dropped += 1;
            }
        }
        self.samples.push_back(sample);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        self.samples.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn max_points(&self) -> Option<usize> {
        self.max_points
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn outputs(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.output)
    }
}
