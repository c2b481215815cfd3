//! simulated.rs
//! Fixed-step closed loop in simulated time.
//!
//! Each cycle: read the plant sensor → apply any scheduled setpoint change → controller update
//! → drive the plant with the output for one step. Deterministic for a deterministic plant, so it
//! is what tests and the step-response demo use.

use std::time::Duration;

use log::{debug, info};

use crate::controller::Controller;
use crate::plant::Plant;
use crate::utils::trace::{Sample, Trace};

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub steps: u64,
    pub dt: Duration,
    /// `(step, setpoint)` pairs applied before the update of that step.
    pub setpoint_schedule: Vec<(u64, f64)>,
}

impl SimulationConfig {
    pub fn new(steps: u64, dt: Duration) -> Self {
        Self {
            steps,
            dt,
            setpoint_schedule: Vec::new(),
        }
    }

    pub fn with_setpoint_at(mut self, step: u64, setpoint: f64) -> Self {
        self.setpoint_schedule.push((step, setpoint));
        self
    }
}

/// Run `config.steps` control cycles of `controller` against `plant`.
pub fn run_simulated<P: Plant>(
    controller: &mut Controller,
    plant: &mut P,
    config: &SimulationConfig,
) -> Trace {
    let dt_s = config.dt.as_secs_f64();
    let mut trace = Trace::with_capacity(config.steps as usize);

    for step in 0..config.steps {
        for &(_, setpoint) in config.setpoint_schedule.iter().filter(|(at, _)| *at == step) {
            debug!("step {}: setpoint change to {}", step, setpoint);
            controller.set_setpoint(setpoint);
        }

        let measurement = plant.measure();
        let terms = controller.compute(measurement, config.dt);
        trace.push(Sample::from_terms(
            step,
            step as f64 * dt_s,
            controller.setpoint(),
            measurement,
            &terms,
        ));

        plant.step(terms.output, dt_s);
    }

    if let Some(last) = trace.last() {
        info!(
            "simulated {} steps: final measurement {:.3} (setpoint {})",
            trace.len(),
            last.measurement,
            last.setpoint
        );
    }
    trace
}
