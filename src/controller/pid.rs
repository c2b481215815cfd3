//! pid.rs
//! Discrete-time PID controller with derivative-on-measurement and back-calculation anti-windup.
//!
//! The controller is a plain value owned by one control loop. `update` takes an explicit elapsed
//! duration; `update_at`/`update_now` derive it from a monotonic clock.
//!
//! Per-update sequence:
//! - P: `kp * error`
//! - I: `integral += ki * error * dt` (skipped when `dt == 0`)
//! - D: `-kd * (measurement - prev_measurement) / dt` (zero when `dt == 0`)
//! - clamp `p + i + d` into the output limits, then recompute the integral from the clamped output

use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::controller::limits::{LimitsError, OutputLimits};

/// Nominal period assumed for the first wall-clock update (no previous timestamp yet).
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Breakdown of one control cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlTerms {
    pub error: f64,
    pub p: f64,
    /// Integral state after anti-windup correction.
    pub i: f64,
    pub d: f64,
    /// `p + i + d` before clamping (with `i` taken before the correction).
    pub raw: f64,
    pub output: f64,
    pub saturated: bool,
}

#[derive(Debug, Clone)]
pub struct Controller {
    // Gains (fixed at construction)
    kp: f64,
    ki: f64,
    kd: f64,

    setpoint: f64,
    limits: Option<OutputLimits>,

    // State
    prev_measurement: f64, // implicit zero baseline before the first update
    integral: f64,         // accumulated integral contribution to output

    // Wall-clock wrapper
    last_update: Option<Instant>,
    sample_period: Duration,
}

impl Controller {
    /// Create a controller with the given gains, setpoint 0 and no output limits.
    /// Zero gains disable their term; negative gains are accepted as-is.
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint: 0.0,
            limits: None,
            prev_measurement: 0.0,
            integral: 0.0,
            last_update: None,
            sample_period: DEFAULT_SAMPLE_PERIOD,
        }
    }

    pub fn gains(&self) -> Gains {
        Gains {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
        }
    }

    #[inline]
    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Change the target. Integral and derivative history are kept.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        debug!("setpoint {} -> {}", self.setpoint, setpoint);
        self.setpoint = setpoint;
    }

    #[inline]
    pub fn output_limits(&self) -> Option<OutputLimits> {
        self.limits
    }

    /// Bound the output to `[min, max]`.
    ///
    /// Fails without touching any state when `min > max` (or either bound is NaN).
    /// An integral state already outside the new bounds is not re-clamped here; the next update
    /// with a non-zero elapsed time corrects it.
    pub fn set_output_limits(&mut self, min: f64, max: f64) -> Result<(), LimitsError> {
        let limits = OutputLimits::new(min, max).inspect_err(|e| warn!("{}", e))?;
        debug!("output limits set to [{}, {}]", min, max);
        self.limits = Some(limits);
        Ok(())
    }

    /// Remove the output bounds; subsequent outputs are unclamped.
    pub fn clear_output_limits(&mut self) {
        debug!("output limits cleared");
        self.limits = None;
    }

    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }

    #[inline]
    pub fn prev_measurement(&self) -> f64 {
        self.prev_measurement
    }

    #[inline]
    pub fn sample_period(&self) -> Duration {
        self.sample_period
    }

    /// Elapsed time used by the first `update_at`/`update_now` call.
    pub fn set_sample_period(&mut self, period: Duration) {
        self.sample_period = period;
    }

    /// Builder form of [`Controller::set_sample_period`].
    pub fn with_sample_period(mut self, period: Duration) -> Self {
        self.sample_period = period;
        self
    }

    /// Drop integral and derivative history and forget the last wall-clock timestamp.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_measurement = 0.0;
        self.last_update = None;
    }

    /// Run one control cycle and return the (possibly clamped) output.
    pub fn update(&mut self, measurement: f64, elapsed: Duration) -> f64 {
        self.compute(measurement, elapsed).output
    }

    /// Run one control cycle and return every term of it.
    pub fn compute(&mut self, measurement: f64, elapsed: Duration) -> ControlTerms {
        let dt = elapsed.as_secs_f64();
        let error = self.setpoint - measurement;

        // Proportional term
        let p = self.kp * error;

        // Integral term (no contribution when no time has passed)
        if dt > 0.0 {
            self.integral += self.ki * error * dt;
        }
        let i = self.integral;

        // Derivative on measurement: setpoint steps produce no kick
        let d = if dt > 0.0 {
            -self.kd * (measurement - self.prev_measurement) / dt
        } else {
            0.0
        };

        let raw = p + i + d;
        let output = match self.limits {
            Some(limits) => limits.clamp(raw),
            None => raw,
        };

        // Anti-windup: back-calculate the integral so that p + integral + d == output.
        // Only when clamping changed the output, and never on a zero-length step.
        let saturated = output != raw;
        if saturated && dt > 0.0 {
            self.integral = output - p - d;
            trace!(
                "saturated: raw={} output={} integral {} -> {}",
                raw, output, i, self.integral
            );
        }

        self.prev_measurement = measurement;

        ControlTerms {
            error,
            p,
            i: self.integral,
            d,
            raw,
            output,
            saturated,
        }
    }

    /// Wall-clock update: elapsed time is measured from the previous `update_at` call.
    ///
    /// The first call uses the configured sample period. A timestamp older than the previous one
    /// counts as zero elapsed time.
    pub fn update_at(&mut self, measurement: f64, now: Instant) -> f64 {
        self.compute_at(measurement, now).output
    }

    /// [`Controller::update_at`] returning every term of the cycle.
    pub fn compute_at(&mut self, measurement: f64, now: Instant) -> ControlTerms {
        let elapsed = match self.last_update {
            Some(prev) => now.saturating_duration_since(prev),
            None => self.sample_period,
        };
        self.last_update = Some(now);
        self.compute(measurement, elapsed)
    }

    /// [`Controller::update_at`] with the current instant.
    pub fn update_now(&mut self, measurement: f64) -> f64 {
        self.update_at(measurement, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn new_controller_is_zeroed() {
        let c = Controller::new(1.0, 2.0, 3.0);
        assert_eq!(c.gains(), Gains { kp: 1.0, ki: 2.0, kd: 3.0 });
        assert_eq!(c.setpoint(), 0.0);
        assert_eq!(c.output_limits(), None);
        assert_eq!(c.integral(), 0.0);
        assert_eq!(c.prev_measurement(), 0.0);
        assert_eq!(c.sample_period(), DEFAULT_SAMPLE_PERIOD);
    }

    #[test]
    fn zero_elapsed_skips_time_terms() {
        let mut c = Controller::new(0.0, 1.0, 1.0);
        c.set_setpoint(10.0);
        c.update(4.0, SEC);
        let integral = c.integral();

        for _ in 0..5 {
            let terms = c.compute(8.0, Duration::ZERO);
            assert_eq!(terms.d, 0.0);
            assert!(!terms.output.is_nan());
            assert_eq!(c.integral(), integral);
        }
    }

    #[test]
    fn zero_elapsed_keeps_integral_even_when_saturated() {
        let mut c = Controller::new(0.0, 1.0, 0.0);
        c.set_setpoint(5.0);
        c.update(0.0, SEC);
        assert_eq!(c.integral(), 5.0);

        c.set_output_limits(0.0, 1.0).unwrap();
        assert_eq!(c.update(0.0, Duration::ZERO), 1.0);
        assert_eq!(c.integral(), 5.0);

        // next real step applies the back-calculation
        assert_eq!(c.update(0.0, SEC), 1.0);
        assert_eq!(c.integral(), 1.0);
    }

    #[test]
    fn terms_add_up_when_unsaturated() {
        let mut c = Controller::new(0.5, 0.5, 0.5);
        c.set_setpoint(10.0);
        let t = c.compute(5.0, SEC);
        assert_eq!(t.p, 2.5);
        assert_eq!(t.i, 2.5);
        assert_eq!(t.d, -2.5);
        assert_eq!(t.raw, t.output);
        assert!(!t.saturated);
    }

    #[test]
    fn saturated_terms_report_clamped_output() {
        let mut c = Controller::new(1.0, 0.0, 0.0);
        c.set_setpoint(10.0);
        c.set_output_limits(-2.0, 2.0).unwrap();
        let t = c.compute(0.0, SEC);
        assert_eq!(t.raw, 10.0);
        assert_eq!(t.output, 2.0);
        assert!(t.saturated);
        assert_eq!(t.i, 2.0 - 10.0);
    }

    #[test]
    fn first_wall_clock_update_uses_sample_period() {
        let mut c = Controller::new(0.0, 1.0, 0.0).with_sample_period(Duration::from_millis(500));
        c.set_setpoint(2.0);
        let out = c.update_at(0.0, Instant::now());
        assert_eq!(out, 1.0);
    }

    #[test]
    fn backwards_timestamp_counts_as_zero_elapsed() {
        let mut c = Controller::new(0.0, 1.0, 1.0).with_sample_period(SEC);
        c.set_setpoint(1.0);
        let start = Instant::now();
        let later = start + SEC;
        c.update_at(0.0, later);
        let integral = c.integral();

        let out = c.update_at(3.0, start);
        assert_eq!(c.integral(), integral);
        assert_eq!(out, integral); // p = 0, d = 0
    }

    #[test]
    fn wall_clock_delta_between_calls() {
        let mut c = Controller::new(0.0, 1.0, 0.0).with_sample_period(SEC);
        c.set_setpoint(1.0);
        let start = Instant::now();
        assert_eq!(c.update_at(0.0, start), 1.0);
        assert_eq!(c.update_at(0.0, start + Duration::from_secs(2)), 3.0);
    }

    #[test]
    fn reset_keeps_configuration() {
        let mut c = Controller::new(1.0, 1.0, 1.0);
        c.set_setpoint(3.0);
        c.set_output_limits(-10.0, 10.0).unwrap();
        c.update(1.0, SEC);
        c.reset();

        assert_eq!(c.integral(), 0.0);
        assert_eq!(c.prev_measurement(), 0.0);
        assert_eq!(c.setpoint(), 3.0);
        assert!(c.output_limits().is_some());
    }

    #[test]
    fn cleared_limits_keep_back_calculated_integral() {
        let mut c = Controller::new(1.0, 0.0, 0.0);
        c.set_setpoint(50.0);
        c.set_output_limits(0.0, 1.0).unwrap();
        assert_eq!(c.update(0.0, SEC), 1.0);
        assert_eq!(c.integral(), -49.0);

        // the correction made while clamped is state, not a limit: it survives the clear
        c.clear_output_limits();
        assert_eq!(c.update(0.0, SEC), 1.0);
        assert_eq!(c.integral(), -49.0);

        // unclamped from here on: output follows p plus the stored integral
        assert_eq!(c.update(10.0, SEC), -9.0);
        assert_eq!(c.update(-100.0, SEC), 101.0);
        assert!(!c.compute(-100.0, SEC).saturated);
    }

    #[test]
    fn update_now_measures_real_elapsed_time() {
        let mut c = Controller::new(0.0, 1.0, 0.0).with_sample_period(SEC);
        c.set_setpoint(1.0);

        // first call: one nominal period
        assert_eq!(c.update_now(0.0), 1.0);

        let out = c.update_now(0.0);
        assert!(out.is_finite());
        // the second step adds error * elapsed with elapsed >= 0
        assert!(out >= 1.0, "integral shrank: {}", out);
        assert!(c.last_update.is_some());
    }
}
