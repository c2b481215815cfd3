//! thermal.rs
//! First-order thermal process (room + heater) with an optionally noisy thermometer.
//!
//! dT/dt = (ambient - T) / tau + heater_rate * u
//!
//! `u` is the controller output (0..1 for an on/off heater). Integration is explicit Euler in
//! fixed sub-steps so large `dt` values stay stable.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::plant::Plant;

const MAX_SUBSTEP_S: f64 = 0.1; // Euler sub-step upper bound

#[derive(Debug, Clone)]
pub struct ThermalPlant {
    temperature: f64,
    ambient: f64,
    time_constant_s: f64, // tau: heat loss towards ambient
    heater_rate: f64,     // degrees per second at full input
    noise: f64,           // +/- sensor noise amplitude
    rng: StdRng,
}

impl ThermalPlant {
    pub fn new(initial: f64, ambient: f64, time_constant_s: f64, heater_rate: f64) -> Self {
        Self {
            temperature: initial,
            ambient,
            time_constant_s,
            heater_rate,
            noise: 0.0,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Room starting at 50 degrees with a 60 degree ambient, heater able to add 2 degrees/s.
    pub fn room() -> Self {
        Self::new(50.0, 60.0, 120.0, 2.0)
    }

    /// Add uniform sensor noise in `[-amplitude, amplitude)`, reproducible from `seed`.
    pub fn with_noise(mut self, amplitude: f64, seed: u64) -> Self {
        self.noise = amplitude.abs();
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[inline]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl Plant for ThermalPlant {
    fn step(&mut self, input: f64, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let substeps = (dt / MAX_SUBSTEP_S).ceil().max(1.0) as u32;
        let h = dt / substeps as f64;

        for _ in 0..substeps {
            let loss = (self.ambient - self.temperature) / self.time_constant_s;
            self.temperature += (loss + self.heater_rate * input) * h;
        }
    }

    fn measure(&mut self) -> f64 {
        if self.noise > 0.0 {
            self.temperature + self.rng.random_range(-self.noise..self.noise)
        } else {
            self.temperature
        }
    }
}
