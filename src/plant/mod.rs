//plant: simulated processes for closed-loop runs (demo binary, tests, benches)
pub mod thermal;

pub use thermal::ThermalPlant;

/// A process the controller can act on.
pub trait Plant {
    /// Apply `input` for `dt` seconds and advance the process state.
    fn step(&mut self, input: f64, dt: f64);

    /// Sensor reading of the current state.
    fn measure(&mut self) -> f64;
}
