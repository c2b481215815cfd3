//control_loop: drives a controller against a plant, in simulated or wall-clock time
pub mod simulated;
pub mod realtime;

pub use simulated::{SimulationConfig, run_simulated};
pub use realtime::{LoopCommand, LoopHandle, LoopReport};
