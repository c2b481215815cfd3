//controller: the PID primitive and its output bounds
pub mod pid;
pub mod limits;

pub use limits::{LimitsError, OutputLimits};
pub use pid::{Controller, ControlTerms, Gains, DEFAULT_SAMPLE_PERIOD};
