//! # pidctrl
//! Discrete-time PID controller for closed loops sampled at irregular intervals.
//!
//! - `controller`: the controller itself (derivative on measurement, back-calculation anti-windup).
//! - `config`: serde-friendly gain/limit configuration and CSV tuning profiles.
//! - `plant`, `control_loop`: a simulated thermal process and the loops that drive it.
//! - `utils`: per-cycle traces, step-response metrics, CSV export.

pub mod controller;
pub mod config;
pub mod plant;
pub mod control_loop;
pub mod utils;

pub use controller::{Controller, ControlTerms, Gains, LimitsError, OutputLimits};
pub use config::{ConfigError, ControllerConfig};
