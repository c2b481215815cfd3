//! config.rs
//! Controller configuration: gains, initial setpoint, output bounds and nominal sample period.
//!
//! `ControllerConfig` is plain serde data so an embedding application can load it from whatever
//! format it already uses. Tuning profiles can also be read from a CSV table:
//!
//! ```text
//! name,kp,ki,kd,setpoint,output_min,output_max,sample_period_ms
//! thermostat,0.6,1.2,0.075,72,0,1,1000
//! motor,1.2,0.01,0.2,0,-50,50,
//! ```
//!
//! An empty `output_min`/`output_max` leaves that side unbounded; an empty `sample_period_ms`
//! keeps the controller default.

use std::{io, path::Path, time::Duration};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::{Controller, LimitsError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read profiles: {0}")]
    Io(#[from] io::Error),
    #[error("malformed profile table: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Limits(#[from] LimitsError),
    #[error("no profile named '{0}'")]
    UnknownProfile(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub name: String,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    #[serde(default)]
    pub setpoint: f64,
    #[serde(default)]
    pub output_min: Option<f64>,
    #[serde(default)]
    pub output_max: Option<f64>,
    #[serde(default)]
    pub sample_period_ms: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
            setpoint: 0.0,
            output_min: None,
            output_max: None,
            sample_period_ms: None,
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// On/off heater profile: output in [0, 1], one sample per second.
    pub fn thermostat() -> Self {
        Self::new()
            .with_name("thermostat")
            .with_kp(0.6)
            .with_ki(1.2)
            .with_kd(0.075)
            .with_setpoint(72.0)
            .with_output_limits(0.0, 1.0)
            .with_sample_period(Duration::from_secs(1))
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_kp(mut self, kp: f64) -> Self {
        self.kp = kp;
        self
    }

    pub fn with_ki(mut self, ki: f64) -> Self {
        self.ki = ki;
        self
    }

    pub fn with_kd(mut self, kd: f64) -> Self {
        self.kd = kd;
        self
    }

    pub fn with_setpoint(mut self, setpoint: f64) -> Self {
        self.setpoint = setpoint;
        self
    }

    /// Bounds are validated in [`ControllerConfig::build`].
    pub fn with_output_limits(mut self, min: f64, max: f64) -> Self {
        self.output_min = Some(min);
        self.output_max = Some(max);
        self
    }

    pub fn with_sample_period(mut self, period: Duration) -> Self {
        self.sample_period_ms = Some(period.as_millis() as u64);
        self
    }

    pub fn sample_period(&self) -> Option<Duration> {
        self.sample_period_ms.map(Duration::from_millis)
    }

    /// Construct a controller from this configuration.
    ///
    /// A missing bound on one side is treated as unbounded on that side.
    pub fn build(&self) -> Result<Controller, ConfigError> {
        let mut controller = Controller::new(self.kp, self.ki, self.kd);
        controller.set_setpoint(self.setpoint);

        if self.output_min.is_some() || self.output_max.is_some() {
            controller.set_output_limits(
                self.output_min.unwrap_or(f64::NEG_INFINITY),
                self.output_max.unwrap_or(f64::INFINITY),
            )?;
        }

        if let Some(period) = self.sample_period() {
            controller.set_sample_period(period);
        }

        debug!(
            "[{}] built controller kp={} ki={} kd={} setpoint={}",
            self.name, self.kp, self.ki, self.kd, self.setpoint
        );
        Ok(controller)
    }
}

/// Parse tuning profiles from any CSV source (header row required).
pub fn read_profiles<R: io::Read>(reader: R) -> Result<Vec<ControllerConfig>, ConfigError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut profiles = Vec::new();
    for row in rdr.deserialize::<ControllerConfig>() {
        profiles.push(row?);
    }
    Ok(profiles)
}

/// Load tuning profiles from a CSV file.
pub fn load_profiles<P: AsRef<Path>>(path: P) -> Result<Vec<ControllerConfig>, ConfigError> {
    let file = std::fs::File::open(path.as_ref())?;
    let profiles = read_profiles(file)?;
    info!("Loaded {} profile(s) from {:?}", profiles.len(), path.as_ref());
    Ok(profiles)
}

pub fn find_profile<'a>(
    profiles: &'a [ControllerConfig],
    name: &str,
) -> Result<&'a ControllerConfig, ConfigError> {
    profiles
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
name,kp,ki,kd,setpoint,output_min,output_max,sample_period_ms
thermostat, 0.6, 1.2, 0.075, 72, 0, 1, 1000
motor,1.2,0.01,0.2,0,-50,50,
heater,2,0.5,0,40,0,,
";

    #[test]
    fn reads_profile_table() {
        let profiles = read_profiles(TABLE.as_bytes()).unwrap();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0], ControllerConfig::thermostat());

        let motor = find_profile(&profiles, "motor").unwrap();
        assert_eq!(motor.output_min, Some(-50.0));
        assert_eq!(motor.sample_period_ms, None);

        let heater = find_profile(&profiles, "heater").unwrap();
        assert_eq!(heater.output_max, None);
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let profiles = read_profiles(TABLE.as_bytes()).unwrap();
        assert!(matches!(
            find_profile(&profiles, "fan"),
            Err(ConfigError::UnknownProfile(name)) if name == "fan"
        ));
    }

    #[test]
    fn malformed_row_is_reported() {
        let table = "name,kp,ki,kd\nbad,abc,0,0\n";
        assert!(matches!(read_profiles(table.as_bytes()), Err(ConfigError::Csv(_))));
    }

    #[test]
    fn one_sided_bound_builds() {
        let profiles = read_profiles(TABLE.as_bytes()).unwrap();
        let controller = find_profile(&profiles, "heater").unwrap().build().unwrap();
        let limits = controller.output_limits().unwrap();
        assert_eq!(limits.min(), 0.0);
        assert_eq!(limits.max(), f64::INFINITY);
    }

    #[test]
    fn inverted_limits_fail_to_build() {
        let config = ControllerConfig::new().with_output_limits(100.0, 1.0);
        assert!(matches!(config.build(), Err(ConfigError::Limits(_))));
    }

    #[test]
    fn builder_applies_every_field() {
        let controller = ControllerConfig::thermostat().build().unwrap();
        assert_eq!(controller.setpoint(), 72.0);
        assert_eq!(controller.gains().ki, 1.2);
        assert_eq!(controller.sample_period(), Duration::from_secs(1));
    }
}
