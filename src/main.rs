//! # pidctrl demo
//! Drives the PID controller against a simulated room heater.
//!
//! ## Modes
//! - **Step response:** fixed-step simulated run of every built-in profile, exported to CSV.
//! - **Real time:** wall-clock paced loop on its own thread; the setpoint is changed halfway
//!   through via the command channel.
//! - **Profiles:** load tuning profiles from a CSV table and run the step response for each.
//!
//! ## Outputs
//! - `data/trace_<profile>.csv`: one row per control cycle.
//! - `data/summary.csv`: step-response metrics, one row appended per run.

use std::{
    io::{BufRead, Write, stdin, stdout},
    thread,
    time::Duration,
};

use log::{error, info, warn};

use pidctrl::{
    config::{ControllerConfig, load_profiles},
    control_loop::{LoopCommand, SimulationConfig, realtime, run_simulated},
    plant::ThermalPlant,
    utils::{
        export::{write_summary, write_trace},
        metrics::step_metrics,
    },
};

const DATA_DIR: &str = "data";
const SIM_STEPS: u64 = 1_200;
const SIM_DT: Duration = Duration::from_millis(100);
const SETTLING_BAND: f64 = 0.5;
const SENSOR_NOISE: f64 = 0.05;
const REALTIME_PERIOD: Duration = Duration::from_millis(5);
const REALTIME_SECS: u64 = 4;

fn builtin_profiles() -> Vec<ControllerConfig> {
    vec![
        ControllerConfig::new()
            .with_name("room")
            .with_kp(0.5)
            .with_ki(0.05)
            .with_setpoint(72.0)
            .with_output_limits(0.0, 1.0)
            .with_sample_period(SIM_DT),
        ControllerConfig::thermostat(),
    ]
}

fn main() {
    env_logger::init();
    info!("=== PIDCTRL DEMO START ===");

    loop {
        let Some(choice) = prompt_menu() else {
            info!("input closed, exiting");
            break;
        };
        match choice.as_str() {
            "1" | "" => {
                for profile in builtin_profiles() {
                    run_step_response(&profile);
                }
            }
            "2" => run_realtime(),
            "3" => {
                let Some(path) = prompt("Profile CSV path [default: profiles.csv]: ") else {
                    info!("input closed, exiting");
                    break;
                };
                let path = if path.is_empty() { "profiles.csv".to_string() } else { path };
                match load_profiles(&path) {
                    Ok(profiles) => profiles.iter().for_each(run_step_response),
                    Err(e) => error!("Failed to load {}: {}", path, e),
                }
            }
            "4" => {
                println!("Exiting. Goodbye!");
                break;
            }
            other => println!("Unrecognized option '{}', please try again.", other),
        }
    }
    info!("=== PIDCTRL DEMO FINISHED ===");
}

fn prompt_menu() -> Option<String> {
    println!("\n┌─────────────────────────────────────────────┐");
    println!("│     PIDCTRL DEMO                            │");
    println!("├─────────────────────────────────────────────┤");
    println!("│  1) Step response (built-in profiles)       │");
    println!("│  2) Real-time paced loop                    │");
    println!("│  3) Step response from profile CSV          │");
    println!("│  4) Exit                                    │");
    println!("└─────────────────────────────────────────────┘");
    prompt("Select [1/2/3/4] (default: 1): ")
}

/// `None` once stdin is closed or unreadable.
fn prompt(text: &str) -> Option<String> {
    print!("{}", text);
    stdout().flush().ok();
    read_answer(&mut stdin().lock())
}

fn read_answer<R: BufRead>(reader: &mut R) -> Option<String> {
    let mut input = String::new();
    match reader.read_line(&mut input) {
        Ok(0) => None,
        Ok(_) => Some(input.trim().to_string()),
        Err(e) => {
            error!("failed to read input: {}", e);
            None
        }
    }
}

fn run_step_response(profile: &ControllerConfig) {
    let mut controller = match profile.build() {
        Ok(c) => c,
        Err(e) => {
            error!("[{}] invalid profile: {}", profile.name, e);
            return;
        }
    };
    let dt = profile.sample_period().unwrap_or(SIM_DT);
    let mut plant = ThermalPlant::room().with_noise(SENSOR_NOISE, 42);

    let trace = run_simulated(&mut controller, &mut plant, &SimulationConfig::new(SIM_STEPS, dt));

    if let Err(e) = write_trace(format!("{}/trace_{}.csv", DATA_DIR, profile.name), &trace) {
        error!("[{}] trace export failed: {}", profile.name, e);
    }

    match step_metrics(&trace, SETTLING_BAND) {
        Some(m) => {
            println!(
                "[{}] overshoot {:.2}, settling {}, steady-state error {:.3}, saturated {:.0}%",
                profile.name,
                m.overshoot,
                m.settling_time_s.map_or("never".to_string(), |t| format!("{:.1}s", t)),
                m.steady_state_error,
                m.saturation_ratio * 100.0
            );
            if let Err(e) = write_summary(format!("{}/summary.csv", DATA_DIR), &profile.name, &m) {
                error!("[{}] summary export failed: {}", profile.name, e);
            }
        }
        None => warn!("[{}] empty trace", profile.name),
    }
}

fn run_realtime() {
    let profile = &builtin_profiles()[0];
    let controller = match profile.build() {
        Ok(c) => c,
        Err(e) => {
            error!("[{}] invalid profile: {}", profile.name, e);
            return;
        }
    };

    println!("Running paced loop for {}s at {:?} ...", REALTIME_SECS, REALTIME_PERIOD);
    let plant = ThermalPlant::room().with_noise(SENSOR_NOISE, 7);
    let handle = realtime::spawn(controller, plant, REALTIME_PERIOD, None);

    thread::sleep(Duration::from_secs(REALTIME_SECS / 2));
    if let Err(e) = handle.send(LoopCommand::SetSetpoint(profile.setpoint + 5.0)) {
        warn!("setpoint change not delivered: {}", e);
    }
    thread::sleep(Duration::from_secs(REALTIME_SECS - REALTIME_SECS / 2));

    let report = match handle.stop() {
        Ok(r) => r,
        Err(_) => {
            error!("control loop thread panicked");
            return;
        }
    };

    println!(
        "{} cycles, {} overruns, final setpoint {} ({} oldest samples not kept)",
        report.cycles,
        report.overruns,
        report.controller.setpoint(),
        report.trace.dropped()
    );
    if let Err(e) = write_trace(format!("{}/trace_realtime.csv", DATA_DIR), &report.trace) {
        error!("realtime trace export failed: {}", e);
    }
}
