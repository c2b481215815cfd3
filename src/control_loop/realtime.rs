//! realtime.rs
//! Wall-clock paced control loop on a dedicated thread.
//!
//! - The loop thread exclusively owns the `Controller`; other threads talk to it through a
//!   bounded command channel, so no lock ever guards the controller.
//! - Periodic release with `SpinSleeper`; a release that is already late counts as an overrun.
//! - Elapsed time per update comes from `Controller::compute_at` (monotonic clock).
//! - Only the most recent cycles are kept in the report trace (`TRACE_MAX_POINTS` by default).

use crossbeam::channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};

use crate::controller::Controller;
use crate::plant::Plant;
use crate::utils::trace::{Sample, Trace};

const COMMAND_CAPACITY: usize = 64;           // Bounded queue of pending commands
const SPIN_NATIVE_ACCURACY_NS: u32 = 100_000; // OS sleep accuracy assumed by SpinSleeper

/// Trace history kept by [`spawn`]: 30 s at a 1 ms period.
pub const TRACE_MAX_POINTS: usize = 30_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopCommand {
    SetSetpoint(f64),
    SetOutputLimits { min: f64, max: f64 },
    ClearOutputLimits,
    Stop,
}

/// Result of a finished run: the controller (with its final state) and what happened.
#[derive(Debug)]
pub struct LoopReport {
    pub controller: Controller,
    pub trace: Trace,
    pub cycles: u64,
    pub overruns: u64,
    pub rejected_commands: u64,
}

pub struct LoopHandle {
    tx: Sender<LoopCommand>,
    running: Arc<AtomicBool>,
    handle: JoinHandle<LoopReport>,
}

impl LoopHandle {
    /// Queue a command without blocking. Fails when the queue is full or the loop has exited.
    pub fn send(&self, command: LoopCommand) -> Result<(), TrySendError<LoopCommand>> {
        self.tx.try_send(command)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the loop and wait for its report.
    pub fn stop(self) -> thread::Result<LoopReport> {
        self.running.store(false, Ordering::Release);
        // wakes the command drain early; the cleared flag already stops the loop if this fails
        self.tx.try_send(LoopCommand::Stop).ok();
        self.handle.join()
    }
}

/// Start a loop releasing every `period` until stopped or `max_cycles` is reached.
pub fn spawn<P>(
    controller: Controller,
    plant: P,
    period: Duration,
    max_cycles: Option<u64>,
) -> LoopHandle
where
    P: Plant + Send + 'static,
{
    spawn_with_trace_cap(controller, plant, period, max_cycles, TRACE_MAX_POINTS)
}

/// [`spawn`] keeping at most `trace_points` samples of history.
pub fn spawn_with_trace_cap<P>(
    controller: Controller,
    plant: P,
    period: Duration,
    max_cycles: Option<u64>,
    trace_points: usize,
) -> LoopHandle
where
    P: Plant + Send + 'static,
{
    let (tx, rx) = bounded(COMMAND_CAPACITY);
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    let trace = Trace::capped(trace_points);

    let handle =
        thread::spawn(move || run(controller, plant, period, max_cycles, trace, rx, flag));

    LoopHandle { tx, running, handle }
}

fn run<P: Plant>(
    mut controller: Controller,
    mut plant: P,
    period: Duration,
    max_cycles: Option<u64>,
    mut trace: Trace,
    rx: Receiver<LoopCommand>,
    running: Arc<AtomicBool>,
) -> LoopReport {
    let sleeper = SpinSleeper::new(SPIN_NATIVE_ACCURACY_NS)
        .with_spin_strategy(SpinStrategy::YieldThread);

    // The first update assumes one nominal period has passed.
    controller.set_sample_period(period);

    let start = Instant::now();
    let mut next_release = start;
    let mut last_tick: Option<Instant> = None;
    let mut last_output = 0.0;
    let mut cycles: u64 = 0;
    let mut overruns: u64 = 0;
    let mut rejected_commands: u64 = 0;

    'control: while running.load(Ordering::Acquire) {
        if max_cycles.is_some_and(|max| cycles >= max) {
            break;
        }

        // ====================================================================
        // Periodic release
        // ====================================================================
        let now = Instant::now();
        if now < next_release {
            sleeper.sleep(next_release - now);
        } else if cycles > 0 {
            overruns += 1;
            debug!("release {} late by {:?}", cycles, now - next_release);
        }
        let tick = Instant::now();

        // ====================================================================
        // Commands from other threads (applied between updates)
        // ====================================================================
        loop {
            match rx.try_recv() {
                Ok(LoopCommand::SetSetpoint(sp)) => controller.set_setpoint(sp),
                Ok(LoopCommand::SetOutputLimits { min, max }) => {
                    if let Err(e) = controller.set_output_limits(min, max) {
                        rejected_commands += 1;
                        error!("command rejected: {}", e);
                    }
                }
                Ok(LoopCommand::ClearOutputLimits) => controller.clear_output_limits(),
                Ok(LoopCommand::Stop) => break 'control,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("command channel closed, stopping loop");
                    break 'control;
                }
            }
        }

        // ====================================================================
        // Control cycle: plant advances by the real time since the previous tick
        // ====================================================================
        if let Some(prev) = last_tick {
            plant.step(last_output, (tick - prev).as_secs_f64());
        }
        last_tick = Some(tick);

        let measurement = plant.measure();
        let terms = controller.compute_at(measurement, tick);
        last_output = terms.output;
        trace.push(Sample::from_terms(
            cycles,
            (tick - start).as_secs_f64(),
            controller.setpoint(),
            measurement,
            &terms,
        ));

        cycles += 1;
        next_release += period;
    }

    running.store(false, Ordering::Release);
    info!(
        "control loop stopped after {} cycles ({} overruns, {} rejected commands)",
        cycles, overruns, rejected_commands
    );

    LoopReport {
        controller,
        trace,
        cycles,
        overruns,
        rejected_commands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plant::ThermalPlant;

    #[test]
    fn stops_after_max_cycles() {
        let controller = Controller::new(0.5, 0.05, 0.0);
        let handle = spawn(controller, ThermalPlant::room(), Duration::from_millis(1), Some(20));
        while handle.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        let report = handle.stop().unwrap();
        assert_eq!(report.cycles, 20);
        assert_eq!(report.trace.len(), 20);
        assert_eq!(report.trace.last().map(|s| s.step), Some(19));
    }

    #[test]
    fn long_run_keeps_only_recent_history() {
        let controller = Controller::new(0.5, 0.05, 0.0);
        let handle = spawn_with_trace_cap(
            controller,
            ThermalPlant::room(),
            Duration::from_micros(100),
            Some(200),
            16,
        );
        while handle.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        let report = handle.stop().unwrap();

        assert_eq!(report.cycles, 200);
        assert_eq!(report.trace.len(), 16);
        assert_eq!(report.trace.dropped(), 184);
        assert_eq!(report.trace.first().map(|s| s.step), Some(184));
        assert_eq!(report.trace.last().map(|s| s.step), Some(199));
    }

    #[test]
    fn default_spawn_caps_the_trace() {
        let controller = Controller::new(1.0, 0.0, 0.0);
        let handle = spawn(controller, ThermalPlant::room(), Duration::from_millis(1), Some(1));
        while handle.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        let report = handle.stop().unwrap();
        assert_eq!(report.trace.max_points(), Some(TRACE_MAX_POINTS));
    }

    #[test]
    fn elapsed_time_is_never_negative() {
        let controller = Controller::new(1.0, 1.0, 1.0);
        let handle = spawn(controller, ThermalPlant::room(), Duration::from_millis(1), Some(30));
        while handle.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        let report = handle.stop().unwrap();
        let times: Vec<f64> = report.trace.iter().map(|s| s.time_s).collect();
        assert!(times.windows(2).all(|w| w[1] >= w[0]));
        assert!(report.trace.iter().all(|s| s.output.is_finite()));
    }
}
