use criterion::{criterion_group, criterion_main, Criterion};
use std::{hint::black_box, time::Duration};

use pidctrl::{
    ControllerConfig,
    control_loop::{SimulationConfig, run_simulated},
    plant::ThermalPlant,
};

const DT: Duration = Duration::from_millis(100);

fn closed_loop_bench(c: &mut Criterion) {
    let profile = ControllerConfig::new()
        .with_kp(0.5)
        .with_ki(0.05)
        .with_setpoint(72.0)
        .with_output_limits(0.0, 1.0);
    let config = SimulationConfig::new(1_000, DT);

    c.bench_function("thermal_step_response_1000", |b| {
        b.iter(|| {
            let Ok(mut controller) = profile.build() else {
                return 0;
            };
            let mut plant = ThermalPlant::room().with_noise(0.05, 42);
            let trace = run_simulated(&mut controller, &mut plant, black_box(&config));
            trace.len()
        })
    });
}

criterion_group!(benches, closed_loop_bench);
criterion_main!(benches);
