//utils: run traces, step-response metrics and CSV export
pub mod trace;
pub mod metrics;
pub mod export;
