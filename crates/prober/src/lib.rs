//! Periodic HTTP(S) availability probing with fan-out dispatch and fan-in
//! recording.

pub mod cycle;
pub mod error;
pub mod probe;
pub mod recorder;
pub mod scheduler;

pub use cycle::{run_cycle, run_from_config, CycleReport, StoreMode};
pub use error::ProberError;
pub use probe::{normalize_target, Prober};
pub use recorder::Recorder;
pub use scheduler::{Scheduler, SchedulerStats};
