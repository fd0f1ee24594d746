//! Application layer - the price tracking loop

pub mod scheduler;

pub use scheduler::{Clock, CycleReport, Scheduler, SchedulerConfig, SchedulerState, SystemClock};
