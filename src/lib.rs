pub mod core;
pub mod error;
pub mod scheduler;
pub mod sim;

pub use crate::core::{EntryKind, SchedCoreEvent, ScheduleEntry};
pub use error::SchedError;
pub use scheduler::{Policy, Scheduler};
pub use sim::{
    Algorithm, CfsConfig, MlfqConfig, Pid, PriorityMode, ProcessResult, ProcessSpec,
    RrVariation, SchedulingConfig, SchedulingMetrics, SchedulingRequest, SchedulingResult, Sim,
    simulate,
};
