pub mod config;
pub mod driver;
pub mod job;
pub mod metrics;

pub use config::{
    Algorithm, CfsConfig, MlfqConfig, PriorityMode, RrVariation, SchedulingConfig,
    SchedulingRequest,
};
pub use driver::{Sim, SchedulingResult, simulate};
pub use job::{Pid, ProcessResult, ProcessSpec};
pub use metrics::SchedulingMetrics;
