use thiserror::Error;

use crate::sim::job::Pid;

/// Everything that can reject a scheduling request.
///
/// All variants are produced by validation before the simulation loop
/// starts; a validated run cannot fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedError {
    #[error("workload contains no processes")]
    EmptyWorkload,

    #[error("invalid process {pid}: {reason}")]
    InvalidProcess { pid: Pid, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown scheduling algorithm `{0}`")]
    UnknownAlgorithm(String),
}

impl SchedError {
    pub fn invalid_process(pid: Pid, reason: impl Into<String>) -> Self {
        Self::InvalidProcess {
            pid,
            reason: reason.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}
