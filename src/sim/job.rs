use serde::{Deserialize, Serialize};

use crate::core::state::{Task, Time};

pub type Pid = u64;

/// One process of the workload, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub pid: Pid,
    #[serde(default)]
    pub arrival_time: Time,
    pub burst_time: Time,
    // Lower is more urgent
    #[serde(default)]
    pub priority: i32,
    // CFS only
    #[serde(default)]
    pub nice: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl ProcessSpec {
    pub fn new(pid: Pid, arrival_time: Time, burst_time: Time) -> Self {
        Self {
            pid,
            arrival_time,
            burst_time,
            priority: 0,
            nice: 0,
            weight: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_nice(mut self, nice: i32) -> Self {
        self.nice = nice;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub pid: Pid,
    pub arrival_time: Time,
    pub burst_time: Time,
    pub priority: i32,
    pub completion_time: Time,
    pub turnaround_time: Time,
    pub waiting_time: Time,
    pub response_time: Time,
}

impl ProcessResult {
    /// Summarise a finished task. Returns `None` while the task is still live.
    pub fn from_task(task: &Task) -> Option<Self> {
        let completion_time = task.completion_time?;
        let first_run = task.first_run_time?;
        let spec = &task.spec;

        let turnaround_time = completion_time - spec.arrival_time;
        Some(Self {
            pid: spec.pid,
            arrival_time: spec.arrival_time,
            burst_time: spec.burst_time,
            priority: spec.priority,
            completion_time,
            turnaround_time,
            waiting_time: turnaround_time - spec.burst_time,
            response_time: first_run - spec.arrival_time,
        })
    }
}
