use std::{fmt, str::FromStr};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::job::{Pid, ProcessSpec};
use crate::{
    core::Time,
    error::SchedError,
    scheduler::cfs::{MAX_NICE, MIN_NICE},
};

pub const DEFAULT_CONTEXT_SWITCH_COST: Time = 0.5;
/// Dynamic priority improves by one level per this much time since arrival.
pub const PRIORITY_AGING_INTERVAL: Time = 10.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    Fcfs,
    Sjf,
    Srtf,
    Priority,
    RoundRobin,
    Mlfq,
    Cfs,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Fcfs,
        Algorithm::Sjf,
        Algorithm::Srtf,
        Algorithm::Priority,
        Algorithm::RoundRobin,
        Algorithm::Mlfq,
        Algorithm::Cfs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Fcfs => "FCFS",
            Algorithm::Sjf => "SJF",
            Algorithm::Srtf => "SRTF",
            Algorithm::Priority => "Priority",
            Algorithm::RoundRobin => "RoundRobin",
            Algorithm::Mlfq => "MLFQ",
            Algorithm::Cfs => "CFS",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Algorithm::Fcfs => "First Come First Serve",
            Algorithm::Sjf => "Shortest Job First",
            Algorithm::Srtf => "Shortest Remaining Time First",
            Algorithm::Priority => "Priority Scheduling",
            Algorithm::RoundRobin => "Round Robin",
            Algorithm::Mlfq => "Multi-Level Feedback Queue",
            Algorithm::Cfs => "Completely Fair Scheduler",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "fcfs" | "fifo" => Ok(Algorithm::Fcfs),
            "sjf" => Ok(Algorithm::Sjf),
            "srtf" => Ok(Algorithm::Srtf),
            "priority" => Ok(Algorithm::Priority),
            "round_robin" | "roundrobin" | "rr" => Ok(Algorithm::RoundRobin),
            "mlfq" => Ok(Algorithm::Mlfq),
            "cfs" => Ok(Algorithm::Cfs),
            _ => Err(SchedError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = SchedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(algorithm: Algorithm) -> Self {
        algorithm.as_str().to_string()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityMode {
    #[default]
    Fixed,
    Dynamic,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RrVariation {
    #[default]
    Standard,
    Weighted,
    Deficit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlfqConfig {
    pub num_queues: usize,
    pub time_quantums: Vec<Time>,
    pub aging_threshold: Time,
    pub boost_interval: Time,
}

impl Default for MlfqConfig {
    fn default() -> Self {
        Self {
            num_queues: 3,
            time_quantums: vec![2.0, 4.0, 8.0],
            aging_threshold: 10.0,
            boost_interval: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CfsConfig {
    pub target_latency: Time,
    pub min_granularity: Time,
}

impl Default for CfsConfig {
    fn default() -> Self {
        Self {
            target_latency: 20.0,
            min_granularity: 1.0,
        }
    }
}

/// Everything a request may tune. Fields that do not apply to the chosen
/// algorithm are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub context_switch_cost: Time,
    pub time_quantum: Option<Time>,
    pub preemptive: bool,
    pub priority_mode: PriorityMode,
    pub mlfq_config: Option<MlfqConfig>,
    pub cfs_config: Option<CfsConfig>,
    pub rr_variation: RrVariation,
    pub process_weights: FxHashMap<Pid, f64>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            context_switch_cost: DEFAULT_CONTEXT_SWITCH_COST,
            time_quantum: None,
            preemptive: false,
            priority_mode: PriorityMode::Fixed,
            mlfq_config: None,
            cfs_config: None,
            rr_variation: RrVariation::Standard,
            process_weights: FxHashMap::default(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PriorityConfig {
    pub mode: PriorityMode,
    pub preemptive: bool,
    pub aging_interval: Time,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundRobinConfig {
    pub quantum: Time,
    pub variation: RrVariation,
    pub weights: FxHashMap<Pid, f64>,
}

/// A validated, fully-resolved policy choice.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyConfig {
    Fcfs,
    Sjf,
    Srtf,
    Priority(PriorityConfig),
    RoundRobin(RoundRobinConfig),
    Mlfq(MlfqConfig),
    Cfs(CfsConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingRequest {
    pub processes: Vec<ProcessSpec>,
    pub algorithm: Algorithm,
    #[serde(default)]
    pub config: SchedulingConfig,
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl SchedulingRequest {
    pub fn new(processes: Vec<ProcessSpec>, algorithm: Algorithm) -> Self {
        Self {
            processes,
            algorithm,
            config: SchedulingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SchedulingConfig) -> Self {
        self.config = config;
        self
    }

    /// Check the whole request and resolve the policy to run. Nothing is
    /// simulated unless this succeeds.
    pub fn validate(&self) -> Result<PolicyConfig, SchedError> {
        self.validate_processes()?;

        let config = &self.config;
        if !is_non_negative(config.context_switch_cost) {
            return Err(SchedError::invalid_config(format!(
                "context_switch_cost must be a non-negative number, got {}",
                config.context_switch_cost
            )));
        }

        let policy = match self.algorithm {
            Algorithm::Fcfs => PolicyConfig::Fcfs,
            Algorithm::Sjf if config.preemptive => PolicyConfig::Srtf,
            Algorithm::Sjf => PolicyConfig::Sjf,
            Algorithm::Srtf => PolicyConfig::Srtf,
            Algorithm::Priority => PolicyConfig::Priority(PriorityConfig {
                mode: config.priority_mode,
                preemptive: config.preemptive,
                aging_interval: PRIORITY_AGING_INTERVAL,
            }),
            Algorithm::RoundRobin => PolicyConfig::RoundRobin(self.round_robin_config()?),
            Algorithm::Mlfq => PolicyConfig::Mlfq(self.mlfq_config()?),
            Algorithm::Cfs => PolicyConfig::Cfs(self.cfs_config()?),
        };

        Ok(policy)
    }

    fn validate_processes(&self) -> Result<(), SchedError> {
        if self.processes.is_empty() {
            return Err(SchedError::EmptyWorkload);
        }

        let mut seen = FxHashSet::default();
        for spec in &self.processes {
            let pid = spec.pid;
            if !seen.insert(pid) {
                return Err(SchedError::invalid_process(pid, "duplicate pid"));
            }

            if !is_non_negative(spec.arrival_time) {
                return Err(SchedError::invalid_process(
                    pid,
                    format!("arrival_time must be >= 0, got {}", spec.arrival_time),
                ));
            }
            if !is_positive(spec.burst_time) {
                return Err(SchedError::invalid_process(
                    pid,
                    format!("burst_time must be > 0, got {}", spec.burst_time),
                ));
            }
            if let Some(weight) = spec.weight
                && !is_positive(weight)
            {
                return Err(SchedError::invalid_process(
                    pid,
                    format!("weight must be > 0, got {weight}"),
                ));
            }
            if self.algorithm == Algorithm::Cfs && !(MIN_NICE..=MAX_NICE).contains(&spec.nice) {
                return Err(SchedError::invalid_process(
                    pid,
                    format!("nice must be within {MIN_NICE}..={MAX_NICE}, got {}", spec.nice),
                ));
            }
        }

        Ok(())
    }

    fn round_robin_config(&self) -> Result<RoundRobinConfig, SchedError> {
        let config = &self.config;
        let quantum = match config.time_quantum {
            Some(q) if is_positive(q) => q,
            Some(q) => {
                return Err(SchedError::invalid_config(format!(
                    "time_quantum must be greater than 0, got {q}"
                )));
            }
            None => {
                return Err(SchedError::invalid_config(
                    "time_quantum is required for round robin scheduling",
                ));
            }
        };

        if let Some((pid, weight)) = config
            .process_weights
            .iter()
            .find(|(_, weight)| !is_positive(**weight))
        {
            return Err(SchedError::invalid_config(format!(
                "process_weights[{pid}] must be > 0, got {weight}"
            )));
        }

        Ok(RoundRobinConfig {
            quantum,
            variation: config.rr_variation,
            weights: config.process_weights.clone(),
        })
    }

    fn mlfq_config(&self) -> Result<MlfqConfig, SchedError> {
        let mut mlfq = self.config.mlfq_config.clone().unwrap_or_default();

        if mlfq.num_queues < 1 {
            return Err(SchedError::invalid_config("mlfq num_queues must be at least 1"));
        }
        let Some(&last) = mlfq.time_quantums.last() else {
            return Err(SchedError::invalid_config("mlfq time_quantums must not be empty"));
        };
        if let Some(q) = mlfq.time_quantums.iter().find(|q| !is_positive(**q)) {
            return Err(SchedError::invalid_config(format!(
                "mlfq time quantums must be > 0, got {q}"
            )));
        }
        if !is_non_negative(mlfq.aging_threshold) {
            return Err(SchedError::invalid_config(format!(
                "mlfq aging_threshold must be >= 0, got {}",
                mlfq.aging_threshold
            )));
        }
        if !is_non_negative(mlfq.boost_interval) {
            return Err(SchedError::invalid_config(format!(
                "mlfq boost_interval must be >= 0, got {}",
                mlfq.boost_interval
            )));
        }

        // One quantum per level; short lists repeat their last entry
        mlfq.time_quantums.resize(mlfq.num_queues, last);
        Ok(mlfq)
    }

    fn cfs_config(&self) -> Result<CfsConfig, SchedError> {
        let cfs = self.config.cfs_config.clone().unwrap_or_default();
        if !is_positive(cfs.target_latency) {
            return Err(SchedError::invalid_config(format!(
                "cfs target_latency must be > 0, got {}",
                cfs.target_latency
            )));
        }
        if !is_positive(cfs.min_granularity) {
            return Err(SchedError::invalid_config(format!(
                "cfs min_granularity must be > 0, got {}",
                cfs.min_granularity
            )));
        }
        Ok(cfs)
    }
}
