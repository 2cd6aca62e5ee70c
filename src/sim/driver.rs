use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    config::SchedulingRequest,
    job::{ProcessResult, ProcessSpec},
    metrics::SchedulingMetrics,
};
use crate::{
    core::{SchedCore, SchedCoreEvent, ScheduleEntry, SimCtx, Time},
    error::SchedError,
    scheduler::{Policy, Scheduler},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingResult {
    // Completion order
    pub processes: Vec<ProcessResult>,
    pub schedule: Vec<ScheduleEntry>,
    pub metrics: SchedulingMetrics,
    pub algorithm: String,
}

/// One simulation run over a fixed workload.
pub struct Sim<S: Scheduler> {
    pub core: SchedCore<S>,
}

impl<S: Scheduler> Sim<S> {
    pub fn new(
        processes: &[ProcessSpec],
        switch_cost: Time,
        config: &S::Config,
    ) -> Result<Self, SchedError> {
        let ctx = SimCtx::new(processes, switch_cost)?;
        Ok(Self {
            core: SchedCore::new(ctx, config),
        })
    }

    /// Advance by one scheduling decision (or one idle gap).
    pub fn step(&mut self) -> Vec<SchedCoreEvent> {
        self.core.step()
    }

    pub fn all_jobs_completed(&self) -> bool {
        self.core.ctx.all_completed()
    }

    pub fn results(&self) -> Vec<ProcessResult> {
        let ctx = &self.core.ctx;
        ctx.completion_order()
            .iter()
            .filter_map(|&task| ProcessResult::from_task(ctx.task(task)))
            .collect()
    }

    /// Drive to completion and summarise.
    pub fn run(mut self) -> SchedulingResult {
        self.core.run();
        debug!(steps = self.core.observer().steps(), "run finished");

        let processes = self.results();
        let ctx = &self.core.ctx;
        let metrics =
            SchedulingMetrics::compute(&processes, ctx.context_switches(), ctx.switch_cost());
        let algorithm = self.core.scheduler.name();

        SchedulingResult {
            processes,
            schedule: self.core.ctx.timeline.into_entries(),
            metrics,
            algorithm,
        }
    }
}

/// Validate `request` and run it to completion.
pub fn simulate(request: &SchedulingRequest) -> Result<SchedulingResult, SchedError> {
    let policy = request.validate()?;
    let sim = Sim::<Policy>::new(
        &request.processes,
        request.config.context_switch_cost,
        &policy,
    )?;

    info!(
        algorithm = %request.algorithm,
        processes = request.processes.len(),
        switch_cost = request.config.context_switch_cost,
        "simulation start"
    );
    let result = sim.run();
    info!(
        algorithm = %result.algorithm,
        total_time = result.metrics.total_time,
        context_switches = result.metrics.context_switches,
        entries = result.schedule.len(),
        "simulation complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Algorithm, SchedulingConfig,
        core::{EntryKind, TaskState},
        scheduler::FifoScheduler,
    };

    #[test]
    fn step_reports_state_changes_and_switches() {
        let processes = [ProcessSpec::new(1, 0.0, 2.0), ProcessSpec::new(2, 0.0, 1.0)];
        let mut sim = Sim::<FifoScheduler>::new(&processes, 0.5, &()).unwrap();

        let first = sim.step();
        assert!(first.contains(&SchedCoreEvent::TaskStateChange {
            task: 0,
            pid: 1,
            from: TaskState::Pending,
            to: TaskState::Ready,
        }));
        assert!(first.contains(&SchedCoreEvent::TaskStateChange {
            task: 0,
            pid: 1,
            from: TaskState::Running,
            to: TaskState::Completed,
        }));

        let second = sim.step();
        assert!(second.contains(&SchedCoreEvent::ContextSwitch {
            from: 1,
            to: 2,
            start: 2.0,
            end: 2.5,
        }));
        assert!(sim.all_jobs_completed());
        assert!(sim.step().is_empty());
    }

    #[test]
    fn idle_step_reports_gap() {
        let processes = [ProcessSpec::new(1, 3.0, 1.0)];
        let mut sim = Sim::<FifoScheduler>::new(&processes, 0.0, &()).unwrap();

        let events = sim.step();
        assert!(events.contains(&SchedCoreEvent::CpuIdle {
            from: 0.0,
            until: 3.0
        }));
        assert!(!sim.all_jobs_completed());
    }

    #[test]
    fn results_are_in_completion_order() {
        let request = SchedulingRequest::new(
            vec![
                ProcessSpec::new(1, 0.0, 9.0),
                ProcessSpec::new(2, 0.0, 1.0),
                ProcessSpec::new(3, 0.0, 4.0),
            ],
            Algorithm::Sjf,
        );
        let result = simulate(&request).unwrap();
        let order = result.processes.iter().map(|p| p.pid).collect::<Vec<_>>();
        assert_eq!(order, vec![2, 3, 1]);
        assert_eq!(result.metrics.context_switches, 2);
    }

    #[test]
    fn result_serializes_with_wire_names() {
        let request = SchedulingRequest::new(vec![ProcessSpec::new(1, 1.0, 2.0)], Algorithm::Fcfs)
            .with_config(SchedulingConfig {
                context_switch_cost: 0.0,
                ..SchedulingConfig::default()
            });
        let result = simulate(&request).unwrap();
        assert_eq!(result.schedule[0].kind, EntryKind::Idle);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["algorithm"], "FCFS");
        assert_eq!(json["schedule"][0]["type"], "idle");
        assert!(json["schedule"][0]["process_id"].is_null());
        assert_eq!(json["schedule"][1]["type"], "execution");
        assert_eq!(json["schedule"][1]["process_id"], 1);
        assert_eq!(json["metrics"]["total_time"], 3.0);

        let back: SchedulingResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn invalid_request_produces_no_result() {
        let request = SchedulingRequest::new(Vec::new(), Algorithm::Cfs);
        assert_eq!(simulate(&request), Err(SchedError::EmptyWorkload));
    }
}
