use std::cmp::Ordering;

use super::{EnqueueFlags, Scheduler, SimCtx, TaskId, preempt::slice_until_preempted};
use crate::{
    core::{Task, Time},
    sim::job::Pid,
};

// (length, arrival_time, pid)
fn by_length(a: (Time, Time, Pid), b: (Time, Time, Pid)) -> Ordering {
    a.0.total_cmp(&b.0)
        .then_with(|| a.1.total_cmp(&b.1))
        .then_with(|| a.2.cmp(&b.2))
}

fn burst_key(task: &Task) -> (Time, Time, Pid) {
    (task.burst_time(), task.arrival_time(), task.pid())
}

fn remaining_key(task: &Task) -> (Time, Time, Pid) {
    (task.remaining, task.arrival_time(), task.pid())
}

/// Shortest job first, non-preemptive.
pub struct SjfScheduler;

impl Scheduler for SjfScheduler {
    type Config = ();

    fn init(_ctx: &mut SimCtx, _config: &()) -> Self {
        Self
    }

    fn name(&self) -> String {
        "SJF".to_string()
    }

    // Ready tasks are picked straight from the ready set
    fn enqueue(&mut self, _ctx: &mut SimCtx, _task: TaskId, _flags: EnqueueFlags) {}

    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<TaskId> {
        ctx.ready_tasks()
            .min_by(|a, b| by_length(burst_key(a), burst_key(b)))
            .map(|t| t.id)
    }

    fn time_slice(&mut self, ctx: &mut SimCtx, task: TaskId) -> Time {
        ctx.task(task).remaining
    }
}

/// Shortest remaining time first: SJF that re-evaluates whenever a shorter
/// job arrives.
pub struct SrtfScheduler;

impl Scheduler for SrtfScheduler {
    type Config = ();

    fn init(_ctx: &mut SimCtx, _config: &()) -> Self {
        Self
    }

    fn name(&self) -> String {
        "SRTF".to_string()
    }

    fn enqueue(&mut self, _ctx: &mut SimCtx, _task: TaskId, _flags: EnqueueFlags) {}

    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<TaskId> {
        ctx.ready_tasks()
            .min_by(|a, b| by_length(remaining_key(a), remaining_key(b)))
            .map(|t| t.id)
    }

    fn time_slice(&mut self, ctx: &mut SimCtx, task: TaskId) -> Time {
        let start = ctx.now;
        let running = ctx.task(task);
        slice_until_preempted(ctx, task, |other, at| {
            let running_key = (
                running.remaining - (at - start),
                running.arrival_time(),
                running.pid(),
            );
            by_length(remaining_key(other), running_key).is_lt()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Algorithm, EntryKind, ProcessSpec, SchedulingConfig, SchedulingRequest, SchedulingResult,
        simulate,
    };

    fn workload() -> Vec<ProcessSpec> {
        vec![
            ProcessSpec::new(1, 0.0, 8.0),
            ProcessSpec::new(2, 1.0, 4.0),
            ProcessSpec::new(3, 2.0, 2.0),
            ProcessSpec::new(4, 3.0, 1.0),
            ProcessSpec::new(5, 4.0, 3.0),
        ]
    }

    fn run(preemptive: bool) -> SchedulingResult {
        let request =
            SchedulingRequest::new(workload(), Algorithm::Sjf).with_config(SchedulingConfig {
                context_switch_cost: 0.0,
                preemptive,
                ..SchedulingConfig::default()
            });
        simulate(&request).unwrap()
    }

    fn completions(result: &SchedulingResult) -> Vec<(u64, f64)> {
        result
            .processes
            .iter()
            .map(|p| (p.pid, p.completion_time))
            .collect()
    }

    #[test]
    fn sjf_runs_shortest_ready_job_to_completion() {
        let result = run(false);
        assert_eq!(result.algorithm, "SJF");
        assert_eq!(
            completions(&result),
            vec![(1, 8.0), (4, 9.0), (3, 11.0), (5, 14.0), (2, 18.0)]
        );
        assert!((result.metrics.average_waiting_time - 6.4).abs() < 1e-9);
    }

    #[test]
    fn srtf_preempts_for_shorter_arrivals() {
        let result = run(true);
        assert_eq!(result.algorithm, "SRTF");
        assert_eq!(
            completions(&result),
            vec![(3, 4.0), (4, 5.0), (2, 8.0), (5, 11.0), (1, 18.0)]
        );

        let p1 = result.processes.iter().find(|p| p.pid == 1).unwrap();
        assert_eq!(p1.response_time, 0.0);
        assert_eq!(p1.waiting_time, 10.0);
    }

    #[test]
    fn srtf_beats_sjf_on_mid_run_arrivals() {
        let sjf = run(false);
        let srtf = run(true);
        assert!(srtf.metrics.average_waiting_time < sjf.metrics.average_waiting_time);
    }

    #[test]
    fn srtf_tie_keeps_earlier_arrival() {
        // P4 arrives when P3 has exactly as much work left as P4 needs
        let result = run(true);
        let p3_slices = result
            .schedule
            .iter()
            .filter(|e| e.process_id == Some(3))
            .count();
        assert_eq!(p3_slices, 1);
    }

    #[test]
    fn srtf_reselects_after_arrival_during_switch() {
        // P3 arrives at 1.2, inside the 1.0..1.5 switch to P2
        let processes = vec![
            ProcessSpec::new(1, 0.0, 1.0),
            ProcessSpec::new(2, 0.0, 100.0),
            ProcessSpec::new(3, 1.2, 1.0),
        ];
        let request = SchedulingRequest::new(processes, Algorithm::Srtf).with_config(
            SchedulingConfig {
                context_switch_cost: 0.5,
                ..SchedulingConfig::default()
            },
        );
        let result = simulate(&request).unwrap();

        let timeline = result
            .schedule
            .iter()
            .map(|e| (e.kind, e.process_id, e.start_time, e.end_time))
            .collect::<Vec<_>>();
        assert_eq!(
            timeline,
            vec![
                (EntryKind::Execution, Some(1), 0.0, 1.0),
                (EntryKind::ContextSwitch, None, 1.0, 1.5),
                (EntryKind::Execution, Some(3), 1.5, 2.5),
                (EntryKind::ContextSwitch, None, 2.5, 3.0),
                (EntryKind::Execution, Some(2), 3.0, 103.0),
            ]
        );
        assert_eq!(
            completions(&result),
            vec![(1, 1.0), (3, 2.5), (2, 103.0)]
        );
        assert_eq!(result.metrics.context_switches, 2);

        let p2 = result.processes.iter().find(|p| p.pid == 2).unwrap();
        assert_eq!(p2.response_time, 3.0);
    }
}
