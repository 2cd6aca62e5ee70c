use super::{EnqueueFlags, Scheduler, SimCtx, TaskId};
use crate::core::{DsqId, Time};

/// First-come first-served. Admission already happens in (arrival, pid)
/// order, so a single FIFO queue gives the FCFS order directly.
pub struct FifoScheduler {
    global_dsq: DsqId,
}

impl Scheduler for FifoScheduler {
    type Config = ();

    fn init(ctx: &mut SimCtx, _config: &()) -> Self {
        Self {
            global_dsq: ctx.create_dsq_fifo(),
        }
    }

    fn name(&self) -> String {
        "FCFS".to_string()
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, _flags: EnqueueFlags) {
        ctx.dsq_push_fifo(self.global_dsq, task);
    }

    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<TaskId> {
        ctx.dsq_pop(self.global_dsq)
    }

    // Non-preemptive
    fn time_slice(&mut self, ctx: &mut SimCtx, task: TaskId) -> Time {
        ctx.task(task).remaining
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Algorithm, ProcessSpec, SchedulingConfig, SchedulingRequest, core::EntryKind, simulate,
    };

    fn fcfs(processes: Vec<ProcessSpec>, switch_cost: f64) -> SchedulingRequest {
        SchedulingRequest::new(processes, Algorithm::Fcfs).with_config(SchedulingConfig {
            context_switch_cost: switch_cost,
            ..SchedulingConfig::default()
        })
    }

    #[test]
    fn fcfs_with_switch_cost() {
        let request = fcfs(
            vec![
                ProcessSpec::new(1, 0.0, 8.0),
                ProcessSpec::new(2, 1.0, 4.0),
                ProcessSpec::new(3, 2.0, 9.0),
                ProcessSpec::new(4, 3.0, 5.0),
            ],
            1.0,
        );
        let result = simulate(&request).unwrap();

        let completions = result
            .processes
            .iter()
            .map(|p| (p.pid, p.completion_time))
            .collect::<Vec<_>>();
        assert_eq!(completions, vec![(1, 8.0), (2, 13.0), (3, 23.0), (4, 29.0)]);

        let kinds = result.schedule.iter().map(|e| e.kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                EntryKind::Execution,
                EntryKind::ContextSwitch,
                EntryKind::Execution,
                EntryKind::ContextSwitch,
                EntryKind::Execution,
                EntryKind::ContextSwitch,
                EntryKind::Execution,
            ]
        );

        let p2 = &result.processes[1];
        assert_eq!(p2.waiting_time, 8.0);
        assert_eq!(p2.response_time, 8.0);
        assert_eq!(result.metrics.context_switches, 3);
        assert_eq!(result.metrics.total_time, 29.0);
        assert_eq!(result.metrics.cpu_utilization, 100.0);
        assert_eq!(result.algorithm, "FCFS");
    }

    #[test]
    fn fcfs_idles_until_late_arrival() {
        let request = fcfs(
            vec![ProcessSpec::new(1, 0.0, 2.0), ProcessSpec::new(2, 5.0, 1.0)],
            0.0,
        );
        let result = simulate(&request).unwrap();

        let idle = &result.schedule[1];
        assert_eq!(idle.kind, EntryKind::Idle);
        assert_eq!((idle.start_time, idle.end_time), (2.0, 5.0));
        assert_eq!(result.processes[1].completion_time, 6.0);
        assert_eq!(result.metrics.cpu_utilization, 50.0);
    }
}
