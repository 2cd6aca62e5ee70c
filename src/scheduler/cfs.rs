use super::{EnqueueFlags, Scheduler, SimCtx, TaskId};
use crate::{
    core::{DsqId, Task, Time, Vtime},
    sim::config::CfsConfig,
};

pub const NICE_0_WEIGHT: f64 = 1024.0;
pub const MIN_NICE: i32 = -20;
pub const MAX_NICE: i32 = 19;

// Linux sched_prio_to_weight, nice -20 ..= 19
const NICE_TO_WEIGHT: [u32; 40] = [
    /* -20 */ 88761, 71755, 56483, 46273, 36291,
    /* -15 */ 29154, 23254, 18705, 14949, 11916,
    /* -10 */ 9548, 7620, 6100, 4904, 3906,
    /*  -5 */ 3121, 2501, 1991, 1586, 1277,
    /*   0 */ 1024, 820, 655, 526, 423,
    /*   5 */ 335, 272, 215, 172, 137,
    /*  10 */ 110, 87, 70, 56, 45,
    /*  15 */ 36, 29, 23, 18, 15,
];

/// Load weight for a nice value, clamped to the valid range.
pub fn nice_to_weight(nice: i32) -> f64 {
    let index = (nice.clamp(MIN_NICE, MAX_NICE) - MIN_NICE) as usize;
    f64::from(NICE_TO_WEIGHT[index])
}

/// Explicit weight override, else the nice table.
pub fn task_weight(task: &Task) -> f64 {
    task.spec
        .weight
        .unwrap_or_else(|| nice_to_weight(task.spec.nice))
}

/// Completely fair scheduler: always run the task with the least
/// weight-scaled runtime.
pub struct CfsScheduler {
    rq: DsqId,
    target_latency: Time,
    min_granularity: Time,
    // Indexed by TaskId
    weights: Vec<f64>,
    queued_weight: f64,
}

impl Scheduler for CfsScheduler {
    type Config = CfsConfig;

    fn init(ctx: &mut SimCtx, config: &CfsConfig) -> Self {
        Self {
            rq: ctx.create_dsq_priq(),
            target_latency: config.target_latency,
            min_granularity: config.min_granularity,
            weights: ctx.tasks.iter().map(task_weight).collect(),
            queued_weight: 0.0,
        }
    }

    fn name(&self) -> String {
        "CFS".to_string()
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, _flags: EnqueueFlags) {
        let t = ctx.task(task);
        let vtime = Vtime::new(t.vruntime, t.pid());
        ctx.dsq_push_priq(self.rq, task, vtime);
        self.queued_weight += self.weights[task];
    }

    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<TaskId> {
        let task = ctx.dsq_pop(self.rq)?;
        self.queued_weight -= self.weights[task];
        if ctx.dsq_len(self.rq) == 0 {
            self.queued_weight = 0.0;
        }
        Some(task)
    }

    // Proportional share of the target latency, never below min granularity
    fn time_slice(&mut self, _ctx: &mut SimCtx, task: TaskId) -> Time {
        let weight = self.weights[task];
        let total = self.queued_weight + weight;
        (self.target_latency * weight / total).max(self.min_granularity)
    }

    fn stopping(&mut self, ctx: &mut SimCtx, task: TaskId, ran: Time, _completed: bool) {
        let weight = self.weights[task];
        ctx.task_mut(task).vruntime += ran * NICE_0_WEIGHT / weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Algorithm, ProcessSpec, SchedulingConfig, SchedulingRequest, SchedulingResult,
        core::EntryKind, simulate,
    };

    fn run(processes: Vec<ProcessSpec>, target_latency: Time, min_granularity: Time) -> SchedulingResult {
        let request =
            SchedulingRequest::new(processes, Algorithm::Cfs).with_config(SchedulingConfig {
                context_switch_cost: 0.0,
                cfs_config: Some(CfsConfig {
                    target_latency,
                    min_granularity,
                }),
                ..SchedulingConfig::default()
            });
        simulate(&request).unwrap()
    }

    fn completion(result: &SchedulingResult, pid: u64) -> f64 {
        result
            .processes
            .iter()
            .find(|p| p.pid == pid)
            .map(|p| p.completion_time)
            .unwrap()
    }

    #[test]
    fn weight_table_matches_linux() {
        assert_eq!(nice_to_weight(-20), 88761.0);
        assert_eq!(nice_to_weight(0), 1024.0);
        assert_eq!(nice_to_weight(1), 820.0);
        assert_eq!(nice_to_weight(19), 15.0);
        assert_eq!(nice_to_weight(40), 15.0);
    }

    #[test]
    fn equal_nice_tasks_share_cpu_evenly() {
        let result = run(
            vec![ProcessSpec::new(1, 0.0, 10.0), ProcessSpec::new(2, 0.0, 10.0)],
            2.0,
            0.5,
        );

        // Walk the timeline; received CPU never differs by more than one unit
        let (mut p1, mut p2) = (0.0, 0.0);
        for entry in result.schedule.iter().filter(|e| e.kind == EntryKind::Execution) {
            match entry.process_id {
                Some(1) => p1 += entry.duration(),
                Some(2) => p2 += entry.duration(),
                other => panic!("unexpected entry {other:?}"),
            }
            assert!((p1 - p2).abs() <= 1.0 + 1e-9);
        }
        assert_eq!(completion(&result, 1), 19.0);
        assert_eq!(completion(&result, 2), 20.0);
    }

    #[test]
    fn heavier_task_gets_longer_slices() {
        // P2 at nice -5 outweighs P1 roughly 3:1
        let result = run(
            vec![
                ProcessSpec::new(1, 0.0, 10.0),
                ProcessSpec::new(2, 0.0, 10.0).with_nice(-5),
            ],
            20.0,
            1.0,
        );
        assert!(completion(&result, 2) < completion(&result, 1));

        let first = &result.schedule[0];
        assert_eq!(first.process_id, Some(1));
        assert!((first.duration() - 20.0 * 1024.0 / 4145.0).abs() < 1e-9);
    }

    #[test]
    fn min_granularity_floors_slice() {
        let processes = (1..=10).map(|pid| ProcessSpec::new(pid, 0.0, 3.0)).collect();
        let result = run(processes, 4.0, 1.5);
        let first = &result.schedule[0];
        assert_eq!(first.duration(), 1.5);
    }

    #[test]
    fn vruntime_advances_inversely_to_weight() {
        let specs = [
            ProcessSpec::new(1, 0.0, 10.0),
            ProcessSpec::new(2, 0.0, 10.0).with_weight(2048.0),
        ];
        let mut ctx = SimCtx::new(&specs, 0.0).unwrap();
        let mut cfs = CfsScheduler::init(
            &mut ctx,
            &CfsConfig {
                target_latency: 6.0,
                min_granularity: 1.0,
            },
        );
        ctx.admit_arrivals();

        cfs.stopping(&mut ctx, 0, 2.0, false);
        cfs.stopping(&mut ctx, 1, 2.0, false);
        assert_eq!(ctx.task(0).vruntime, 2.0);
        assert_eq!(ctx.task(1).vruntime, 1.0);
    }
}
