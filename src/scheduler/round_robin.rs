use super::{ENQ_WAKEUP, EnqueueFlags, Scheduler, SimCtx, TaskId};
use crate::{
    core::{DsqId, Time},
    sim::config::{RoundRobinConfig, RrVariation},
};

/// Round-robin over a single FIFO queue.
///
/// * `Standard`: every dispatch runs for at most the quantum.
/// * `Weighted`: each task's quantum is `max(1, floor(quantum * weight))`.
/// * `Deficit`: each task accrues credit; see [`RoundRobinScheduler::time_slice`].
pub struct RoundRobinScheduler {
    dsq: DsqId,
    quantum: Time,
    variation: RrVariation,
    // Indexed by TaskId
    quanta: Vec<Time>,
}

impl Scheduler for RoundRobinScheduler {
    type Config = RoundRobinConfig;

    fn init(ctx: &mut SimCtx, config: &RoundRobinConfig) -> Self {
        let quanta = ctx
            .tasks
            .iter()
            .map(|task| match config.variation {
                RrVariation::Weighted => {
                    let weight = config
                        .weights
                        .get(&task.pid())
                        .copied()
                        .or(task.spec.weight)
                        .unwrap_or(1.0);
                    (config.quantum * weight).floor().max(1.0)
                }
                RrVariation::Standard | RrVariation::Deficit => config.quantum,
            })
            .collect();

        Self {
            dsq: ctx.create_dsq_fifo(),
            quantum: config.quantum,
            variation: config.variation,
            quanta,
        }
    }

    fn name(&self) -> String {
        match self.variation {
            RrVariation::Standard => "Round Robin".to_string(),
            RrVariation::Weighted => "Weighted Round Robin".to_string(),
            RrVariation::Deficit => "Deficit Round Robin".to_string(),
        }
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        if self.variation == RrVariation::Deficit && flags & ENQ_WAKEUP != 0 {
            ctx.task_mut(task).deficit = self.quantum;
        }
        ctx.dsq_push_fifo(self.dsq, task);
    }

    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<TaskId> {
        ctx.dsq_pop(self.dsq)
    }

    /// For deficit round-robin the quantum is added to the task's counter
    /// first, and the task may then run for the whole counter. Credit is
    /// carried across dispatches and only cleared on completion.
    fn time_slice(&mut self, ctx: &mut SimCtx, task: TaskId) -> Time {
        match self.variation {
            RrVariation::Deficit => {
                let task = ctx.task_mut(task);
                task.deficit += self.quantum;
                task.deficit
            }
            RrVariation::Standard | RrVariation::Weighted => self.quanta[task],
        }
    }

    fn stopping(&mut self, ctx: &mut SimCtx, task: TaskId, ran: Time, completed: bool) {
        if self.variation != RrVariation::Deficit {
            return;
        }
        let task = ctx.task_mut(task);
        task.deficit = if completed {
            0.0
        } else {
            (task.deficit - ran).max(0.0)
        };
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use crate::{
        Algorithm, ProcessSpec, RrVariation, SchedulingConfig, SchedulingRequest,
        SchedulingResult, simulate,
    };

    fn run(
        processes: Vec<ProcessSpec>,
        quantum: f64,
        variation: RrVariation,
        weights: FxHashMap<u64, f64>,
    ) -> SchedulingResult {
        let request = SchedulingRequest::new(processes, Algorithm::RoundRobin).with_config(
            SchedulingConfig {
                context_switch_cost: 0.0,
                time_quantum: Some(quantum),
                rr_variation: variation,
                process_weights: weights,
                ..SchedulingConfig::default()
            },
        );
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

    fn slices(result: &SchedulingResult) -> Vec<(u64, f64, f64)> {
        result
            .schedule
            .iter()
            .filter_map(|e| e.process_id.map(|pid| (pid, e.start_time, e.end_time)))
            .collect()
    }

    #[test]
    fn short_late_job_finishes_before_long_early_ones() {
        let result = run(
            vec![
                ProcessSpec::new(1, 0.0, 8.0),
                ProcessSpec::new(2, 1.0, 4.0),
                ProcessSpec::new(3, 2.0, 6.0),
                ProcessSpec::new(4, 3.0, 3.0),
            ],
            2.0,
            RrVariation::Standard,
            FxHashMap::default(),
        );

        assert_eq!(result.algorithm, "Round Robin");
        assert!(completion(&result, 4) < completion(&result, 1));
        assert!(completion(&result, 4) < completion(&result, 3));
        assert_eq!(
            slices(&result),
            vec![
                (1, 0.0, 2.0),
                (2, 2.0, 4.0),
                (3, 4.0, 6.0),
                (1, 6.0, 8.0),
                (4, 8.0, 10.0),
                (2, 10.0, 12.0),
                (3, 12.0, 14.0),
                (1, 14.0, 16.0),
                (4, 16.0, 17.0),
                (3, 17.0, 19.0),
                (1, 19.0, 21.0),
            ]
        );
    }

    #[test]
    fn large_quantum_degenerates_to_fcfs() {
        let result = run(
            vec![
                ProcessSpec::new(1, 0.0, 8.0),
                ProcessSpec::new(2, 1.0, 4.0),
                ProcessSpec::new(3, 2.0, 6.0),
            ],
            10.0,
            RrVariation::Standard,
            FxHashMap::default(),
        );
        let order = result.processes.iter().map(|p| p.pid).collect::<Vec<_>>();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(completion(&result, 3), 18.0);
    }

    #[test]
    fn weighted_quantum_scales_with_weight() {
        let mut weights = FxHashMap::default();
        weights.insert(1, 2.0);
        let result = run(
            vec![ProcessSpec::new(1, 0.0, 6.0), ProcessSpec::new(2, 0.0, 6.0)],
            2.0,
            RrVariation::Weighted,
            weights,
        );

        assert_eq!(result.algorithm, "Weighted Round Robin");
        assert_eq!(
            slices(&result),
            vec![
                (1, 0.0, 4.0),
                (2, 4.0, 6.0),
                (1, 6.0, 8.0),
                (2, 8.0, 10.0),
                (2, 10.0, 12.0),
            ]
        );
    }

    #[test]
    fn weighted_quantum_never_drops_below_one() {
        let result = run(
            vec![
                ProcessSpec::new(1, 0.0, 2.0).with_weight(0.3),
                ProcessSpec::new(2, 0.0, 2.0),
            ],
            2.0,
            RrVariation::Weighted,
            FxHashMap::default(),
        );
        assert_eq!(slices(&result)[0], (1, 0.0, 1.0));
    }

    #[test]
    fn deficit_carries_credit_between_dispatches() {
        let result = run(
            vec![ProcessSpec::new(1, 0.0, 5.0), ProcessSpec::new(2, 0.0, 3.0)],
            2.0,
            RrVariation::Deficit,
            FxHashMap::default(),
        );

        assert_eq!(result.algorithm, "Deficit Round Robin");
        // Arrival credit Q plus the per-dispatch Q gives the first run 2Q
        assert_eq!(
            slices(&result),
            vec![(1, 0.0, 4.0), (2, 4.0, 7.0), (1, 7.0, 8.0)]
        );
    }
}
