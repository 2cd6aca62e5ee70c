use std::cmp::Ordering;

use super::{EnqueueFlags, Scheduler, SimCtx, TaskId, preempt::slice_until_preempted};
use crate::{
    core::{Task, Time},
    sim::config::{PriorityConfig, PriorityMode},
};

/// Priority scheduling; lower values win.
///
/// In dynamic mode a task's effective priority drops by one for every
/// `aging_interval` it has existed, so long waiters eventually outrank
/// newcomers. Effective priorities are recomputed at every selection.
pub struct PriorityScheduler {
    config: PriorityConfig,
}

impl PriorityScheduler {
    fn effective_priority(&self, task: &Task, at: Time) -> i64 {
        let base = i64::from(task.spec.priority);
        match self.config.mode {
            PriorityMode::Fixed => base,
            PriorityMode::Dynamic => {
                let waited = (at - task.arrival_time()).max(0.0);
                base - (waited / self.config.aging_interval).floor() as i64
            }
        }
    }

    // (effective_priority, arrival_time, pid) at time `at`
    fn compare(&self, a: &Task, b: &Task, at: Time) -> Ordering {
        self.effective_priority(a, at)
            .cmp(&self.effective_priority(b, at))
            .then_with(|| a.arrival_time().total_cmp(&b.arrival_time()))
            .then_with(|| a.pid().cmp(&b.pid()))
    }
}

impl Scheduler for PriorityScheduler {
    type Config = PriorityConfig;

    fn init(_ctx: &mut SimCtx, config: &PriorityConfig) -> Self {
        Self { config: *config }
    }

    fn name(&self) -> String {
        match (self.config.mode, self.config.preemptive) {
            (PriorityMode::Fixed, false) => "Priority".to_string(),
            (PriorityMode::Fixed, true) => "Priority (preemptive)".to_string(),
            (PriorityMode::Dynamic, false) => "Priority (dynamic)".to_string(),
            (PriorityMode::Dynamic, true) => "Priority (dynamic, preemptive)".to_string(),
        }
    }

    fn enqueue(&mut self, _ctx: &mut SimCtx, _task: TaskId, _flags: EnqueueFlags) {}

    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<TaskId> {
        let now = ctx.now;
        ctx.ready_tasks()
            .min_by(|a, b| self.compare(a, b, now))
            .map(|t| t.id)
    }

    fn time_slice(&mut self, ctx: &mut SimCtx, task: TaskId) -> Time {
        if !self.config.preemptive {
            return ctx.task(task).remaining;
        }

        let running = ctx.task(task);
        slice_until_preempted(ctx, task, |other, at| {
            self.compare(other, running, at).is_lt()
        })
    }
}
