use tracing::debug;

use super::{ENQ_WAKEUP, EnqueueFlags, Scheduler, SimCtx, TaskId};
use crate::{
    core::{DsqId, TIME_EPSILON, Time},
    sim::config::MlfqConfig,
};

/// Multi-level feedback queue.
///
/// Level 0 is the most urgent. Arrivals enter level 0; a task that burns
/// its whole quantum without finishing drops one level. Tasks waiting in a
/// lower level for `aging_threshold` climb one level, and every
/// `boost_interval` all waiting tasks return to level 0. A threshold or
/// interval of 0 turns that mechanism off.
pub struct MlfqScheduler {
    levels: Vec<DsqId>,
    quanta: Vec<Time>,
    aging_threshold: Time,
    boost_interval: Time,
    next_boost: Option<Time>,
}

impl MlfqScheduler {
    fn quantum(&self, level: usize) -> Time {
        self.quanta[level.min(self.quanta.len() - 1)]
    }

    fn bottom(&self) -> usize {
        self.levels.len() - 1
    }

    fn push_level(&self, ctx: &mut SimCtx, task: TaskId, level: usize) {
        ctx.task_mut(task).queue_level = level;
        ctx.dsq_push_fifo(self.levels[level], task);
    }

    // Move everything waiting below level 0 back to the top
    fn apply_boost(&mut self, ctx: &mut SimCtx) {
        let Some(due) = self.next_boost else {
            return;
        };
        if ctx.now < due {
            return;
        }

        let now = ctx.now;
        let mut boosted = 0;
        for level in 1..self.levels.len() {
            while let Some(task) = ctx.dsq_pop(self.levels[level]) {
                ctx.task_mut(task).wait_start_time = now;
                self.push_level(ctx, task, 0);
                boosted += 1;
            }
        }

        let missed = ((now - due) / self.boost_interval).floor();
        self.next_boost = Some(due + (missed + 1.0) * self.boost_interval);
        debug!(now, boosted, next = self.next_boost, "mlfq priority boost");
    }

    // Promote long waiters by a single level
    fn apply_aging(&mut self, ctx: &mut SimCtx) {
        if self.aging_threshold <= 0.0 {
            return;
        }

        let now = ctx.now;
        for level in 1..self.levels.len() {
            for task in ctx.dsq_tasks(self.levels[level]) {
                let waited = now - ctx.task(task).wait_start_time;
                if waited + TIME_EPSILON < self.aging_threshold {
                    continue;
                }
                ctx.dsq_remove(self.levels[level], task);
                ctx.task_mut(task).wait_start_time = now;
                self.push_level(ctx, task, level - 1);
                debug!(pid = ctx.task(task).pid(), from = level, to = level - 1, "mlfq aging");
            }
        }
    }
}

impl Scheduler for MlfqScheduler {
    type Config = MlfqConfig;

    fn init(ctx: &mut SimCtx, config: &MlfqConfig) -> Self {
        let levels = (0..config.num_queues)
            .map(|_| ctx.create_dsq_fifo())
            .collect();

        Self {
            levels,
            quanta: config.time_quantums.clone(),
            aging_threshold: config.aging_threshold,
            boost_interval: config.boost_interval,
            next_boost: (config.boost_interval > 0.0).then_some(config.boost_interval),
        }
    }

    fn name(&self) -> String {
        "MLFQ".to_string()
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        let level = if flags & ENQ_WAKEUP != 0 {
            0
        } else {
            ctx.task(task).queue_level.min(self.bottom())
        };
        self.push_level(ctx, task, level);
    }

    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<TaskId> {
        self.apply_boost(ctx);
        self.apply_aging(ctx);

        self.levels
            .iter()
            .find_map(|&dsq| ctx.dsq_pop(dsq))
    }

    fn time_slice(&mut self, ctx: &mut SimCtx, task: TaskId) -> Time {
        self.quantum(ctx.task(task).queue_level)
    }

    fn stopping(&mut self, ctx: &mut SimCtx, task: TaskId, ran: Time, completed: bool) {
        let level = ctx.task(task).queue_level;
        // Only a fully used quantum demotes
        if completed || ran + TIME_EPSILON < self.quantum(level) {
            return;
        }
        let demoted = (level + 1).min(self.bottom());
        if demoted != level {
            debug!(pid = ctx.task(task).pid(), from = level, to = demoted, "mlfq demotion");
        }
        ctx.task_mut(task).queue_level = demoted;
    }

    fn queue_level(&self, ctx: &SimCtx, task: TaskId) -> Option<usize> {
        Some(ctx.task(task).queue_level)
    }
}
