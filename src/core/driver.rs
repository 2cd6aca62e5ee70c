use tracing::{debug, trace};

use super::{
    event::SchedCoreEvent,
    observer::Observer,
    state::{SimCtx, TaskId, TaskState},
};
use crate::scheduler::{ENQ_PREEMPT, ENQ_REENQ, ENQ_WAKEUP, EnqueueFlags, Scheduler};

/// The shared simulation loop. One `step()` is one scheduling decision.
pub struct SchedCore<S: Scheduler> {
    pub ctx: SimCtx,
    pub scheduler: S,
    observer: Observer,
}

impl<S: Scheduler> SchedCore<S> {
    pub fn new(mut ctx: SimCtx, config: &S::Config) -> Self {
        let scheduler = S::init(&mut ctx, config);
        Self {
            ctx,
            scheduler,
            observer: Observer::new(),
        }
    }

    pub fn step(&mut self) -> Vec<SchedCoreEvent> {
        let mut events = Vec::new();
        self.admit_arrivals(&mut events);

        if self.ctx.all_completed() {
            return events;
        }

        let Some(task) = self.scheduler.pick_next(&mut self.ctx) else {
            self.idle(&mut events);
            self.observer.observe(&self.ctx);
            return events;
        };

        let switch_start = self.ctx.now;
        let prev = self.ctx.switch_to(task);
        let switch_end = self.ctx.now;
        // Arrivals during the switch are ready before the slice starts
        self.admit_arrivals(&mut events);

        let mut task = task;
        let mut prev_state = self.ctx.set_running(task);
        // Slice is measured from the actual start, after any switch overhead
        let mut slice = self.scheduler.time_slice(&mut self.ctx, task);
        while slice <= 0.0 {
            // Outranked by a task admitted during the switch; no second switch
            self.ctx.mark_ready(task);
            self.scheduler
                .enqueue(&mut self.ctx, task, ENQ_PREEMPT | ENQ_REENQ);
            task = self
                .scheduler
                .pick_next(&mut self.ctx)
                .expect("Preempted task left nothing to dispatch");
            prev_state = self.ctx.set_running(task);
            slice = self.scheduler.time_slice(&mut self.ctx, task);
        }

        if let Some(prev) = prev {
            events.push(SchedCoreEvent::ContextSwitch {
                from: self.ctx.task(prev).pid(),
                to: self.ctx.task(task).pid(),
                start: switch_start,
                end: switch_end,
            });
        }
        self.push_state_change(&mut events, task, prev_state, TaskState::Running);

        let queue_level = self.scheduler.queue_level(&self.ctx, task);
        debug!(
            pid = self.ctx.task(task).pid(),
            start = self.ctx.now,
            slice,
            queue_level,
            "dispatch"
        );
        let ran = self.ctx.run_current(slice, queue_level);

        // Arrivals during the slice queue up ahead of the preempted task
        self.admit_arrivals(&mut events);

        let completed = self.ctx.task(task).is_finished();
        self.scheduler
            .stopping(&mut self.ctx, task, ran, completed);

        if completed {
            self.ctx.mark_completed(task);
            self.push_state_change(&mut events, task, TaskState::Running, TaskState::Completed);
        } else {
            self.ctx.mark_ready(task);
            self.push_state_change(&mut events, task, TaskState::Running, TaskState::Ready);
            let flags: EnqueueFlags = ENQ_PREEMPT | ENQ_REENQ;
            self.scheduler.enqueue(&mut self.ctx, task, flags);
        }

        self.observer.observe(&self.ctx);
        events
    }

    /// Step until every task has completed.
    pub fn run(&mut self) {
        while !self.ctx.all_completed() {
            self.step();
        }
    }

    fn admit_arrivals(&mut self, events: &mut Vec<SchedCoreEvent>) {
        for task in self.ctx.admit_arrivals() {
            self.push_state_change(events, task, TaskState::Pending, TaskState::Ready);
            self.scheduler.enqueue(&mut self.ctx, task, ENQ_WAKEUP);
        }
    }

    fn idle(&mut self, events: &mut Vec<SchedCoreEvent>) {
        assert!(
            !self.ctx.has_ready(),
            "Scheduler {} left ready tasks undispatched",
            self.scheduler.name()
        );

        let from = self.ctx.now;
        let until = self
            .ctx
            .idle_until_next_arrival()
            .expect("Unfinished tasks but nothing ready or pending");
        events.push(SchedCoreEvent::CpuIdle { from, until });
        trace!(from, until, "cpu idle");

        self.admit_arrivals(events);
    }

    fn push_state_change(
        &self,
        events: &mut Vec<SchedCoreEvent>,
        task: TaskId,
        from: TaskState,
        to: TaskState,
    ) {
        let pid = self.ctx.task(task).pid();
        trace!(pid, ?from, ?to, now = self.ctx.now, "task state change");
        events.push(SchedCoreEvent::TaskStateChange { task, pid, from, to });
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }
}
