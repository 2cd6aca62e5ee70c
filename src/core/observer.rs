use super::state::{SimCtx, TaskState};

#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn observe(&mut self, ctx: &SimCtx) {
        self.step += 1;

        debug_assert!(
            ctx.current.is_none(),
            "CPU must be released between steps (step {})",
            self.step
        );
        debug_assert_eq!(
            ctx.timeline.end_time(),
            ctx.now,
            "Timeline must end exactly at the clock"
        );

        for task in &ctx.tasks {
            let id = task.id;
            debug_assert!(
                task.remaining >= 0.0 && task.remaining <= task.spec.burst_time,
                "Task {id} remaining time {} out of range",
                task.remaining
            );
            match task.state {
                TaskState::Pending => debug_assert!(
                    task.spec.arrival_time > ctx.now,
                    "Task {id} still pending after its arrival"
                ),
                TaskState::Completed => {
                    debug_assert!(task.is_finished(), "Completed task {id} has work left");
                    debug_assert!(
                        task.completion_time.is_some(),
                        "Completed task {id} has no completion time"
                    );
                }
                TaskState::Ready => {
                    debug_assert!(!task.is_finished(), "Ready task {id} has no work left")
                }
                TaskState::Running => debug_assert!(false, "Task {id} left Running"),
            }
        }

        for (&task_id, &dsq_id) in &ctx.task_to_dsq {
            let task = ctx.task(task_id);
            debug_assert_eq!(
                task.state,
                TaskState::Ready,
                "Only Ready tasks may sit in DSQ {dsq_id:?} (task {task_id})"
            );
            if let Some(dsq) = ctx.dsqs.get(dsq_id) {
                debug_assert!(
                    dsq.contains(task_id),
                    "task_to_dsq claims task {task_id} in DSQ {dsq_id:?}, but queue does not contain it"
                );
            } else {
                debug_assert!(false, "task_to_dsq references unknown DSQ {dsq_id:?}");
            }
        }
    }
}
