use crate::core::{
    TIME_EPSILON, Time,
    state::{SimCtx, Task, TaskId},
};

/// Length of the slice a preemptive policy may give `task`, starting now.
///
/// `beats(other, at)` reports whether `other` would win against `task` at
/// time `at`. A ready task that already wins gives a zero slice; the core
/// puts `task` back and selects again. Otherwise the slice ends at the
/// task's completion or at the earliest future arrival that wins, whichever
/// comes first. Arrivals that coincide with the completion do not preempt.
pub fn slice_until_preempted(
    ctx: &SimCtx,
    task: TaskId,
    beats: impl Fn(&Task, Time) -> bool,
) -> Time {
    let start = ctx.now;
    if ctx.ready_tasks().any(|t| beats(t, start)) {
        return 0.0;
    }

    let remaining = ctx.task(task).remaining;
    let horizon = start + remaining;

    ctx.pending()
        .iter()
        .take_while(|t| t.spec.arrival_time + TIME_EPSILON < horizon)
        .find(|t| beats(t, t.spec.arrival_time))
        .map_or(remaining, |t| t.spec.arrival_time - start)
}
