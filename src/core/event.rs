use crate::core::{TaskId, TaskState, Time};
use crate::sim::job::Pid;

#[derive(Debug, Clone, PartialEq)]
pub enum SchedCoreEvent {
    TaskStateChange {
        task: TaskId,
        pid: Pid,
        from: TaskState,
        to: TaskState,
    },
    ContextSwitch {
        from: Pid,
        to: Pid,
        start: Time,
        end: Time,
    },
    // Nothing ready; clock fast-forwarded to the next arrival
    CpuIdle {
        from: Time,
        until: Time,
    },
}
