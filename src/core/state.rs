use keyed_priority_queue::KeyedPriorityQueue;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use std::{cmp::Ordering, collections::VecDeque};

use super::timeline::Timeline;
use crate::{
    error::SchedError,
    sim::job::{Pid, ProcessSpec},
};

// Index into Task Vec
pub type TaskId = usize;
pub type Time = f64;
new_key_type! {
    pub struct DsqId;
}

/// Remaining work at or below this is treated as done.
pub const TIME_EPSILON: Time = 1e-9;

/// Ordering key of a priority dispatch queue: smallest value first, then
/// smallest pid.
#[derive(Debug, Copy, Clone)]
pub struct Vtime {
    pub value: f64,
    pub pid: Pid,
}

impl Vtime {
    pub fn new(value: f64, pid: Pid) -> Self {
        Self { value, pid }
    }
}

// KeyedPriorityQueue is a max-heap, so we need to flip-flop Vtime's Ord
impl Ord for Vtime {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .total_cmp(&self.value)
            .then_with(|| other.pid.cmp(&self.pid))
    }
}

impl PartialOrd for Vtime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Vtime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Vtime {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Ready,
    Running,
    Completed,
}

/// Per-run working copy of a process.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub spec: ProcessSpec,
    pub state: TaskState,
    pub remaining: Time,
    pub first_run_time: Option<Time>,
    pub completion_time: Option<Time>,
    pub queue_level: usize,
    pub wait_start_time: Time,
    pub vruntime: f64,
    pub deficit: Time,
}

impl Task {
    pub fn pid(&self) -> Pid {
        self.spec.pid
    }

    pub fn arrival_time(&self) -> Time {
        self.spec.arrival_time
    }

    pub fn burst_time(&self) -> Time {
        self.spec.burst_time
    }

    pub fn is_finished(&self) -> bool {
        self.remaining <= TIME_EPSILON
    }
}

#[derive(Debug)]
pub enum Dsq {
    Fifo {
        tasks: VecDeque<TaskId>,
    },
    Priq {
        tasks: KeyedPriorityQueue<TaskId, Vtime>,
    },
}

impl Dsq {
    pub fn new_fifo() -> Self {
        Self::Fifo {
            tasks: VecDeque::new(),
        }
    }

    pub fn new_priq() -> Self {
        Self::Priq {
            tasks: KeyedPriorityQueue::new(),
        }
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        match self {
            Self::Fifo { tasks } => tasks.contains(&task_id),
            Self::Priq { tasks } => tasks.get_priority(&task_id).is_some(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fifo { tasks } => tasks.len(),
            Self::Priq { tasks } => tasks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything one simulation run owns: the clock, the task table, the ready
/// structures and the timeline being built.
#[derive(Debug)]
pub struct SimCtx {
    pub now: Time,
    // Sorted by (arrival_time, pid); TaskId is the index
    pub tasks: Vec<Task>,
    pub dsqs: SlotMap<DsqId, Dsq>,
    pub task_to_dsq: FxHashMap<TaskId, DsqId>,
    pub current: Option<TaskId>,
    pub timeline: Timeline,

    switch_cost: Time,
    context_switches: usize,
    last_ran: Option<TaskId>,
    // First task that has not been admitted yet
    arrival_cursor: usize,
    completion_order: Vec<TaskId>,
}

impl SimCtx {
    pub fn new(processes: &[ProcessSpec], switch_cost: Time) -> Result<Self, SchedError> {
        if processes.is_empty() {
            return Err(SchedError::EmptyWorkload);
        }

        let mut specs = processes.to_vec();
        specs.sort_by(|a, b| {
            a.arrival_time
                .total_cmp(&b.arrival_time)
                .then_with(|| a.pid.cmp(&b.pid))
        });

        let tasks = specs
            .into_iter()
            .enumerate()
            .map(|(id, spec)| Task {
                id,
                state: TaskState::Pending,
                remaining: spec.burst_time,
                first_run_time: None,
                completion_time: None,
                queue_level: 0,
                wait_start_time: spec.arrival_time,
                vruntime: 0.0,
                deficit: 0.0,
                spec,
            })
            .collect::<Vec<_>>();

        Ok(Self {
            now: 0.0,
            completion_order: Vec::with_capacity(tasks.len()),
            tasks,
            dsqs: SlotMap::with_key(),
            task_to_dsq: FxHashMap::default(),
            current: None,
            timeline: Timeline::new(),
            switch_cost,
            context_switches: 0,
            last_ran: None,
            arrival_cursor: 0,
        })
    }

    pub fn advance_time(&mut self, delta: Time) {
        self.now += delta;
    }

    pub fn task(&self, task_id: TaskId) -> &Task {
        &self.tasks[task_id]
    }

    pub fn task_mut(&mut self, task_id: TaskId) -> &mut Task {
        &mut self.tasks[task_id]
    }

    // ---- ready-set manager ----

    /// Move every task whose arrival time has passed from Pending to Ready.
    /// Returns the newly admitted tasks in (arrival_time, pid) order.
    pub fn admit_arrivals(&mut self) -> Vec<TaskId> {
        let mut admitted = Vec::new();
        while let Some(task) = self.tasks.get_mut(self.arrival_cursor) {
            if task.spec.arrival_time > self.now + TIME_EPSILON {
                break;
            }
            task.state = TaskState::Ready;
            task.wait_start_time = self.now;
            admitted.push(task.id);
            self.arrival_cursor += 1;
        }
        admitted
    }

    /// Tasks that have not arrived yet, ordered by arrival time.
    pub fn pending(&self) -> &[Task] {
        &self.tasks[self.arrival_cursor..]
    }

    /// Arrived, unfinished, not running; stable (arrival_time, pid) order.
    pub fn ready_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks[..self.arrival_cursor]
            .iter()
            .filter(|t| t.state == TaskState::Ready)
    }

    pub fn has_ready(&self) -> bool {
        self.ready_tasks().next().is_some()
    }

    pub fn next_arrival(&self) -> Option<Time> {
        self.pending().first().map(|t| t.spec.arrival_time)
    }

    /// Jump the clock to the next arrival, recording the skipped interval as
    /// idle. Returns the new time, or `None` when nothing is left to arrive.
    pub fn idle_until_next_arrival(&mut self) -> Option<Time> {
        let until = self.next_arrival()?;
        if until > self.now {
            self.timeline.push_idle(self.now, until);
            self.now = until;
        }
        Some(until)
    }

    pub fn all_completed(&self) -> bool {
        self.completion_order.len() == self.tasks.len()
    }

    pub fn completion_order(&self) -> &[TaskId] {
        &self.completion_order
    }

    // ---- context-switch accountant ----

    /// Charge a context switch if `task` is not the task that executed last.
    /// Returns the previously executed task when a switch happened.
    pub fn switch_to(&mut self, task_id: TaskId) -> Option<TaskId> {
        let prev = self.last_ran.filter(|&prev| prev != task_id)?;

        self.context_switches += 1;
        let start = self.now;
        self.advance_time(self.switch_cost);
        self.timeline.push_context_switch(start, self.now);
        Some(prev)
    }

    pub fn context_switches(&self) -> usize {
        self.context_switches
    }

    pub fn switch_cost(&self) -> Time {
        self.switch_cost
    }

    // ---- task lifecycle ----

    // Return previous state
    pub fn set_running(&mut self, task_id: TaskId) -> TaskState {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Running task {task_id} must not be enqueued"
        );
        debug_assert!(self.current.is_none(), "CPU already running a task");

        self.current = Some(task_id);
        let task = self.task_mut(task_id);
        let prev_state = task.state;
        task.state = TaskState::Running;
        prev_state
    }

    /// Execute the current task for at most `slice`, appending the execution
    /// entry. Returns the time actually run.
    pub fn run_current(&mut self, slice: Time, queue_level: Option<usize>) -> Time {
        let task_id = self.current.expect("run_current() without a running task");
        let start = self.now;

        let mut end = start + slice.min(self.tasks[task_id].remaining);
        // A slice cut short by an arrival ends exactly on that arrival
        if let Some(arrival) = self.next_arrival()
            && (arrival - end).abs() <= TIME_EPSILON
        {
            end = arrival;
        }
        let ran = end - start;
        debug_assert!(ran > TIME_EPSILON, "Task {task_id} dispatched with an empty slice");

        let task = &mut self.tasks[task_id];
        task.first_run_time.get_or_insert(start);
        task.remaining -= ran;
        if task.remaining <= TIME_EPSILON {
            task.remaining = 0.0;
        }
        let pid = task.spec.pid;

        self.now = end;
        self.timeline.push_execution(pid, start, end, queue_level);
        self.last_ran = Some(task_id);
        ran
    }

    /// Preempted: back to Ready; the wait timer restarts now.
    pub fn mark_ready(&mut self, task_id: TaskId) {
        let now = self.now;
        let task = self.task_mut(task_id);
        debug_assert!(
            task.state != TaskState::Completed,
            "Completed task {} cannot be runnable",
            task.id
        );
        task.state = TaskState::Ready;
        task.wait_start_time = now;
        if self.current == Some(task_id) {
            self.current = None;
        }
    }

    pub fn mark_completed(&mut self, task_id: TaskId) {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Completing task {task_id} that is still enqueued"
        );

        let now = self.now;
        let task = &mut self.tasks[task_id];
        debug_assert!(
            task.state == TaskState::Running,
            "Task {task_id} must have been running before marked complete"
        );

        task.state = TaskState::Completed;
        task.remaining = 0.0;
        task.deficit = 0.0;
        task.completion_time = Some(now);
        self.completion_order.push(task_id);
        if self.current == Some(task_id) {
            self.current = None;
        }
    }

    // ---- dispatch queues ----

    pub fn create_dsq_fifo(&mut self) -> DsqId {
        self.dsqs.insert(Dsq::new_fifo())
    }

    pub fn create_dsq_priq(&mut self) -> DsqId {
        self.dsqs.insert(Dsq::new_priq())
    }

    fn dsq_push(&mut self, dsq_id: DsqId, task_id: TaskId, vtime: Option<Vtime>) {
        assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Task {task_id} already present in some DSQ"
        );
        debug_assert!(
            self.task(task_id).state == TaskState::Ready,
            "Task {task_id} must be Ready when enqueued"
        );

        let dsq = self.dsqs.get_mut(dsq_id).expect("Unknown DSQ");
        match dsq {
            Dsq::Fifo { tasks } => tasks.push_back(task_id),
            Dsq::Priq { tasks } => {
                tasks.push(
                    task_id,
                    vtime.expect("Attempted to push to a PrioDsq with no vtime"),
                );
            }
        };

        self.task_to_dsq.insert(task_id, dsq_id);
    }

    pub fn dsq_push_fifo(&mut self, dsq_id: DsqId, task_id: TaskId) {
        self.dsq_push(dsq_id, task_id, None);
    }

    pub fn dsq_push_priq(&mut self, dsq_id: DsqId, task_id: TaskId, vtime: Vtime) {
        self.dsq_push(dsq_id, task_id, Some(vtime));
    }

    pub fn dsq_pop(&mut self, dsq_id: DsqId) -> Option<TaskId> {
        let dsq = self.dsqs.get_mut(dsq_id)?;
        let task = match dsq {
            Dsq::Fifo { tasks } => tasks.pop_front(),
            Dsq::Priq { tasks } => tasks.pop().map(|t| t.0),
        }?;

        let removed = self.task_to_dsq.remove(&task);
        debug_assert!(removed.is_some(), "Task {task} missing DSQ membership");

        Some(task)
    }

    /// Pull a task out of the middle of a queue.
    pub fn dsq_remove(&mut self, dsq_id: DsqId, task_id: TaskId) -> bool {
        if self.task_to_dsq.get(&task_id) != Some(&dsq_id) {
            return false;
        }
        let Some(dsq) = self.dsqs.get_mut(dsq_id) else {
            return false;
        };
        let removed = match dsq {
            Dsq::Fifo { tasks } => tasks
                .iter()
                .position(|&t| t == task_id)
                .and_then(|pos| tasks.remove(pos))
                .is_some(),
            Dsq::Priq { tasks } => tasks.remove(&task_id).is_some(),
        };
        if removed {
            self.task_to_dsq.remove(&task_id);
        }
        removed
    }

    /// Snapshot of a FIFO queue front to back. Priority queues come back in
    /// unspecified order.
    pub fn dsq_tasks(&self, dsq_id: DsqId) -> Vec<TaskId> {
        match self.dsqs.get(dsq_id) {
            Some(Dsq::Fifo { tasks }) => tasks.iter().copied().collect(),
            Some(Dsq::Priq { tasks }) => tasks.iter().map(|(&t, _)| t).collect(),
            None => Vec::new(),
        }
    }

    pub fn dsq_len(&self, dsq_id: DsqId) -> usize {
        self.dsqs.get(dsq_id).map_or(0, Dsq::len)
    }

    pub fn task_in_any_dsq(&self, task_id: TaskId) -> bool {
        self.task_to_dsq.contains_key(&task_id)
    }
}
