pub mod cfs;
pub mod fifo;
pub mod mlfq;
pub mod preempt;
pub mod priority;
pub mod round_robin;
pub mod sjf;

use crate::core::{
    Time,
    state::{SimCtx, TaskId},
};
use crate::sim::config::PolicyConfig;
pub use cfs::CfsScheduler;
pub use fifo::FifoScheduler;
pub use mlfq::MlfqScheduler;
pub use priority::PriorityScheduler;
pub use round_robin::RoundRobinScheduler;
pub use sjf::{SjfScheduler, SrtfScheduler};

pub type EnqueueFlags = u64;

// Task just arrived
pub const ENQ_WAKEUP: EnqueueFlags = 1 << 0;
// Task was taken off the CPU before finishing
pub const ENQ_PREEMPT: EnqueueFlags = 1 << 32;
pub const ENQ_REENQ: EnqueueFlags = 1 << 40;

/// A scheduling policy driven by [`crate::core::SchedCore`].
///
/// Per step the core calls `pick_next`, charges any context switch, asks
/// `time_slice` for the run length measured from the actual start, runs
/// the task, admits new arrivals (`enqueue` with [`ENQ_WAKEUP`]), calls
/// `stopping`, and finally re-enqueues an unfinished task with
/// [`ENQ_PREEMPT`] | [`ENQ_REENQ`].
pub trait Scheduler {
    type Config;

    fn init(ctx: &mut SimCtx, config: &Self::Config) -> Self;

    /// Label reported with the results.
    fn name(&self) -> String;

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags);

    /// Must return `Some` whenever any task is Ready.
    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<TaskId>;

    fn time_slice(&mut self, ctx: &mut SimCtx, task: TaskId) -> Time;

    fn stopping(&mut self, _ctx: &mut SimCtx, _task: TaskId, _ran: Time, _completed: bool) {}

    fn queue_level(&self, _ctx: &SimCtx, _task: TaskId) -> Option<usize> {
        None
    }
}

/// Every supported policy, chosen once from a validated [`PolicyConfig`].
pub enum Policy {
    Fcfs(FifoScheduler),
    Sjf(SjfScheduler),
    Srtf(SrtfScheduler),
    Priority(PriorityScheduler),
    RoundRobin(RoundRobinScheduler),
    Mlfq(MlfqScheduler),
    Cfs(CfsScheduler),
}

macro_rules! delegate {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Policy::Fcfs($s) => $body,
            Policy::Sjf($s) => $body,
            Policy::Srtf($s) => $body,
            Policy::Priority($s) => $body,
            Policy::RoundRobin($s) => $body,
            Policy::Mlfq($s) => $body,
            Policy::Cfs($s) => $body,
        }
    };
}

impl Scheduler for Policy {
    type Config = PolicyConfig;

    fn init(ctx: &mut SimCtx, config: &PolicyConfig) -> Self {
        match config {
            PolicyConfig::Fcfs => Self::Fcfs(FifoScheduler::init(ctx, &())),
            PolicyConfig::Sjf => Self::Sjf(SjfScheduler::init(ctx, &())),
            PolicyConfig::Srtf => Self::Srtf(SrtfScheduler::init(ctx, &())),
            PolicyConfig::Priority(cfg) => Self::Priority(PriorityScheduler::init(ctx, cfg)),
            PolicyConfig::RoundRobin(cfg) => {
                Self::RoundRobin(RoundRobinScheduler::init(ctx, cfg))
            }
            PolicyConfig::Mlfq(cfg) => Self::Mlfq(MlfqScheduler::init(ctx, cfg)),
            PolicyConfig::Cfs(cfg) => Self::Cfs(CfsScheduler::init(ctx, cfg)),
        }
    }

    fn name(&self) -> String {
        delegate!(self, s => s.name())
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        delegate!(self, s => s.enqueue(ctx, task, flags))
    }

    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<TaskId> {
        delegate!(self, s => s.pick_next(ctx))
    }

    fn time_slice(&mut self, ctx: &mut SimCtx, task: TaskId) -> Time {
        delegate!(self, s => s.time_slice(ctx, task))
    }

    fn stopping(&mut self, ctx: &mut SimCtx, task: TaskId, ran: Time, completed: bool) {
        delegate!(self, s => s.stopping(ctx, task, ran, completed))
    }

    fn queue_level(&self, ctx: &SimCtx, task: TaskId) -> Option<usize> {
        delegate!(self, s => s.queue_level(ctx, task))
    }
}
