pub mod driver;
pub mod event;
pub mod observer;
pub mod state;
pub mod timeline;

pub use driver::SchedCore;
pub use event::SchedCoreEvent;
pub use state::{Dsq, DsqId, SimCtx, TIME_EPSILON, Task, TaskId, TaskState, Time, Vtime};
pub use timeline::{EntryKind, ScheduleEntry, Timeline};
