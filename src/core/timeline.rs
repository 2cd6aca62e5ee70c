use serde::{Deserialize, Serialize};

use super::state::Time;
use crate::sim::job::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Execution,
    Idle,
    ContextSwitch,
}

/// One bar of the Gantt chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    // None for idle and context-switch entries
    pub process_id: Option<Pid>,
    pub start_time: Time,
    pub end_time: Time,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_level: Option<usize>,
}

impl ScheduleEntry {
    pub fn duration(&self) -> Time {
        self.end_time - self.start_time
    }
}

/// Append-only, gap-free sequence of schedule entries.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    entries: Vec<ScheduleEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_execution(
        &mut self,
        pid: Pid,
        start_time: Time,
        end_time: Time,
        queue_level: Option<usize>,
    ) {
        self.push(ScheduleEntry {
            process_id: Some(pid),
            start_time,
            end_time,
            kind: EntryKind::Execution,
            queue_level,
        });
    }

    pub fn push_idle(&mut self, start_time: Time, end_time: Time) {
        self.push(ScheduleEntry {
            process_id: None,
            start_time,
            end_time,
            kind: EntryKind::Idle,
            queue_level: None,
        });
    }

    pub fn push_context_switch(&mut self, start_time: Time, end_time: Time) {
        self.push(ScheduleEntry {
            process_id: None,
            start_time,
            end_time,
            kind: EntryKind::ContextSwitch,
            queue_level: None,
        });
    }

    // Zero-length intervals are dropped
    fn push(&mut self, entry: ScheduleEntry) {
        if entry.end_time <= entry.start_time {
            return;
        }
        debug_assert!(
            self.end_time() == entry.start_time,
            "Timeline gap: previous entry ends at {}, next starts at {}",
            self.end_time(),
            entry.start_time
        );
        self.entries.push(entry);
    }

    /// End of the last entry, or 0 for an empty timeline.
    pub fn end_time(&self) -> Time {
        self.entries.last().map_or(0.0, |e| e.end_time)
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ScheduleEntry> {
        self.entries
    }
}
