//! `TaskObserver` — hook into scheduler lifecycle events.

use npc_core::{AgentId, TaskId};

use crate::TaskClass;

/// Callbacks fired by a [`TaskScheduler`](crate::TaskScheduler).
///
/// All methods have default no-op implementations.
pub trait TaskObserver {
    /// A task was added and is about to be initialized.
    fn on_task_assigned(&mut self, _agent: AgentId, _task: TaskId, _name: &'static str, _class: TaskClass) {}

    /// A task went from active to inactive (any path: error, timeout,
    /// clear, shutdown, self-abort).
    fn on_task_aborted(&mut self, _agent: AgentId, _task: TaskId, _name: &'static str) {}
}

/// An observer that ignores every event.
pub struct NoopTaskObserver;

impl TaskObserver for NoopTaskObserver {}
