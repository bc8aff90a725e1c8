use thiserror::Error;

use npc_core::TaskId;

/// Why a task stopped early.
///
/// None of these ever leave the scheduler: an `Err` returned from
/// `Task::on_process` is logged and the task is force-aborted.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The agent, target or vehicle the task was working on is gone.
    #[error("stale reference: {0} no longer exists")]
    StaleReference(&'static str),

    /// A bounded search for a resource (search place, free vehicle) came up empty.
    #[error("allocation exhausted: {0}")]
    AllocationExhausted(&'static str),

    #[error("task {task} exceeded its deadline of {ticks} ticks")]
    TimeoutExceeded { task: TaskId, ticks: u64 },

    #[error("task failed: {0}")]
    Failed(String),
}

pub type TaskResult<T> = Result<T, TaskError>;
