//! `npc-task` — per-agent behavior units and the scheduler that runs them.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`timeout`]   | `TimeoutSupervisor`, `TimeoutMode`                        |
//! | [`task`]      | `Task` trait, `TaskCore`, `TaskCx`, `TaskEnv`             |
//! | [`scheduler`] | `TaskScheduler`, `TaskClass`, `SchedulerStats`            |
//! | [`observer`]  | `TaskObserver` trait, `NoopTaskObserver`                  |
//! | [`error`]     | `TaskError`, `TaskResult<T>`                              |
//!
//! # Lifecycle (summary)
//!
//! ```text
//! assign ──► initialize ──► on_process (every tick while active)
//!                                │
//!          error / timeout / clear / self-abort
//!                                ▼
//!                         make_abortable ──► removed at the next sweep
//! ```
//!
//! Removal is always deferred to a sweep after the outermost scheduler call
//! returns, so tasks may assign or abort siblings from any hook.

pub mod error;
pub mod observer;
pub mod scheduler;
pub mod task;
pub mod timeout;

#[cfg(test)]
mod tests;

pub use error::{TaskError, TaskResult};
pub use observer::{NoopTaskObserver, TaskObserver};
pub use scheduler::{SchedulerStats, TaskClass, TaskScheduler};
pub use task::{Task, TaskCore, TaskCx, TaskEnv};
pub use timeout::{TimeoutMode, TimeoutSupervisor};
