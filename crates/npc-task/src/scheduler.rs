//! `TaskScheduler` — the per-agent cooperative task runner.
//!
//! # Design
//!
//! Two ordered lists of slots: `main` and `sub`.  Permanent tasks live in the
//! sub list with a [`TaskClass::Permanent`] tag that protects them from
//! `clear_*` (but not from [`shutdown`](TaskScheduler::shutdown)).
//!
//! While a hook runs, the task is taken out of its slot so the hook can get
//! `&mut TaskScheduler` through its [`TaskCx`].  The slot stays in place,
//! marked in flight; an abort aimed at it is recorded as pending and applied
//! when the task is put back.
//!
//! Iteration is by index with the length re-read every step, so tasks
//! appended mid-pass are processed in the same pass.  Inactive slots are
//! removed only by a sweep, and the sweep only runs when the outermost
//! scheduler call returns.  No index is ever invalidated during a pass.

use tracing::{debug, trace, warn};

use npc_core::{AgentId, NativeTaskId, TaskId};

use crate::{Task, TaskCx, TaskEnv, TaskError, TaskObserver};

/// Bound on shutdown rounds: abort hooks that keep assigning new tasks are
/// cut off after this many passes.
const MAX_SHUTDOWN_ROUNDS: usize = 8;

/// Which list a task goes into and which bulk clears affect it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskClass {
    Main,
    Sub,
    /// Sub list, survives `clear_*`.
    Permanent,
}

/// Lifetime counters for one scheduler.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerStats {
    pub assigned:  u64,
    /// Active → inactive transitions, whatever the cause.
    pub aborted:   u64,
    /// `on_process` invocations.
    pub processed: u64,
    pub timed_out: u64,
    /// `on_process` errors other than stale references.
    pub failed:    u64,
}

struct TaskSlot<E: TaskEnv> {
    serial:        u64,
    id:            TaskId,
    class:         TaskClass,
    active:        bool,
    pending_abort: bool,
    /// `None` while a hook of this task is running.
    task:          Option<Box<dyn Task<E>>>,
}

pub struct TaskScheduler<E: TaskEnv> {
    main:        Vec<TaskSlot<E>>,
    sub:         Vec<TaskSlot<E>>,
    /// Nesting depth of scheduler calls; sweeps wait for zero.
    depth:       u32,
    in_pass:     bool,
    next_serial: u64,
    stats:       SchedulerStats,
    observers:   Vec<Box<dyn TaskObserver>>,
}

impl<E: TaskEnv> Default for TaskScheduler<E> {
    fn default() -> Self {
        Self {
            main:        Vec::new(),
            sub:         Vec::new(),
            depth:       0,
            in_pass:     false,
            next_serial: 0,
            stats:       SchedulerStats::default(),
            observers:   Vec::new(),
        }
    }
}

impl<E: TaskEnv> TaskScheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Box<dyn TaskObserver>) {
        self.observers.push(observer);
    }

    // ── Assignment ────────────────────────────────────────────────────────

    /// Add `task` to the list for `class` and initialize it synchronously.
    pub fn assign(&mut self, mut task: Box<dyn Task<E>>, class: TaskClass, agent: AgentId, env: &mut E) {
        let serial = self.next_serial;
        self.next_serial += 1;
        let (id, name) = (task.id(), task.name());

        let slot = TaskSlot { serial, id, class, active: true, pending_abort: false, task: None };
        match class {
            TaskClass::Main => self.main.push(slot),
            TaskClass::Sub | TaskClass::Permanent => self.sub.push(slot),
        }
        self.stats.assigned += 1;
        for observer in &mut self.observers {
            observer.on_task_assigned(agent, id, name, class);
        }
        debug!(agent = %agent, task = name, ?class, "task assigned");

        self.depth += 1;
        {
            let mut cx = TaskCx::new(agent, env, self);
            task.initialize(&mut cx);
        }
        self.restore(serial, task, agent, env);
        self.depth -= 1;
        self.maybe_sweep();
    }

    // ── Per-tick processing ───────────────────────────────────────────────

    /// Run every active task once: main list first, then sub.
    pub fn process(&mut self, agent: AgentId, env: &mut E) {
        if self.in_pass {
            trace!(agent = %agent, "nested process call ignored");
            return;
        }
        self.in_pass = true;
        self.depth += 1;
        self.process_list(true, agent, env);
        self.process_list(false, agent, env);
        self.depth -= 1;
        self.in_pass = false;
        self.maybe_sweep();
    }

    fn process_list(&mut self, main: bool, agent: AgentId, env: &mut E) {
        let mut i = 0;
        loop {
            let list = if main { &mut self.main } else { &mut self.sub };
            let Some(slot) = list.get_mut(i) else { break };
            i += 1;
            if !slot.active {
                continue;
            }
            let Some(task) = slot.task.take() else { continue };
            let serial = slot.serial;

            let task = self.internal_process(task, agent, env);
            self.restore(serial, task, agent, env);
        }
    }

    /// `on_process`, then failure handling, then the deadline check.
    fn internal_process(&mut self, mut task: Box<dyn Task<E>>, agent: AgentId, env: &mut E) -> Box<dyn Task<E>> {
        let now = env.now();
        self.stats.processed += 1;
        let mut cx = TaskCx::new(agent, env, self);

        if let Err(err) = task.on_process(&mut cx) {
            match err {
                TaskError::StaleReference(_) => {
                    debug!(agent = %agent, task = task.name(), %err, "task retired");
                }
                _ => {
                    cx.scheduler.stats.failed += 1;
                    warn!(agent = %agent, task = task.name(), %err, "task failed; aborting");
                }
            }
            task.make_abortable(&mut cx);
        }

        if task.is_active() && task.core_mut().timeout_mut().expired(now) {
            let ticks = task.core().timeout().duration().unwrap_or(0);
            let err = TaskError::TimeoutExceeded { task: task.id(), ticks };
            cx.scheduler.stats.timed_out += 1;
            warn!(agent = %agent, task = task.name(), %err, "forcing abort");
            task.on_timeout(&mut cx);
            task.make_abortable(&mut cx);
        }
        task
    }

    // ── Aborting ──────────────────────────────────────────────────────────

    /// Force-abort every main task.
    pub fn clear_main_task(&mut self, agent: AgentId, env: &mut E) {
        self.clear_where(agent, env, |c| c == TaskClass::Main);
    }

    /// Force-abort every sub task except permanent ones.
    pub fn clear_sub_tasks(&mut self, agent: AgentId, env: &mut E) {
        self.clear_where(agent, env, |c| c == TaskClass::Sub);
    }

    /// Force-abort everything except permanent tasks.
    pub fn clear_tasks(&mut self, agent: AgentId, env: &mut E) {
        self.clear_where(agent, env, |c| c != TaskClass::Permanent);
    }

    /// Abort every active task with `id`.  Returns `true` if any was active.
    pub fn abort_task(&mut self, id: TaskId, agent: AgentId, env: &mut E) -> bool {
        let serials: Vec<u64> = self
            .slots()
            .filter(|s| s.active && s.id == id)
            .map(|s| s.serial)
            .collect();
        let any = !serials.is_empty();
        self.depth += 1;
        for serial in serials {
            self.abort_serial(serial, agent, env);
        }
        self.depth -= 1;
        self.maybe_sweep();
        any
    }

    /// Abort everything, permanent tasks included, and empty both lists.
    /// Only for agent teardown.
    pub fn shutdown(&mut self, agent: AgentId, env: &mut E) {
        self.depth += 1;
        for round in 0.. {
            let serials: Vec<u64> = self.slots().filter(|s| s.active).map(|s| s.serial).collect();
            if serials.is_empty() {
                break;
            }
            if round == MAX_SHUTDOWN_ROUNDS {
                warn!(agent = %agent, remaining = serials.len(), "abort hooks keep assigning tasks; dropping them");
                break;
            }
            for serial in serials {
                self.abort_serial(serial, agent, env);
            }
        }
        self.depth -= 1;
        self.main.clear();
        self.sub.clear();
        debug!(agent = %agent, "scheduler shut down");
    }

    fn clear_where(&mut self, agent: AgentId, env: &mut E, pred: impl Fn(TaskClass) -> bool) {
        let serials: Vec<u64> = self
            .slots()
            .filter(|s| s.active && pred(s.class))
            .map(|s| s.serial)
            .collect();
        self.depth += 1;
        for serial in serials {
            self.abort_serial(serial, agent, env);
        }
        self.depth -= 1;
        self.maybe_sweep();
    }

    fn abort_serial(&mut self, serial: u64, agent: AgentId, env: &mut E) {
        let Some(slot) = self.slot_mut(serial) else { return };
        if !slot.active {
            return;
        }
        match slot.task.take() {
            None => {
                // In flight: `restore` finishes the abort when the hook returns.
                slot.pending_abort = true;
                slot.active = false;
            }
            Some(mut task) => {
                {
                    let mut cx = TaskCx::new(agent, env, self);
                    task.make_abortable(&mut cx);
                }
                self.restore(serial, task, agent, env);
            }
        }
    }

    /// Put a task back into its slot after a hook, applying a pending abort.
    /// A task whose slot vanished (shutdown during its own hook) is aborted
    /// and dropped.
    fn restore(&mut self, serial: u64, mut task: Box<dyn Task<E>>, agent: AgentId, env: &mut E) {
        let must_abort = self.slot_mut(serial).is_none_or(|s| s.pending_abort);
        if must_abort && task.is_active() {
            let mut cx = TaskCx::new(agent, env, self);
            task.make_abortable(&mut cx);
        }

        let active = task.is_active();
        if !active {
            self.stats.aborted += 1;
            for observer in &mut self.observers {
                observer.on_task_aborted(agent, task.id(), task.name());
            }
            trace!(agent = %agent, task = task.name(), "task inactive");
        }

        if let Some(slot) = self.slot_mut(serial) {
            slot.active = active;
            slot.pending_abort = false;
            slot.task = Some(task);
        }
    }

    fn maybe_sweep(&mut self) {
        if self.depth > 0 {
            return;
        }
        let keep = |s: &TaskSlot<E>| s.active || s.task.is_none();
        self.main.retain(keep);
        self.sub.retain(keep);
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    /// First active task with `id`.  The task whose hook is currently running
    /// is not visible here.
    pub fn find_task_with_id(&self, id: TaskId) -> Option<&dyn Task<E>> {
        self.slots()
            .filter(|s| s.active && s.id == id)
            .find_map(|s| s.task.as_deref())
    }

    pub fn is_task_active(&self, id: TaskId) -> bool {
        self.slots().any(|s| s.active && s.id == id)
    }

    /// Is native behavior `native` running on `agent`?  Delegates to the host.
    pub fn is_internal_task_active(&self, agent: AgentId, native: NativeTaskId, env: &E) -> bool {
        env.native_task_running(agent, native)
    }

    /// Ids of active tasks in processing order.
    pub fn active_ids(&self) -> Vec<TaskId> {
        self.slots().filter(|s| s.active).map(|s| s.id).collect()
    }

    /// Slots in the main list, including retired ones awaiting the sweep.
    pub fn main_len(&self) -> usize {
        self.main.len()
    }

    /// Slots in the sub list (permanent tasks included).
    pub fn sub_len(&self) -> usize {
        self.sub.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.sub.is_empty()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    fn slots(&self) -> impl Iterator<Item = &TaskSlot<E>> {
        self.main.iter().chain(self.sub.iter())
    }

    fn slot_mut(&mut self, serial: u64) -> Option<&mut TaskSlot<E>> {
        self.main
            .iter_mut()
            .chain(self.sub.iter_mut())
            .find(|s| s.serial == serial)
    }
}
