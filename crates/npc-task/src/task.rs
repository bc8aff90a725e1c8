//! The `Task` trait and the context handed to its hooks.

use npc_core::{AgentId, NativeTaskId, TaskId, Tick};

use crate::{TaskClass, TaskResult, TaskScheduler, TimeoutSupervisor};

// ── Environment ───────────────────────────────────────────────────────────────

/// What the scheduler itself needs from the outside world.  Concrete task
/// families extend this with their own world access (see `npc-pursuit`).
pub trait TaskEnv {
    /// Current simulation tick.
    fn now(&self) -> Tick;

    /// Is the host running native behavior `task` on `agent` right now?
    fn native_task_running(&self, agent: AgentId, task: NativeTaskId) -> bool;
}

// ── Shared task state ─────────────────────────────────────────────────────────

/// Identity, active flag and deadline common to every task.
#[derive(Clone, Debug)]
pub struct TaskCore {
    id:      TaskId,
    name:    &'static str,
    active:  bool,
    timeout: TimeoutSupervisor,
}

impl TaskCore {
    /// A task with no deadline.
    pub fn new(id: TaskId, name: &'static str) -> Self {
        Self { id, name, active: false, timeout: TimeoutSupervisor::disabled() }
    }

    pub fn with_timeout(mut self, timeout: TimeoutSupervisor) -> Self {
        self.timeout = timeout;
        self
    }

    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn timeout(&self) -> &TimeoutSupervisor {
        &self.timeout
    }

    pub fn timeout_mut(&mut self) -> &mut TimeoutSupervisor {
        &mut self.timeout
    }
}

// ── Hook context ──────────────────────────────────────────────────────────────

/// Borrowed view passed to every task hook: the agent being processed, the
/// environment, and the agent's own scheduler (so a task can assign or abort
/// siblings).  The task currently running is not reachable through
/// `scheduler`; it is held outside its slot for the duration of the hook.
pub struct TaskCx<'a, E: TaskEnv> {
    pub agent:     AgentId,
    pub env:       &'a mut E,
    pub scheduler: &'a mut TaskScheduler<E>,
}

impl<'a, E: TaskEnv> TaskCx<'a, E> {
    pub fn new(agent: AgentId, env: &'a mut E, scheduler: &'a mut TaskScheduler<E>) -> Self {
        Self { agent, env, scheduler }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.env.now()
    }

    pub fn assign(&mut self, task: Box<dyn Task<E>>, class: TaskClass) {
        self.scheduler.assign(task, class, self.agent, self.env);
    }

    pub fn clear_main_task(&mut self) {
        self.scheduler.clear_main_task(self.agent, self.env);
    }

    pub fn clear_sub_tasks(&mut self) {
        self.scheduler.clear_sub_tasks(self.agent, self.env);
    }

    pub fn abort_task(&mut self, id: TaskId) -> bool {
        self.scheduler.abort_task(id, self.agent, self.env)
    }

    pub fn is_task_active(&self, id: TaskId) -> bool {
        self.scheduler.is_task_active(id)
    }

    pub fn is_internal_task_active(&self, native: NativeTaskId) -> bool {
        self.env.native_task_running(self.agent, native)
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A unit of per-tick behavior.
///
/// Implementors provide [`core`](Task::core)/[`core_mut`](Task::core_mut)
/// and override the `on_*` hooks.  The provided wrappers
/// [`initialize`](Task::initialize), [`make_abortable`](Task::make_abortable)
/// and [`is_active`](Task::is_active) carry the lifecycle rules and are not
/// meant to be overridden.
///
/// # Resource discipline
///
/// Anything a task acquires that others can observe (shared counters, event
/// subscriptions, allocator leases) is held as an RAII guard in an `Option`
/// field, taken in `on_initialize` and dropped in `on_abort`.  Dropping the
/// task releases it as well, so no exit path can leak.
pub trait Task<E: TaskEnv> {
    fn core(&self) -> &TaskCore;

    fn core_mut(&mut self) -> &mut TaskCore;

    /// Called once from `initialize`.  May assign child tasks.
    fn on_initialize(&mut self, _cx: &mut TaskCx<'_, E>) {}

    /// Per-tick logic.  Must check that the entities it works on still exist
    /// and return [`TaskError::StaleReference`](crate::TaskError) otherwise.
    fn on_process(&mut self, cx: &mut TaskCx<'_, E>) -> TaskResult<()>;

    /// Release everything acquired in `on_initialize`.  Called at most once
    /// per activation.
    fn on_abort(&mut self, _cx: &mut TaskCx<'_, E>) {}

    /// Corrective action when the deadline passes, just before the forced
    /// abort.
    fn on_timeout(&mut self, _cx: &mut TaskCx<'_, E>) {}

    // ── Provided ──────────────────────────────────────────────────────────

    #[inline]
    fn id(&self) -> TaskId {
        self.core().id
    }

    #[inline]
    fn name(&self) -> &'static str {
        self.core().name
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.core().active
    }

    /// Reset the deadline, mark active, run `on_initialize`.
    fn initialize(&mut self, cx: &mut TaskCx<'_, E>) {
        let now = cx.now();
        let core = self.core_mut();
        core.timeout.reset(now);
        core.active = true;
        self.on_initialize(cx);
    }

    /// Retire the task.  A no-op if it is already inactive.
    fn make_abortable(&mut self, cx: &mut TaskCx<'_, E>) {
        if !self.core().active {
            return;
        }
        self.core_mut().active = false;
        self.on_abort(cx);
    }
}
