//! `Intelligence` — one per agent: who owns it, at what priority, and what
//! it is doing.

use tracing::{debug, trace};

use npc_core::{ActionPriority, AgentId, ControllerId};
use npc_task::{TaskCx, TaskEnv, TaskScheduler};

use crate::{Blacklist, ControllerRegistry, IntelligenceModule, ModuleMap, OwnerStatus};

/// Per-agent controller.
///
/// # Invariants
///
/// - `priority` is the owning controller's priority, or `Idle` with no owner.
/// - At most one owner; it changes only through [`request_for_action`] and
///   [`reset_action`], both of which notify the previous owner first.
///
/// [`request_for_action`]: Intelligence::request_for_action
/// [`reset_action`]: Intelligence::reset_action
pub struct Intelligence<E: TaskEnv + 'static> {
    agent:     AgentId,
    priority:  ActionPriority,
    owner:     Option<ControllerId>,
    scheduler: TaskScheduler<E>,
    /// Controllers this agent must not be handed to until the entry expires.
    blacklist: Blacklist<ControllerId>,
    modules:   ModuleMap<E>,
}

impl<E: TaskEnv + 'static> Intelligence<E> {
    pub fn new(agent: AgentId) -> Self {
        Self {
            agent,
            priority:  ActionPriority::Idle,
            owner:     None,
            scheduler: TaskScheduler::new(),
            blacklist: Blacklist::new(),
            modules:   ModuleMap::new(),
        }
    }

    #[inline]
    pub fn agent(&self) -> AgentId {
        self.agent
    }

    // ── Arbitration ───────────────────────────────────────────────────────

    /// Ask to own the agent at `priority`.
    ///
    /// Succeeds iff `priority` is strictly above the current priority.  On
    /// success the previous owner (if any) is notified before `requester` is
    /// recorded.  On failure nothing changes.
    pub fn request_for_action(
        &mut self,
        priority:    ActionPriority,
        requester:   ControllerId,
        controllers: &mut ControllerRegistry,
    ) -> bool {
        if !self.is_free_for_action(priority) {
            trace!(agent = %self.agent, %priority, current = %self.priority, "request denied");
            return false;
        }
        if let Some(previous) = self.owner {
            controllers.notify_left(previous, self.agent, Some(requester));
        }
        debug!(agent = %self.agent, controller = %requester, %priority, "ownership granted");
        self.owner = Some(requester);
        self.priority = priority;
        true
    }

    /// Privileged self-adjustment by the current owner.  No ordering check.
    pub fn change_action_priority(&mut self, priority: ActionPriority, controller: ControllerId) -> bool {
        if self.owner != Some(controller) {
            return false;
        }
        self.priority = priority;
        true
    }

    /// Release the agent back to idle.  A no-op unless `controller` owns it
    /// or `force` is set.  The previous owner is notified exactly once.
    pub fn reset_action(&mut self, controller: ControllerId, force: bool, controllers: &mut ControllerRegistry) {
        let Some(owner) = self.owner else { return };
        if owner != controller && !force {
            return;
        }
        // Clear first so a re-entrant reset from the callback sees no owner.
        self.owner = None;
        self.priority = ActionPriority::Idle;
        debug!(agent = %self.agent, controller = %owner, force, "ownership reset");
        controllers.notify_left(owner, self.agent, None);
    }

    #[inline]
    pub fn is_free_for_action(&self, priority: ActionPriority) -> bool {
        priority.outranks(self.priority)
    }

    #[inline]
    pub fn action_priority(&self) -> ActionPriority {
        self.priority
    }

    #[inline]
    pub fn owner(&self) -> Option<ControllerId> {
        self.owner
    }

    #[inline]
    pub fn is_owned_by(&self, controller: ControllerId) -> bool {
        self.owner == Some(controller)
    }

    pub fn owner_status(&self) -> OwnerStatus {
        OwnerStatus { priority: self.priority, owner: self.owner }
    }

    // ── Components ────────────────────────────────────────────────────────

    pub fn scheduler(&self) -> &TaskScheduler<E> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TaskScheduler<E> {
        &mut self.scheduler
    }

    pub fn blacklist(&self) -> &Blacklist<ControllerId> {
        &self.blacklist
    }

    pub fn blacklist_mut(&mut self) -> &mut Blacklist<ControllerId> {
        &mut self.blacklist
    }

    /// Attach a module.  `false` if one of the same type is already attached.
    pub fn register_module<M: IntelligenceModule<E>>(&mut self, module: Box<M>) -> bool {
        self.modules.register(module)
    }

    pub fn module<M: IntelligenceModule<E>>(&self) -> Option<&M> {
        self.modules.get::<M>()
    }

    pub fn module_mut<M: IntelligenceModule<E>>(&mut self) -> Option<&mut M> {
        self.modules.get_mut::<M>()
    }

    pub fn modules(&self) -> &ModuleMap<E> {
        &self.modules
    }

    // ── Per tick ──────────────────────────────────────────────────────────

    /// Tick modules, then the task scheduler.
    pub fn process(&mut self, env: &mut E) {
        if !self.modules.is_empty() {
            let status = self.owner_status();
            let mut cx = TaskCx::new(self.agent, env, &mut self.scheduler);
            self.modules.process_all(status, &mut cx);
        }
        self.scheduler.process(self.agent, env);
    }

    /// Abort every task (permanent included).  For agent teardown.
    pub fn shutdown(&mut self, env: &mut E) {
        self.scheduler.shutdown(self.agent, env);
    }
}
