//! `Pursuit` — the controller that owns every officer chasing one suspect.
//!
//! # Lifecycle
//!
//! ```text
//! Pursuit::start      register controller, mark suspect pursued, CriminalFleeing
//! Pursuit::recruit    blacklist check → request_for_action → clear tasks → PursuitTask
//!     ...             officers leave on their own (NoLongerNeeded, despawn) or
//!                     are taken by a higher-priority controller (ped_has_left)
//! apply_releases      between ticks: hand queued officers back to idle,
//!                     abort the pursuit task of officers taken by another owner
//! Pursuit::end        release everyone, unregister
//! ```

use std::any::Any;
use std::collections::BTreeSet;

use tracing::{debug, info};

use npc_agent::{ActionController, AgentRegistry, ControllerRegistry, Intelligence};
use npc_core::{ActionPriority, AgentId, ControllerId};
use npc_task::{TaskClass, TaskEnv};
use npc_world::{PursuitEvent, World};

use crate::tasks::PURSUIT;
use crate::{Blackboard, PursuitError, PursuitResult, PursuitTask};

pub struct Pursuit {
    id:       ControllerId,
    suspect:  AgentId,
    priority: ActionPriority,
    officers: BTreeSet<AgentId>,
    /// Officers that left, whatever the reason.
    departed: u64,
}

impl Pursuit {
    pub fn new(id: ControllerId, suspect: AgentId) -> Self {
        Self {
            id,
            suspect,
            priority: ActionPriority::RequiredByScript,
            officers: BTreeSet::new(),
            departed: 0,
        }
    }

    pub fn with_priority(mut self, priority: ActionPriority) -> Self {
        self.priority = priority;
        self
    }

    #[inline]
    pub fn suspect(&self) -> AgentId {
        self.suspect
    }

    #[inline]
    pub fn priority(&self) -> ActionPriority {
        self.priority
    }

    /// Officers currently owned, ascending.
    pub fn officers(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.officers.iter().copied()
    }

    pub fn contains(&self, officer: AgentId) -> bool {
        self.officers.contains(&officer)
    }

    pub fn officer_count(&self) -> usize {
        self.officers.len()
    }

    pub fn departed(&self) -> u64 {
        self.departed
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Open a pursuit of `suspect` at `priority`.
    pub fn start<W: World>(
        controllers: &mut ControllerRegistry,
        env:         &mut Blackboard<W>,
        suspect:     AgentId,
        priority:    ActionPriority,
    ) -> PursuitResult<ControllerId> {
        let position = env.world.position(suspect).ok_or(PursuitError::UnknownSuspect(suspect))?;
        let id = controllers.allocate_id();
        controllers.register(Box::new(Pursuit::new(id, suspect).with_priority(priority)))?;
        env.resources.mark_pursued(suspect);
        env.publish(PursuitEvent::CriminalFleeing { suspect, position });
        info!(pursuit = %id, suspect = %suspect, %priority, "pursuit started");
        Ok(id)
    }

    /// Bring the officer behind `intel` into pursuit `id`.
    ///
    /// `Ok(false)` when the officer is on this pursuit's cooldown or busy at
    /// an equal or higher priority.  `Ok(true)` if the officer already
    /// belongs to it.
    pub fn recruit<W: World>(
        controllers: &mut ControllerRegistry,
        id:          ControllerId,
        intel:       &mut Intelligence<Blackboard<W>>,
        env:         &mut Blackboard<W>,
    ) -> PursuitResult<bool> {
        let (suspect, priority) = {
            let pursuit = controllers.get::<Pursuit>(id).ok_or(PursuitError::NotAPursuit(id))?;
            (pursuit.suspect, pursuit.priority)
        };
        if !env.world.agent_exists(suspect) {
            return Err(PursuitError::UnknownSuspect(suspect));
        }
        let agent = intel.agent();
        if intel.is_owned_by(id) {
            return Ok(true);
        }
        if intel.blacklist_mut().contains(id, env.now()) {
            debug!(officer = %agent, pursuit = %id, "recruit skipped: cooling down");
            return Ok(false);
        }
        if !intel.request_for_action(priority, id, controllers) {
            return Ok(false);
        }

        intel.scheduler_mut().clear_tasks(agent, env);
        intel
            .scheduler_mut()
            .assign(Box::new(PursuitTask::new(suspect, id, priority)), TaskClass::Main, agent, env);
        if let Some(pursuit) = controllers.get_mut::<Pursuit>(id) {
            pursuit.officers.insert(agent);
        }
        info!(officer = %agent, pursuit = %id, suspect = %suspect, "officer recruited");
        Ok(true)
    }

    /// Release every officer and unregister the pursuit.
    pub fn end<W: World>(
        controllers: &mut ControllerRegistry,
        agents:      &mut AgentRegistry<Blackboard<W>>,
        env:         &mut Blackboard<W>,
        id:          ControllerId,
    ) -> PursuitResult<()> {
        let (suspect, officers) = {
            let pursuit = controllers.get::<Pursuit>(id).ok_or(PursuitError::NotAPursuit(id))?;
            (pursuit.suspect, pursuit.officers().collect::<Vec<_>>())
        };
        for officer in officers {
            if let Some(intel) = agents.get_mut(officer) {
                intel.reset_action(id, false, controllers);
                intel.scheduler_mut().clear_tasks(officer, env);
            }
        }
        controllers.unregister(id)?;
        env.resources.unmark_pursued(suspect);
        info!(pursuit = %id, suspect = %suspect, "pursuit ended");
        Ok(())
    }
}

impl ActionController for Pursuit {
    fn id(&self) -> ControllerId {
        self.id
    }

    fn name(&self) -> &str {
        "pursuit"
    }

    fn ped_has_left(&mut self, agent: AgentId, successor: Option<ControllerId>) {
        if self.officers.remove(&agent) {
            self.departed += 1;
            debug!(pursuit = %self.id, officer = %agent, ?successor, "officer left pursuit");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Apply every release queued during the tick.  A release with a cooldown
/// also blacklists the controller on the officer so it cannot re-recruit
/// them straight away.  Returns how many officers were actually released.
///
/// Officers whose pursuit lost them to another controller have their
/// pursuit task aborted here; the new owner's tasks are left alone.
pub fn apply_releases<W: World>(
    env:         &mut Blackboard<W>,
    agents:      &mut AgentRegistry<Blackboard<W>>,
    controllers: &mut ControllerRegistry,
) -> usize {
    let now = env.now();
    let mut released = 0;
    for release in env.take_releases() {
        let Some(intel) = agents.get_mut(release.agent) else { continue };
        if release.cooldown > 0 {
            intel.blacklist_mut().add(release.controller, now, release.cooldown);
        }
        if intel.is_owned_by(release.controller) {
            intel.reset_action(release.controller, false, controllers);
            released += 1;
        }
    }
    abort_evicted(env, agents);
    released
}

fn abort_evicted<W: World>(env: &mut Blackboard<W>, agents: &mut AgentRegistry<Blackboard<W>>) {
    for (agent, controller) in env.chaser_owners() {
        let Some(intel) = agents.get_mut(agent) else { continue };
        if intel.is_owned_by(controller) {
            continue;
        }
        debug!(officer = %agent, pursuit = %controller, owner = ?intel.owner(), "pursuit task evicted");
        if !intel.scheduler_mut().abort_task(PURSUIT, agent, env) {
            env.forget_chaser(agent);
        }
    }
}
