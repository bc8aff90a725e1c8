//! `AgentRegistry` — every `Intelligence` in the simulation.
//!
//! Agents come and go at the host's whim, so storage is a `BTreeMap` keyed by
//! `AgentId` rather than a dense array.  Iteration is in ascending id order,
//! which is the order the simulation ticks agents in.

use std::collections::BTreeMap;

use tracing::debug;

use npc_core::AgentId;
use npc_task::TaskEnv;

use crate::{AgentError, AgentResult, ControllerRegistry, Intelligence};

pub struct AgentRegistry<E: TaskEnv + 'static> {
    agents: BTreeMap<AgentId, Intelligence<E>>,
}

impl<E: TaskEnv + 'static> Default for AgentRegistry<E> {
    fn default() -> Self {
        Self { agents: BTreeMap::new() }
    }
}

impl<E: TaskEnv + 'static> AgentRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an idle `Intelligence` for `agent`.
    pub fn spawn(&mut self, agent: AgentId) -> AgentResult<&mut Intelligence<E>> {
        if self.agents.contains_key(&agent) {
            return Err(AgentError::AlreadySpawned(agent));
        }
        debug!(agent = %agent, "agent spawned");
        Ok(self.agents.entry(agent).or_insert_with(|| Intelligence::new(agent)))
    }

    /// Tear an agent down: release its owner (who is told the agent left),
    /// abort every task, drop the `Intelligence`.
    pub fn despawn(&mut self, agent: AgentId, env: &mut E, controllers: &mut ControllerRegistry) -> AgentResult<()> {
        let mut intel = self.agents.remove(&agent).ok_or(AgentError::NotFound(agent))?;
        if let Some(owner) = intel.owner() {
            intel.reset_action(owner, true, controllers);
        }
        intel.shutdown(env);
        debug!(agent = %agent, "agent despawned");
        Ok(())
    }

    pub fn get(&self, agent: AgentId) -> Option<&Intelligence<E>> {
        self.agents.get(&agent)
    }

    pub fn get_mut(&mut self, agent: AgentId) -> Option<&mut Intelligence<E>> {
        self.agents.get_mut(&agent)
    }

    pub fn try_get_mut(&mut self, agent: AgentId) -> AgentResult<&mut Intelligence<E>> {
        self.agents.get_mut(&agent).ok_or(AgentError::NotFound(agent))
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.agents.contains_key(&agent)
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Intelligence<E>)> {
        self.agents.iter().map(|(&id, intel)| (id, intel))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
