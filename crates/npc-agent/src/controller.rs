//! External requesters that can own an agent's behavior.
//!
//! # Design
//!
//! A controller is anything that asks for agents: a pursuit, a scripted
//! scene, an ambient crowd system.  Each is registered once under a
//! [`ControllerId`]; agents only ever store that id.  When an agent changes
//! hands, the registry routes the eviction callback to the previous owner.
//!
//! Controllers are stored type-erased.  Callers that know the concrete type
//! downcast through [`ControllerRegistry::get`] / [`get_mut`], the same
//! `as_any` pattern the agent module map uses.
//!
//! [`get_mut`]: ControllerRegistry::get_mut

use std::any::Any;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use npc_core::{AgentId, ControllerId};

use crate::{AgentError, AgentResult};

/// An external subsystem that requests ownership of agents.
pub trait ActionController: 'static {
    fn id(&self) -> ControllerId;

    fn name(&self) -> &str {
        "controller"
    }

    /// Eviction callback: `agent` no longer belongs to this controller.
    ///
    /// `successor` is the controller taking over, or `None` when the agent
    /// was reset to idle.  Called before the successor is recorded as owner.
    fn ped_has_left(&mut self, agent: AgentId, successor: Option<ControllerId>);

    #[doc(hidden)]
    fn as_any(&self) -> &dyn Any;

    #[doc(hidden)]
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// All registered controllers, keyed by id.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: BTreeMap<ControllerId, Box<dyn ActionController>>,
    next_id:     u32,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh id for a controller about to be constructed.
    pub fn allocate_id(&mut self) -> ControllerId {
        loop {
            let id = ControllerId(self.next_id);
            self.next_id = self.next_id.wrapping_add(1);
            if id.is_valid() && !self.controllers.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn register(&mut self, controller: Box<dyn ActionController>) -> AgentResult<ControllerId> {
        let id = controller.id();
        if self.controllers.contains_key(&id) {
            return Err(AgentError::DuplicateController(id));
        }
        debug!(controller = %id, name = controller.name(), "controller registered");
        self.controllers.insert(id, controller);
        Ok(id)
    }

    /// Remove a controller.  Agents it still owns keep pointing at the id;
    /// reset them first if that matters.
    pub fn unregister(&mut self, id: ControllerId) -> AgentResult<Box<dyn ActionController>> {
        self.controllers.remove(&id).ok_or(AgentError::UnknownController(id))
    }

    pub fn contains(&self, id: ControllerId) -> bool {
        self.controllers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn ids(&self) -> Vec<ControllerId> {
        self.controllers.keys().copied().collect()
    }

    pub fn get_dyn_mut(&mut self, id: ControllerId) -> Option<&mut dyn ActionController> {
        match self.controllers.get_mut(&id) {
            Some(c) => Some(c.as_mut()),
            None => None,
        }
    }

    /// Typed access to a controller.  `None` if absent or of another type.
    pub fn get<T: ActionController>(&self, id: ControllerId) -> Option<&T> {
        self.controllers.get(&id)?.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: ActionController>(&mut self, id: ControllerId) -> Option<&mut T> {
        self.controllers.get_mut(&id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Route an eviction callback.  A missing controller is logged and
    /// otherwise ignored.
    pub fn notify_left(&mut self, owner: ControllerId, agent: AgentId, successor: Option<ControllerId>) {
        match self.controllers.get_mut(&owner) {
            Some(c) => c.ped_has_left(agent, successor),
            None => warn!(controller = %owner, agent = %agent, "eviction for unregistered controller"),
        }
    }
}
