//! Type-erased extension modules attached to an `Intelligence`.
//!
//! # Design
//!
//! A module is a small per-agent component with its own per-tick hook, run
//! before the agent's task scheduler.  Modules are stored as
//! `Box<dyn IntelligenceModule<E>>` in registration order (so ticking is
//! deterministic) and looked up by concrete type through `as_any`.
//!
//! # Usage
//!
//! ```ignore
//! intel.register_module(Box::new(AmbientPatrol::default()));
//! let patrol: &AmbientPatrol = intel.module::<AmbientPatrol>().unwrap();
//! ```

use std::any::{Any, TypeId};

use npc_core::{ActionPriority, ControllerId};
use npc_task::{TaskCx, TaskEnv};

/// Ownership snapshot handed to modules.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OwnerStatus {
    pub priority: ActionPriority,
    pub owner:    Option<ControllerId>,
}

impl OwnerStatus {
    /// Nobody owns the agent.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.owner.is_none()
    }
}

/// Per-agent extension with its own tick hook.
pub trait IntelligenceModule<E: TaskEnv + 'static>: 'static {
    fn name(&self) -> &'static str;

    /// Called once per tick before the scheduler runs.  May assign tasks.
    fn process(&mut self, status: OwnerStatus, cx: &mut TaskCx<'_, E>);

    #[doc(hidden)]
    fn as_any(&self) -> &dyn Any;

    #[doc(hidden)]
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Registry of modules, at most one per concrete type.
pub struct ModuleMap<E: TaskEnv + 'static> {
    modules: Vec<(TypeId, Box<dyn IntelligenceModule<E>>)>,
}

impl<E: TaskEnv + 'static> Default for ModuleMap<E> {
    fn default() -> Self {
        Self { modules: Vec::new() }
    }
}

impl<E: TaskEnv + 'static> ModuleMap<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module.  Returns `false` (and drops `module`) if one of the same
    /// type is already registered, leaving the existing one undisturbed.
    pub fn register<M: IntelligenceModule<E>>(&mut self, module: Box<M>) -> bool {
        let key = TypeId::of::<M>();
        if self.modules.iter().any(|(k, _)| *k == key) {
            return false;
        }
        let module: Box<dyn IntelligenceModule<E>> = module;
        self.modules.push((key, module));
        true
    }

    pub fn contains<M: IntelligenceModule<E>>(&self) -> bool {
        let key = TypeId::of::<M>();
        self.modules.iter().any(|(k, _)| *k == key)
    }

    pub fn get<M: IntelligenceModule<E>>(&self) -> Option<&M> {
        let key = TypeId::of::<M>();
        self.modules
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, m)| m.as_any().downcast_ref::<M>())
    }

    pub fn get_mut<M: IntelligenceModule<E>>(&mut self) -> Option<&mut M> {
        let key = TypeId::of::<M>();
        self.modules
            .iter_mut()
            .find(|(k, _)| *k == key)
            .and_then(|(_, m)| m.as_any_mut().downcast_mut::<M>())
    }

    pub fn remove<M: IntelligenceModule<E>>(&mut self) -> bool {
        let key = TypeId::of::<M>();
        let before = self.modules.len();
        self.modules.retain(|(k, _)| *k != key);
        self.modules.len() != before
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Tick every module in registration order.
    pub fn process_all(&mut self, status: OwnerStatus, cx: &mut TaskCx<'_, E>) {
        for (_, module) in &mut self.modules {
            module.process(status, cx);
        }
    }
}
