use std::any::Any;

use npc_agent::{IntelligenceModule, OwnerStatus};
use npc_task::{Task, TaskClass, TaskCore, TaskCx, TaskResult};
use npc_world::{native, World};

use crate::tasks::{live_position, PATROL};
use crate::Blackboard;

/// Wander around while nobody has a use for the officer.
pub struct PatrolTask {
    core: TaskCore,
}

impl PatrolTask {
    pub fn new() -> Self {
        Self { core: TaskCore::new(PATROL, "patrol") }
    }
}

impl Default for PatrolTask {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: World> Task<Blackboard<W>> for PatrolTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_process(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<()> {
        live_position(&cx.env.world, cx.agent, "officer")?;
        if !cx.is_internal_task_active(native::WANDER) {
            cx.env.world.wander(cx.agent);
        }
        Ok(())
    }
}

/// Module that keeps idle officers patrolling.  Whoever recruits the
/// officer clears the patrol along with every other task.
#[derive(Debug, Default)]
pub struct AmbientPatrol {
    started: u64,
}

impl AmbientPatrol {
    /// Patrol tasks this module has assigned.
    pub fn started(&self) -> u64 {
        self.started
    }
}

impl<W: World + 'static> IntelligenceModule<Blackboard<W>> for AmbientPatrol {
    fn name(&self) -> &'static str {
        "ambient_patrol"
    }

    fn process(&mut self, status: OwnerStatus, cx: &mut TaskCx<'_, Blackboard<W>>) {
        if !status.is_idle() || cx.is_task_active(PATROL) || !cx.env.world.is_alive(cx.agent) {
            return;
        }
        cx.assign(Box::new(PatrolTask::new()), TaskClass::Sub);
        self.started += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
