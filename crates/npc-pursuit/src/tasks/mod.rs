//! Concrete tasks: the pursuit decision task and one task per action.
//!
//! | Task               | Action(s)                                  | Role held          |
//! |--------------------|--------------------------------------------|--------------------|
//! | `PursuitTask`      | decides, runs as the main task             | `Chasing`, `Visual`|
//! | `FootChaseTask`    | `ChaseOnFoot`, `RequestVehicle`            | `ChasingOnFoot`    |
//! | `VehicleChaseTask` | `ChaseInVehicle`, `ChaseInHelicopter`      |                    |
//! | `TaseTask`         | `Tase`                                     | `Tasing`           |
//! | `ArrestTask`       | `Bust`                                     |                    |
//! | `NegotiateTask`    | `AskToDropWeapon`, `NegotiateToDropWeapon` |                    |
//! | `DragOutTask`      | `DragOutOfVehicle`                         |                    |
//! | `EnterVehicleTask` | `GetIntoNewVehicle`                        | vehicle claim      |
//! | `SearchTask`       | `LookForCriminal`                          | `Searching*`, lease|
//! | `PatrolTask`       | ambient, idle officers                     |                    |

mod arrest;
mod chase;
mod patrol;
mod pursuit;
mod search_area;
mod vehicle;

pub use arrest::{ArrestTask, DragOutTask, NegotiateTask, TaseTask};
pub use chase::{FootChaseTask, VehicleChaseTask};
pub use patrol::{AmbientPatrol, PatrolTask};
pub use pursuit::PursuitTask;
pub use search_area::SearchTask;
pub use vehicle::EnterVehicleTask;

use npc_core::{AgentId, TaskId, Vec3};
use npc_task::{TaskError, TaskResult};
use npc_world::World;

pub const PURSUIT:       TaskId = TaskId(100);
pub const FOOT_CHASE:    TaskId = TaskId(101);
pub const VEHICLE_CHASE: TaskId = TaskId(102);
pub const TASE:          TaskId = TaskId(103);
pub const ARREST:        TaskId = TaskId(104);
pub const NEGOTIATE:     TaskId = TaskId(105);
pub const DRAG_OUT:      TaskId = TaskId(106);
pub const ENTER_VEHICLE: TaskId = TaskId(107);
pub const SEARCH:        TaskId = TaskId(108);
pub const PATROL:        TaskId = TaskId(110);

/// Position of a live agent, or the stale-reference error tasks retire on.
pub(crate) fn live_position<W: World>(world: &W, agent: AgentId, what: &'static str) -> TaskResult<Vec3> {
    if !world.is_alive(agent) {
        return Err(TaskError::StaleReference(what));
    }
    world.position(agent).ok_or(TaskError::StaleReference(what))
}

/// Officer and suspect positions; either missing retires the task.
pub(crate) fn both_positions<W: World>(world: &W, agent: AgentId, suspect: AgentId) -> TaskResult<(Vec3, Vec3)> {
    let me = live_position(world, agent, "officer")?;
    let them = world.position(suspect).ok_or(TaskError::StaleReference("suspect"))?;
    Ok((me, them))
}
