use std::sync::Arc;

use tracing::debug;

use npc_core::VehicleId;
use npc_task::{Task, TaskCore, TaskCx, TaskError, TaskResult, TimeoutSupervisor};
use npc_world::{native, Seat, World};

use crate::tasks::{live_position, ENTER_VEHICLE};
use crate::{Blackboard, TargetResources};

/// Get into a free vehicle to keep up with the suspect.
///
/// The vehicle is claimed on the target's blacklist for the task's lifetime
/// so other officers of the same pursuit pick a different one; the claimant
/// keeps seeing it.  A vehicle the officer could not get into (stuck,
/// deadline) stays blacklisted for everyone for `vehicle_blacklist_ms`.
pub struct EnterVehicleTask {
    core:      TaskCore,
    vehicle:   VehicleId,
    resources: Arc<TargetResources>,
    claimed:   bool,
}

impl EnterVehicleTask {
    pub fn new(vehicle: VehicleId, resources: Arc<TargetResources>, timeout_ticks: u64) -> Self {
        Self {
            core: TaskCore::new(ENTER_VEHICLE, "enter_vehicle").with_timeout(TimeoutSupervisor::new(timeout_ticks)),
            vehicle,
            resources,
            claimed: false,
        }
    }

    #[inline]
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    fn give_up<W: World>(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        let ticks = cx.env.ticks_for_ms(cx.env.config.vehicle_blacklist_ms);
        self.resources.give_up_vehicle(self.vehicle, cx.now(), ticks);
        self.claimed = false;
    }
}

impl<W: World> Task<Blackboard<W>> for EnterVehicleTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_initialize(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        let ticks = cx.env.ticks_for_ms(cx.env.config.enter_vehicle_timeout_ms);
        self.resources.claim_vehicle(self.vehicle, cx.agent, cx.now(), ticks);
        self.claimed = true;
    }

    fn on_process(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<()> {
        let agent = cx.agent;
        live_position(&cx.env.world, agent, "officer")?;
        if !cx.env.world.vehicle_exists(self.vehicle) {
            return Err(TaskError::StaleReference("vehicle"));
        }

        if cx.env.world.vehicle_of(agent) == Some(self.vehicle) {
            debug!(officer = %agent, vehicle = %self.vehicle, "entered vehicle");
            self.make_abortable(cx);
            return Ok(());
        }
        if cx.env.world.is_stuck(agent) {
            self.give_up(cx);
            return Err(TaskError::Failed(format!("stuck on the way to {}", self.vehicle)));
        }
        if !cx.is_internal_task_active(native::ENTER_VEHICLE) {
            cx.env.world.enter_vehicle(agent, self.vehicle, Seat::Driver);
        }
        Ok(())
    }

    fn on_abort(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        if self.claimed {
            self.resources.release_vehicle(self.vehicle, cx.agent);
            self.claimed = false;
        }
    }

    fn on_timeout(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        self.give_up(cx);
    }
}
