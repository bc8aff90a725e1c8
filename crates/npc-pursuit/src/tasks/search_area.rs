use std::sync::Arc;

use tracing::debug;

use npc_core::geo::planar_distance;
use npc_core::{AgentId, TravelMode, VehicleId};
use npc_task::{Task, TaskCore, TaskCx, TaskError, TaskResult, TimeoutSupervisor};
use npc_world::{native, MoveStyle, Seat, World};

use crate::tasks::{live_position, SEARCH};
use crate::{Blackboard, Role, RoleGuard, SearchMode, SearchPlaceLease, TargetResources};

/// Look for a suspect nobody can see.
///
/// Works through search places handed out by the target's pool: walk (or
/// drive, or fly) to one, mark it searched on arrival, ask for the next.  A
/// place not reached within `search_place_timeout_ms` goes back to the pool.
/// When the pool has nothing to offer the officer wanders and retries after
/// the same interval.
pub struct SearchTask {
    core:      TaskCore,
    suspect:   AgentId,
    resources: Arc<TargetResources>,
    mode:      SearchMode,
    /// Vehicle to get into first when searching by car from foot.
    vehicle:   Option<VehicleId>,
    searching: Option<RoleGuard>,
    lease:     Option<SearchPlaceLease>,
    place:     TimeoutSupervisor,
    wandering: bool,
    searched:  u32,
}

impl SearchTask {
    pub fn new(
        suspect:     AgentId,
        resources:   Arc<TargetResources>,
        mode:        SearchMode,
        vehicle:     Option<VehicleId>,
        place_ticks: u64,
    ) -> Self {
        Self {
            core: TaskCore::new(SEARCH, "search"),
            suspect,
            resources,
            mode,
            vehicle,
            searching: None,
            lease: None,
            place: TimeoutSupervisor::new(place_ticks),
            wandering: false,
            searched: 0,
        }
    }

    #[inline]
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Places this task has marked searched.
    #[inline]
    pub fn searched(&self) -> u32 {
        self.searched
    }

    fn style(&self) -> MoveStyle {
        match self.mode {
            SearchMode::OnFoot     => MoveStyle::Run,
            SearchMode::InVehicle  => MoveStyle::Drive,
            SearchMode::Helicopter => MoveStyle::Fly,
        }
    }

    /// Sort out the officer's means of travel.  `true` once it matches the
    /// search mode.
    fn ready_to_search<W: World>(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> bool {
        let agent = cx.agent;
        let mode = cx.env.world.travel_mode(agent);
        match (self.mode, mode) {
            (SearchMode::OnFoot, TravelMode::OnFoot) => true,
            (SearchMode::OnFoot, _) => {
                if !cx.is_internal_task_active(native::LEAVE_VEHICLE) {
                    cx.env.world.leave_vehicle(agent);
                }
                false
            }
            (_, TravelMode::OnFoot) => match self.vehicle.filter(|&v| cx.env.world.vehicle_exists(v)) {
                Some(v) => {
                    if !cx.is_internal_task_active(native::ENTER_VEHICLE) {
                        cx.env.world.enter_vehicle(agent, v, Seat::Driver);
                    }
                    false
                }
                None => {
                    self.mode = SearchMode::OnFoot;
                    self.swap_role(cx);
                    true
                }
            },
            _ => true,
        }
    }

    fn role(&self) -> Role {
        match self.mode {
            SearchMode::OnFoot => Role::SearchingOnFoot,
            SearchMode::InVehicle | SearchMode::Helicopter => Role::SearchingInVehicle,
        }
    }

    fn swap_role<W: World>(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        self.searching = Some(self.resources.counters().acquire(self.role(), cx.agent));
    }
}

impl<W: World> Task<Blackboard<W>> for SearchTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_initialize(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        self.swap_role(cx);
        self.place.reset(cx.now());
    }

    fn on_process(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<()> {
        let agent = cx.agent;
        let me = live_position(&cx.env.world, agent, "officer")?;
        if !cx.env.world.agent_exists(self.suspect) {
            return Err(TaskError::StaleReference("suspect"));
        }
        if !self.ready_to_search(cx) {
            return Ok(());
        }
        let now = cx.now();

        if let Some(lease) = self.lease.take() {
            if planar_distance(me, lease.position()) <= cx.env.config.search_arrival_radius {
                lease.complete();
                self.searched += 1;
            } else if self.place.expired(now) {
                debug!(officer = %agent, "search place not reached in time; returning it");
            } else {
                if !cx.is_internal_task_active(native::GO_TO) {
                    cx.env.world.go_to(agent, lease.position(), self.style());
                }
                self.lease = Some(lease);
                return Ok(());
            }
        }

        if self.wandering && !self.place.expired(now) {
            if !cx.is_internal_task_active(native::WANDER) {
                cx.env.world.wander(agent);
            }
            return Ok(());
        }

        let center = cx.env.chaser(agent).map_or(me, |s| s.last_known);
        match cx.env.allocate_search_place(&self.resources, agent, self.mode, center) {
            Ok(lease) => {
                cx.env.world.go_to(agent, lease.position(), self.style());
                self.lease = Some(lease);
                self.wandering = false;
            }
            Err(err) => {
                debug!(officer = %agent, %err, "wandering instead");
                cx.env.world.wander(agent);
                self.wandering = true;
            }
        }
        self.place.reset(now);
        Ok(())
    }

    fn on_abort(&mut self, _cx: &mut TaskCx<'_, Blackboard<W>>) {
        self.lease = None;
        self.searching = None;
    }
}
