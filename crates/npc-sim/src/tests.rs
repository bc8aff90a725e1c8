//! Integration tests for npc-sim.

use std::cell::RefCell;
use std::rc::Rc;

use npc_core::{AgentId, ControllerId, SimConfig, Tick, Vec3};
use npc_pursuit::Blackboard;
use npc_world::{EntityQuery, SandboxWorld, World};

use crate::{Sim, SimBuilder, SimError, SimObserver, TickSummary};

// ── Helpers ───────────────────────────────────────────────────────────────────

const OFFICER: AgentId = AgentId(1);
const SUSPECT: AgentId = AgentId(2);
const PARTNER: AgentId = AgentId(3);

fn test_config(total_ticks: u64) -> SimConfig {
    SimConfig { tick_duration_ms: 250, total_ticks, seed: 7 }
}

fn at(x: f32) -> Vec3 {
    Vec3::new(x, 0.0, 0.0)
}

/// Officer at the origin, partner 5 m behind, suspect `distance` metres east.
fn street(distance: f32) -> SandboxWorld {
    let mut world = SandboxWorld::new();
    world.add_agent(OFFICER, at(0.0)).unwrap();
    world.add_agent(PARTNER, at(-5.0)).unwrap();
    world.add_agent(SUSPECT, at(distance)).unwrap();
    world
}

fn sim(distance: f32, total_ticks: u64) -> Sim<SandboxWorld> {
    SimBuilder::new(test_config(total_ticks), street(distance))
        .officers([OFFICER, PARTNER])
        .host_step(|w: &mut SandboxWorld, dt| w.step(dt))
        .build()
        .unwrap()
}

fn build_err(builder: SimBuilder<SandboxWorld>) -> SimError {
    match builder.build() {
        Ok(_) => panic!("build should have failed"),
        Err(e) => e,
    }
}

#[derive(Default)]
struct Recorder {
    starts:    Vec<Tick>,
    summaries: Vec<TickSummary>,
    ended:     Vec<(ControllerId, AgentId)>,
    snapshots: Vec<Tick>,
    end:       Option<Tick>,
}

impl<W: World> SimObserver<W> for Recorder {
    fn on_tick_start(&mut self, tick: Tick) {
        self.starts.push(tick);
    }

    fn on_tick_end(&mut self, _tick: Tick, summary: &TickSummary) {
        self.summaries.push(*summary);
    }

    fn on_pursuit_ended(&mut self, _tick: Tick, pursuit: ControllerId, suspect: AgentId) {
        self.ended.push((pursuit, suspect));
    }

    fn on_snapshot(&mut self, tick: Tick, _env: &Blackboard<W>) {
        self.snapshots.push(tick);
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        self.end = Some(final_tick);
    }
}

// ── SimBuilder validation ─────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use npc_agent::AgentError;
    use npc_core::CoreError;
    use npc_pursuit::{PursuitConfig, PursuitError};

    use super::*;

    #[test]
    fn builds_and_spawns_officers() {
        let sim = sim(50.0, 10);
        assert_eq!(sim.agents.len(), 2);
        assert!(sim.agents.contains(OFFICER));
        assert!(!sim.agents.contains(SUSPECT));
        assert_eq!(sim.now(), Tick(0));
        assert!(sim.pursuits().is_empty());
    }

    #[test]
    fn zero_tick_duration_is_rejected() {
        let config = SimConfig { tick_duration_ms: 0, ..test_config(10) };
        let err = build_err(SimBuilder::new(config, street(50.0)));
        assert!(matches!(err, SimError::Core(CoreError::Config(_))));
    }

    #[test]
    fn invalid_pursuit_config_is_rejected() {
        let mut pursuit = PursuitConfig::default();
        pursuit.search.max_attempts = 0;
        let err = build_err(SimBuilder::new(test_config(10), street(50.0)).pursuit_config(pursuit));
        assert!(matches!(err, SimError::Pursuit(PursuitError::Config(_))));
    }

    #[test]
    fn officer_missing_from_world_is_rejected() {
        let err = build_err(SimBuilder::new(test_config(10), street(50.0)).officers([AgentId(99)]));
        assert!(matches!(err, SimError::UnknownAgent(AgentId(99))));
    }

    #[test]
    fn duplicate_officer_is_rejected() {
        let err = build_err(SimBuilder::new(test_config(10), street(50.0)).officers([OFFICER, OFFICER]));
        assert!(matches!(err, SimError::Agent(AgentError::AlreadySpawned(OFFICER))));
    }
}

// ── Tick loop ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run_tests {
    use super::*;

    #[test]
    fn run_stops_at_end_tick() {
        let mut sim = sim(50.0, 10);
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        assert_eq!(rec.starts.len(), 10);
        assert_eq!(rec.starts.first(), Some(&Tick(0)));
        assert_eq!(rec.starts.last(), Some(&Tick(9)));
        assert_eq!(rec.end, Some(Tick(10)));
        assert!(rec.summaries.iter().all(|s| s.processed == 2));
    }

    #[test]
    fn run_ticks_ignores_end_tick() {
        let mut sim = sim(50.0, 2);
        let mut rec = Recorder::default();
        sim.run_ticks(5, &mut rec).unwrap();
        assert_eq!(sim.now(), Tick(5));
        assert_eq!(rec.starts.len(), 5);
        assert_eq!(rec.end, None);
    }

    #[test]
    fn snapshots_follow_the_interval() {
        let mut sim = SimBuilder::new(test_config(10), street(50.0))
            .snapshot_interval(4)
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        assert_eq!(rec.snapshots, vec![Tick(0), Tick(4), Tick(8)]);
    }

    #[test]
    fn host_step_receives_tick_seconds() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut sim = SimBuilder::new(test_config(3), street(50.0))
            .host_step(move |_: &mut SandboxWorld, dt| sink.borrow_mut().push(dt))
            .build()
            .unwrap();
        sim.run(&mut crate::NoopObserver).unwrap();
        assert_eq!(*seen.borrow(), vec![0.25, 0.25, 0.25]);
    }

    #[test]
    fn same_seed_replays_identically() {
        let play = || {
            let mut sim = sim(40.0, 20);
            let id = sim.start_pursuit(SUSPECT, npc_core::ActionPriority::RequiredByScript).unwrap();
            sim.dispatch(id, 100.0, 2).unwrap();
            sim.run(&mut crate::NoopObserver).unwrap();
            (
                sim.env.world.position(OFFICER),
                sim.env.world.position(PARTNER),
                sim.env.world.commands().to_vec(),
            )
        };
        assert_eq!(play(), play());
    }
}

// ── Agents and pursuits ───────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle_tests {
    use npc_core::ActionPriority;
    use npc_pursuit::{AmbientPatrol, Pursuit, PursuitError};

    use super::*;

    fn start_and_recruit(sim: &mut Sim<SandboxWorld>) -> ControllerId {
        let id = sim.start_pursuit(SUSPECT, ActionPriority::RequiredByScript).unwrap();
        assert!(sim.recruit(id, OFFICER).unwrap());
        id
    }

    #[test]
    fn agent_removed_from_world_is_despawned() {
        let mut sim = sim(50.0, 10);
        sim.env.world.remove_agent(PARTNER).unwrap();
        let summary = sim.step(&mut crate::NoopObserver).unwrap();
        assert_eq!(summary.despawned, 1);
        assert_eq!(summary.processed, 1);
        assert!(!sim.agents.contains(PARTNER));
    }

    #[test]
    fn despawned_officer_leaves_the_pursuit() {
        let mut sim = sim(50.0, 10);
        let id = start_and_recruit(&mut sim);
        sim.step(&mut crate::NoopObserver).unwrap();

        sim.env.world.remove_agent(OFFICER).unwrap();
        sim.step(&mut crate::NoopObserver).unwrap();

        let pursuit = sim.controllers.get::<Pursuit>(id).unwrap();
        assert_eq!(pursuit.officer_count(), 0);
        assert_eq!(pursuit.departed(), 1);
        // The suspect is still at large, so the pursuit stays open.
        assert_eq!(sim.pursuits(), vec![id]);
    }

    #[test]
    fn dead_suspect_closes_the_pursuit() {
        let mut sim = sim(50.0, 10);
        let id = start_and_recruit(&mut sim);
        let mut rec = Recorder::default();
        sim.step(&mut rec).unwrap();

        sim.env.world.set_alive(SUSPECT, false).unwrap();
        sim.run_ticks(2, &mut rec).unwrap();

        assert_eq!(rec.ended, vec![(id, SUSPECT)]);
        assert!(sim.pursuits().is_empty());
        assert!(!sim.env.resources.is_pursued(SUSPECT));
        assert_eq!(sim.agents.get(OFFICER).unwrap().owner(), None);
        assert_eq!(rec.summaries.iter().map(|s| s.ended).sum::<usize>(), 1);
        assert_eq!(rec.summaries.iter().map(|s| s.released).sum::<usize>(), 1);
    }

    #[test]
    fn arrest_closes_the_pursuit() {
        let mut sim = sim(1.0, 10);
        let id = start_and_recruit(&mut sim);
        let mut rec = Recorder::default();
        sim.run_ticks(3, &mut rec).unwrap();

        assert!(sim.env.world.suspect_status(SUSPECT).arrested);
        assert_eq!(rec.ended, vec![(id, SUSPECT)]);
        assert_eq!(sim.agents.get(OFFICER).unwrap().owner(), None);
    }

    #[test]
    fn dispatch_takes_the_nearest_officers_first() {
        let mut world = SandboxWorld::new();
        world.add_agent(SUSPECT, at(0.0)).unwrap();
        world.add_agent(AgentId(10), at(30.0)).unwrap();
        world.add_agent(AgentId(11), at(10.0)).unwrap();
        world.add_agent(AgentId(12), at(80.0)).unwrap();
        let mut sim = SimBuilder::new(test_config(10), world)
            .officers([AgentId(10), AgentId(11), AgentId(12)])
            .build()
            .unwrap();
        let id = sim.start_pursuit(SUSPECT, ActionPriority::RequiredByScript).unwrap();

        assert_eq!(sim.dispatch(id, 50.0, 1).unwrap(), vec![AgentId(11)]);
        assert_eq!(sim.dispatch(id, 50.0, 5).unwrap(), vec![AgentId(10)]);
        assert!(sim.dispatch(id, 50.0, 5).unwrap().is_empty());

        let pursuit = sim.controllers.get::<Pursuit>(id).unwrap();
        assert_eq!(pursuit.officers().collect::<Vec<_>>(), vec![AgentId(10), AgentId(11)]);
    }

    #[test]
    fn dispatch_to_unknown_pursuit_fails() {
        let mut sim = sim(50.0, 10);
        let err = sim.dispatch(ControllerId(42), 50.0, 1).unwrap_err();
        assert!(matches!(err, SimError::Pursuit(PursuitError::NotAPursuit(ControllerId(42)))));
    }

    #[test]
    fn end_pursuit_releases_everyone() {
        let mut sim = sim(50.0, 10);
        let id = start_and_recruit(&mut sim);
        assert!(sim.recruit(id, PARTNER).unwrap());
        sim.step(&mut crate::NoopObserver).unwrap();

        sim.end_pursuit(id).unwrap();
        assert!(sim.pursuits().is_empty());
        assert_eq!(sim.agents.get(OFFICER).unwrap().owner(), None);
        assert_eq!(sim.agents.get(PARTNER).unwrap().owner(), None);
    }

    #[test]
    fn patrol_modules_are_attached_on_spawn() {
        let mut sim = SimBuilder::new(test_config(10), street(50.0))
            .officers([OFFICER])
            .with_patrol()
            .build()
            .unwrap();
        sim.run_ticks(2, &mut crate::NoopObserver).unwrap();
        let intel = sim.agents.get(OFFICER).unwrap();
        assert_eq!(intel.module::<AmbientPatrol>().unwrap().started(), 1);
    }
}
