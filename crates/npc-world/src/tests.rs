//! Unit tests for npc-world.

#[cfg(test)]
mod suspect {
    use npc_core::{ActionPriority, AgentId};

    use crate::{ArrestClaim, SuspectStatus};

    #[test]
    fn default_is_calm() {
        let s = SuspectStatus::default();
        assert!(!s.suppresses_lethal_force());
        assert!(!s.is_compliant());
    }

    #[test]
    fn surrender_and_arrest_suppress_lethal_force() {
        let surrendering = SuspectStatus { hostile: true, surrendering: true, ..Default::default() };
        assert!(surrendering.suppresses_lethal_force());

        let undecided = SuspectStatus { force_kill: true, undecided: true, ..Default::default() };
        assert!(undecided.suppresses_lethal_force());

        let cuffed = SuspectStatus {
            hostile: true,
            being_arrested: Some(ArrestClaim {
                officer:  AgentId(1),
                priority: ActionPriority::RequiredByScript,
            }),
            ..Default::default()
        };
        assert!(cuffed.suppresses_lethal_force());
    }

    #[test]
    fn hostile_surrender_is_not_compliant() {
        let s = SuspectStatus { surrendering: true, hostile: true, ..Default::default() };
        assert!(!s.is_compliant());
    }
}

#[cfg(test)]
mod events {
    use npc_core::{AgentId, Vec3};

    use crate::{EventBus, PursuitEvent, Topic};

    fn fleeing(suspect: u32) -> PursuitEvent {
        PursuitEvent::CriminalFleeing { suspect: AgentId(suspect), position: Vec3::ZERO }
    }

    #[test]
    fn topic_filters_by_suspect() {
        let mut bus = EventBus::new();
        let all = bus.subscribe(Topic::All);
        let only_7 = bus.subscribe(Topic::Suspect(AgentId(7)));

        bus.publish(fleeing(7));
        bus.publish(fleeing(8));

        assert_eq!(all.drain().len(), 2);
        assert_eq!(only_7.drain(), vec![fleeing(7)]);
        assert_eq!(bus.published(), 2);
    }

    #[test]
    fn events_before_subscribe_are_not_delivered() {
        let mut bus = EventBus::new();
        bus.publish(fleeing(1));
        let sub = bus.subscribe(Topic::All);
        assert!(sub.is_empty());
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let mut bus = EventBus::new();
        let a = bus.subscribe(Topic::All);
        let b = bus.subscribe(Topic::Suspect(AgentId(3)));
        assert_eq!(bus.subscriber_count(), 2);

        drop(b);
        assert_eq!(bus.subscriber_count(), 1);

        // Publishing prunes the dead entry without disturbing the live one.
        bus.publish(fleeing(3));
        assert_eq!(a.drain().len(), 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn suspect_accessor_covers_all_variants() {
        let s = AgentId(4);
        let o = AgentId(9);
        let events = [
            PursuitEvent::PedBeingArrested { suspect: s, officer: o },
            PursuitEvent::PedArrested { suspect: s, officer: o },
            PursuitEvent::PedSurrendered { suspect: s },
            PursuitEvent::VisualLost { suspect: s, last_known: Vec3::ONE },
            PursuitEvent::VehicleRequested { officer: o, suspect: s, position: Vec3::ONE },
        ];
        assert!(events.iter().all(|e| e.suspect() == s));
    }
}

#[cfg(test)]
mod sandbox {
    use npc_core::{AgentId, TravelMode, Vec3, VehicleId};

    use crate::native;
    use crate::{
        EntityQuery, MoveStyle, NativeTasks, Navigation, Perception, SandboxWorld, Seat,
        WorldCommand, WorldError,
    };

    const COP: AgentId = AgentId(1);
    const CROOK: AgentId = AgentId(2);
    const CAR: VehicleId = VehicleId(10);

    fn world() -> SandboxWorld {
        let mut w = SandboxWorld::new();
        w.add_agent(COP, Vec3::ZERO).unwrap();
        w.add_agent(CROOK, Vec3::new(20.0, 0.0, 0.0)).unwrap();
        w.add_vehicle(CAR, TravelMode::Car, Vec3::new(0.0, 5.0, 0.0)).unwrap();
        w
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut w = world();
        assert!(matches!(w.add_agent(COP, Vec3::ZERO), Err(WorldError::DuplicateAgent(_))));
        assert!(matches!(
            w.add_vehicle(CAR, TravelMode::Car, Vec3::ZERO),
            Err(WorldError::DuplicateVehicle(_))
        ));
    }

    #[test]
    fn setters_on_unknown_entities_fail() {
        let mut w = world();
        assert!(matches!(w.set_alive(AgentId(99), false), Err(WorldError::UnknownAgent(_))));
        assert!(matches!(w.seat(COP, VehicleId(99)), Err(WorldError::UnknownVehicle(_))));
    }

    #[test]
    fn despawned_agent_does_not_exist() {
        let mut w = world();
        w.remove_agent(CROOK).unwrap();
        assert!(!w.agent_exists(CROOK));
        assert_eq!(w.position(CROOK), None);
        assert!(!w.is_alive(CROOK));
    }

    #[test]
    fn enter_and_leave_vehicle_take_effect_immediately() {
        let mut w = world();
        w.enter_vehicle(COP, CAR, Seat::Driver);
        assert_eq!(w.vehicle_of(COP), Some(CAR));
        assert_eq!(w.travel_mode(COP), TravelMode::Car);
        assert_eq!(w.position(COP), w.vehicle_position(CAR));
        assert!(w.find_free_vehicles(Vec3::ZERO, 50.0).is_empty());

        w.leave_vehicle(COP);
        assert_eq!(w.vehicle_of(COP), None);
        assert_eq!(w.travel_mode(COP), TravelMode::OnFoot);
        assert_eq!(w.find_free_vehicles(Vec3::ZERO, 50.0), vec![CAR]);
    }

    #[test]
    fn free_vehicles_sorted_nearest_first() {
        let mut w = world();
        w.add_vehicle(VehicleId(11), TravelMode::Car, Vec3::new(0.0, 2.0, 0.0)).unwrap();
        w.add_vehicle(VehicleId(12), TravelMode::Car, Vec3::new(0.0, 200.0, 0.0)).unwrap();
        assert_eq!(w.find_free_vehicles(Vec3::ZERO, 50.0), vec![VehicleId(11), CAR]);
    }

    #[test]
    fn movement_orders_set_native_task_until_arrival() {
        let mut w = world();
        w.go_to(COP, Vec3::new(4.0, 0.0, 0.0), MoveStyle::Run);
        assert!(w.is_native_task_running(COP, native::GO_TO));

        w.step(0.5);
        assert!((w.position(COP).unwrap().x - 2.0).abs() < 1e-4);
        assert!(w.is_native_task_running(COP, native::GO_TO));

        w.step(0.5);
        assert_eq!(w.position(COP), Some(Vec3::new(4.0, 0.0, 0.0)));
        assert!(!w.is_native_task_running(COP, native::GO_TO));
    }

    #[test]
    fn stuck_agents_do_not_move() {
        let mut w = world();
        w.set_stuck(COP, true).unwrap();
        w.follow(COP, CROOK, MoveStyle::Sprint);
        w.step(1.0);
        assert_eq!(w.position(COP), Some(Vec3::ZERO));
        assert!(w.is_stuck(COP));
    }

    #[test]
    fn can_see_respects_range_and_blocks() {
        let mut w = world();
        assert!(w.can_see(COP, CROOK, 90.0, 30.0));
        assert!(!w.can_see(COP, CROOK, 90.0, 10.0));

        w.block_line_of_sight(COP, CROOK);
        assert!(!w.can_see(COP, CROOK, 90.0, 30.0));
        // One direction only.
        assert!(w.can_see(CROOK, COP, 90.0, 30.0));

        w.restore_line_of_sight(COP, CROOK);
        assert!(w.can_see(COP, CROOK, 90.0, 30.0));
    }

    #[test]
    fn hostile_within_radius() {
        let mut w = world();
        assert!(!w.hostile_within(COP, 50.0));
        w.status_mut(CROOK).unwrap().hostile = true;
        assert!(w.hostile_within(COP, 50.0));
        assert!(!w.hostile_within(COP, 5.0));
    }

    #[test]
    fn damage_is_directional() {
        let mut w = world();
        w.record_damage(COP, CROOK);
        assert!(w.damaged_by(COP, CROOK));
        assert!(!w.damaged_by(CROOK, COP));
        w.clear_damage();
        assert!(!w.damaged_by(COP, CROOK));
    }

    #[test]
    fn cuff_claims_then_arrests_on_step() {
        let mut w = world();
        w.cuff(COP, CROOK);
        let claim = w.suspect_status(CROOK).being_arrested.unwrap();
        assert_eq!(claim.officer, COP);
        assert!(!w.suspect_status(CROOK).arrested);

        w.step(0.05);
        assert!(w.suspect_status(CROOK).arrested);
        assert_eq!(w.native_task(COP), None);
    }

    #[test]
    fn taser_makes_suspect_surrender() {
        let mut w = world();
        w.status_mut(CROOK).unwrap().undecided = true;
        w.fire_taser(COP, CROOK);
        let s = w.suspect_status(CROOK);
        assert!(s.surrendering);
        assert!(!s.undecided);
    }

    #[test]
    fn blocked_area_is_not_navigable() {
        let mut w = world();
        w.block_area(Vec3::new(100.0, 0.0, 0.0), 10.0);
        assert_eq!(w.nearest_navigable(Vec3::new(105.0, 0.0, 0.0), TravelMode::OnFoot), None);
        let p = Vec3::new(50.0, 0.0, 0.0);
        assert_eq!(w.nearest_navigable(p, TravelMode::Car), Some(p));
    }

    #[test]
    fn command_log_records_orders_in_order() {
        let mut w = world();
        w.wander(COP);
        w.hold_position(CROOK);
        w.fight(COP, CROOK);

        let cop_cmds: Vec<_> = w.commands_for(COP).cloned().collect();
        assert_eq!(cop_cmds, vec![
            WorldCommand::Wander { agent: COP },
            WorldCommand::Fight { agent: COP, target: CROOK },
        ]);
        assert_eq!(w.take_commands().len(), 3);
        assert!(w.commands().is_empty());
    }

    #[test]
    fn removing_vehicle_ejects_occupants() {
        let mut w = world();
        w.seat(COP, CAR).unwrap();
        w.remove_vehicle(CAR).unwrap();
        assert_eq!(w.vehicle_of(COP), None);
        assert!(!w.vehicle_exists(CAR));
    }
}
