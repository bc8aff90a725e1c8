//! The pursuit decision: a pure function from a sensed snapshot to one
//! [`Action`].
//!
//! # Design
//!
//! [`decide`] walks [`RULES`] in order and returns the first rule that
//! fires, tagged with the rule's name.  Nothing here touches the world or the
//! scheduler; [`PursuitTask`](crate::PursuitTask) builds the
//! [`DecisionInput`], calls `decide`, and translates the result.  That keeps
//! the rule list testable with plain struct literals.
//!
//! ```text
//!  1 target_arrested                    → NoLongerNeeded
//!  2 crowd_thinning                     → NoLongerNeeded
//!  3 yield_to_higher_priority_arrest    → NoLongerNeeded
//!  4 visual_lost                        → LookForCriminal (+ search mode)
//!  5 lethal_force                       → Kill
//!  6 roadblock                          → WaitAtRoadblock
//!  7 helicopter                         → ChaseInHelicopter
//!  8 target_in_vehicle_agent_on_foot    → DragOut / ChaseOnFoot / GetIntoNewVehicle / RequestVehicle
//!  9 both_in_vehicles                   → LeaveVehicle / ChaseInVehicle
//! 10 agent_in_vehicle_target_on_foot    → LeaveVehicle / ChaseInVehicle
//! 11 both_on_foot                       → AskToDropWeapon / Negotiate / Bust / Tase (Bust, Tase in sight only)
//! 12 default                            → ChaseOnFoot
//! ```

use npc_core::{ActionPriority, AgentId, TravelMode, VehicleId};
use npc_world::SuspectStatus;

use crate::{Action, Decision, Hint, PursuitConfig, RoleCounts, SearchMode};

/// Everything one decision looks at, sensed once per decision tick.
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionInput {
    pub agent:        AgentId,
    pub agent_mode:   TravelMode,
    pub own_priority: ActionPriority,

    pub target_mode:  TravelMode,
    pub target:       SuspectStatus,
    /// Planar distance agent → target (or → last known position when unseen).
    pub distance:     f32,
    /// Speed of the target's vehicle, 0 on foot.
    pub target_speed: f32,

    /// Another pursued suspect is still at large.
    pub other_target_available: bool,
    pub damaged_by_target:      bool,
    /// Hostile entity near the agent (throttled scan).
    pub nearby_combat:          bool,

    /// This agent has the target in sight right now.
    pub sees_target:        bool,
    /// Out of sight for longer than the grace period.
    pub visual_lost:        bool,
    /// No other officer is still tracking (chasing and not searching).
    pub is_last_tracker:    bool,
    pub reached_last_known: bool,

    /// Assigned to a static roadblock.
    pub at_roadblock:      bool,
    /// A free, non-blacklisted vehicle nearby.
    pub vehicle_available: Option<VehicleId>,

    pub asked_to_drop_weapon: bool,

    pub counts:                RoleCounts,
    /// Other chasers within the crowd-thinning radius of the target.
    pub chasers_near_target:   usize,
    /// This agent already holds a tasing slot.
    pub is_tasing:             bool,
    /// Distance of the closest other officer currently tasing.
    pub closest_taser_distance: Option<f32>,
}

impl DecisionInput {
    /// Neutral snapshot: both on foot, target calm, nobody else around.
    pub fn new(agent: AgentId, distance: f32) -> Self {
        Self {
            agent,
            agent_mode:   TravelMode::OnFoot,
            own_priority: ActionPriority::RequiredByScript,

            target_mode:  TravelMode::OnFoot,
            target:       SuspectStatus::default(),
            distance,
            target_speed: 0.0,

            other_target_available: false,
            damaged_by_target:      false,
            nearby_combat:          false,

            sees_target:        true,
            visual_lost:        false,
            is_last_tracker:    false,
            reached_last_known: false,

            at_roadblock:      false,
            vehicle_available: None,

            asked_to_drop_weapon: false,

            counts:                 RoleCounts::default(),
            chasers_near_target:    0,
            is_tasing:              false,
            closest_taser_distance: None,
        }
    }

    /// Someone other than this agent is cuffing the target.
    fn cuffed_by_other(&self) -> Option<ActionPriority> {
        self.target
            .being_arrested
            .filter(|claim| claim.officer != self.agent)
            .map(|claim| claim.priority)
    }

    fn cuffed_by_self(&self) -> bool {
        self.target.being_arrested.is_some_and(|claim| claim.officer == self.agent)
    }
}

type Rule = fn(&DecisionInput, &PursuitConfig) -> Option<(Action, Hint)>;

/// The ordered rule list.  First match wins.
pub const RULES: &[(&str, Rule)] = &[
    ("target_arrested", target_arrested),
    ("crowd_thinning", crowd_thinning),
    ("yield_to_higher_priority_arrest", yield_to_higher_priority_arrest),
    ("visual_lost", visual_lost),
    ("lethal_force", lethal_force),
    ("roadblock", roadblock),
    ("helicopter", helicopter),
    ("target_in_vehicle_agent_on_foot", target_in_vehicle_agent_on_foot),
    ("both_in_vehicles", both_in_vehicles),
    ("agent_in_vehicle_target_on_foot", agent_in_vehicle_target_on_foot),
    ("both_on_foot", both_on_foot),
];

/// Evaluate [`RULES`] against `input`.
pub fn decide(input: &DecisionInput, config: &PursuitConfig) -> Decision {
    for &(name, rule) in RULES {
        if let Some((action, hint)) = rule(input, config) {
            return Decision { action, hint, rule: name };
        }
    }
    Decision::new(Action::ChaseOnFoot, "default")
}

#[inline]
fn plain(action: Action) -> Option<(Action, Hint)> {
    Some((action, Hint::default()))
}

// ── Rules ─────────────────────────────────────────────────────────────────────

fn target_arrested(i: &DecisionInput, _: &PursuitConfig) -> Option<(Action, Hint)> {
    if i.target.arrested { plain(Action::NoLongerNeeded) } else { None }
}

fn crowd_thinning(i: &DecisionInput, c: &PursuitConfig) -> Option<(Action, Hint)> {
    i.cuffed_by_other()?;
    if i.counts.chasing > c.crowd_thin_min_chasing && i.chasers_near_target >= c.crowd_thin_nearby {
        plain(Action::NoLongerNeeded)
    } else {
        None
    }
}

fn yield_to_higher_priority_arrest(i: &DecisionInput, _: &PursuitConfig) -> Option<(Action, Hint)> {
    let claim = i.cuffed_by_other()?;
    if claim > i.own_priority && i.other_target_available {
        plain(Action::NoLongerNeeded)
    } else {
        None
    }
}

fn visual_lost(i: &DecisionInput, c: &PursuitConfig) -> Option<(Action, Hint)> {
    if !i.visual_lost || (i.is_last_tracker && !i.reached_last_known) {
        return None;
    }
    let mode = search_mode(i, c);
    let vehicle = match (mode, i.agent_mode) {
        (SearchMode::InVehicle, TravelMode::OnFoot) => i.vehicle_available,
        _ => None,
    };
    Some((Action::LookForCriminal, Hint { search_mode: Some(mode), vehicle }))
}

/// Balance searchers between foot and vehicle.  A new searcher joins a mode
/// only while that mode, counting the newcomer, stays at or under its share
/// of the pursuit: `chasing / SEARCH_FOOT_RATIO` on foot,
/// `chasing / SEARCH_VEHICLE_RATIO` in vehicles.
fn search_mode(i: &DecisionInput, c: &PursuitConfig) -> SearchMode {
    let chasing = i.counts.chasing as f32;
    match i.agent_mode {
        TravelMode::Helicopter => SearchMode::Helicopter,
        TravelMode::Car => {
            let on_foot = (i.counts.searching_on_foot + 1) as f32;
            if on_foot * c.search_foot_ratio <= chasing { SearchMode::OnFoot } else { SearchMode::InVehicle }
        }
        TravelMode::OnFoot => {
            let in_vehicle = (i.counts.searching_in_vehicle + 1) as f32;
            if i.vehicle_available.is_some() && in_vehicle * c.search_vehicle_ratio <= chasing {
                SearchMode::InVehicle
            } else {
                SearchMode::OnFoot
            }
        }
    }
}

fn lethal_force(i: &DecisionInput, _: &PursuitConfig) -> Option<(Action, Hint)> {
    let t = &i.target;
    if t.suppresses_lethal_force() {
        return None;
    }
    if t.hostile || t.force_kill || i.damaged_by_target { plain(Action::Kill) } else { None }
}

fn roadblock(i: &DecisionInput, c: &PursuitConfig) -> Option<(Action, Hint)> {
    if i.at_roadblock && i.distance > c.roadblock_release_distance {
        plain(Action::WaitAtRoadblock)
    } else {
        None
    }
}

fn helicopter(i: &DecisionInput, _: &PursuitConfig) -> Option<(Action, Hint)> {
    if i.agent_mode == TravelMode::Helicopter { plain(Action::ChaseInHelicopter) } else { None }
}

fn target_in_vehicle_agent_on_foot(i: &DecisionInput, c: &PursuitConfig) -> Option<(Action, Hint)> {
    if i.agent_mode != TravelMode::OnFoot || !i.target_mode.in_vehicle() {
        return None;
    }
    if i.target_speed < c.drag_out_max_speed && i.distance < c.drag_out_distance {
        return plain(Action::DragOutOfVehicle);
    }
    if i.target_speed < c.foot_chase_max_target_speed && i.distance < c.foot_chase_vehicle_distance {
        return plain(Action::ChaseOnFoot);
    }
    match i.vehicle_available {
        Some(v) => Some((Action::GetIntoNewVehicle, Hint { search_mode: None, vehicle: Some(v) })),
        None => plain(Action::RequestVehicle),
    }
}

fn both_in_vehicles(i: &DecisionInput, c: &PursuitConfig) -> Option<(Action, Hint)> {
    if !i.agent_mode.in_vehicle() || !i.target_mode.in_vehicle() {
        return None;
    }
    if i.target_speed < c.leave_vehicle_max_target_speed && i.distance < c.leave_vehicle_distance {
        plain(Action::LeaveVehicle)
    } else {
        plain(Action::ChaseInVehicle)
    }
}

fn agent_in_vehicle_target_on_foot(i: &DecisionInput, c: &PursuitConfig) -> Option<(Action, Hint)> {
    if !i.agent_mode.in_vehicle() || i.target_mode.in_vehicle() {
        return None;
    }
    if i.distance < c.leave_vehicle_foot_target_distance {
        plain(Action::LeaveVehicle)
    } else {
        plain(Action::ChaseInVehicle)
    }
}

fn both_on_foot(i: &DecisionInput, c: &PursuitConfig) -> Option<(Action, Hint)> {
    let t = &i.target;
    if i.cuffed_by_self() {
        return plain(Action::Bust);
    }
    if t.armed && i.distance < c.shooting_range {
        return if i.asked_to_drop_weapon {
            plain(Action::NegotiateToDropWeapon)
        } else {
            plain(Action::AskToDropWeapon)
        };
    }
    if !i.sees_target {
        return None;
    }
    if t.is_compliant() && i.distance < c.bust_range && !i.nearby_combat && t.being_arrested.is_none() {
        return plain(Action::Bust);
    }
    if i.distance < c.taser_range && !t.is_compliant() && t.being_arrested.is_none() {
        // Slots held by others; over the cap only the closest contender tases.
        let others = i.counts.tasing.saturating_sub(usize::from(i.is_tasing));
        if others < c.max_tasing_officers {
            return plain(Action::Tase);
        }
        return if i.closest_taser_distance.is_none_or(|d| i.distance < d) {
            plain(Action::Tase)
        } else {
            plain(Action::ChaseOnFoot)
        };
    }
    None
}
