//! The closed set of things an officer can be told to do.

use std::fmt;

use npc_core::{TravelMode, VehicleId};

/// One decision's outcome.  Exactly one per officer per decision tick.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    AskToDropWeapon,
    Bust,
    Tase,
    ChaseOnFoot,
    ChaseInVehicle,
    ChaseInHelicopter,
    DragOutOfVehicle,
    GetIntoNewVehicle,
    Kill,
    LeaveVehicle,
    LookForCriminal,
    NegotiateToDropWeapon,
    WaitAtRoadblock,
    RequestVehicle,
    NoLongerNeeded,
    /// Nothing decided yet.
    #[default]
    Unknown,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::AskToDropWeapon       => "ask_to_drop_weapon",
            Action::Bust                  => "bust",
            Action::Tase                  => "tase",
            Action::ChaseOnFoot           => "chase_on_foot",
            Action::ChaseInVehicle        => "chase_in_vehicle",
            Action::ChaseInHelicopter     => "chase_in_helicopter",
            Action::DragOutOfVehicle      => "drag_out_of_vehicle",
            Action::GetIntoNewVehicle     => "get_into_new_vehicle",
            Action::Kill                  => "kill",
            Action::LeaveVehicle          => "leave_vehicle",
            Action::LookForCriminal       => "look_for_criminal",
            Action::NegotiateToDropWeapon => "negotiate_to_drop_weapon",
            Action::WaitAtRoadblock       => "wait_at_roadblock",
            Action::RequestVehicle        => "request_vehicle",
            Action::NoLongerNeeded        => "no_longer_needed",
            Action::Unknown               => "unknown",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a searching officer gets around.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchMode {
    OnFoot,
    InVehicle,
    Helicopter,
}

impl SearchMode {
    /// Navigation mode used to snap search places to reachable ground.
    pub fn travel_mode(self) -> TravelMode {
        match self {
            SearchMode::OnFoot     => TravelMode::OnFoot,
            SearchMode::InVehicle  => TravelMode::Car,
            SearchMode::Helicopter => TravelMode::Helicopter,
        }
    }
}

/// Extra parameters some actions need.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hint {
    pub search_mode: Option<SearchMode>,
    /// Vehicle to take (`GetIntoNewVehicle`, in-vehicle search from foot).
    pub vehicle:     Option<VehicleId>,
}

/// Output of [`decide`](crate::decide).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Decision {
    pub action: Action,
    pub hint:   Hint,
    /// Name of the rule that fired, for logs.
    pub rule:   &'static str,
}

impl Decision {
    pub fn new(action: Action, rule: &'static str) -> Self {
        Self { action, hint: Hint::default(), rule }
    }

    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.hint.search_mode = Some(mode);
        self
    }

    pub fn with_vehicle(mut self, vehicle: Option<VehicleId>) -> Self {
        self.hint.vehicle = vehicle;
        self
    }
}
