//! How an agent is currently getting around.

/// The means by which an agent is currently travelling.
///
/// Derived by the host from the vehicle the agent sits in (if any); the
/// decision engine branches on it constantly.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TravelMode {
    /// Not in any vehicle.
    #[default]
    OnFoot,
    /// Any road vehicle.
    Car,
    /// Any helicopter.
    Helicopter,
}

impl TravelMode {
    /// `true` for any mode that puts the agent in a vehicle.
    #[inline]
    pub fn in_vehicle(self) -> bool {
        !matches!(self, TravelMode::OnFoot)
    }

    /// Human-readable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::OnFoot     => "on_foot",
            TravelMode::Car        => "car",
            TravelMode::Helicopter => "helicopter",
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
