//! Pursuit tuning.
//!
//! Every threshold the decision rules and action tasks use is a named
//! constant here and a field of [`PursuitConfig`] defaulting to it.  Distances
//! are metres, speeds metres per second, intervals simulated milliseconds.
//!
//! Several values (the crowd-thinning rule, the search balancing ratios) are
//! empirically tuned; keep them as they are unless a scenario says otherwise.

use crate::{PursuitError, PursuitResult};

// ── Throttles ─────────────────────────────────────────────────────────────────

/// Interval between two decisions of one officer.
pub const DECISION_INTERVAL_MS: u64 = 250;
/// Interval between two nearby-combat scans of one officer.
pub const COMBAT_SCAN_INTERVAL_MS: u64 = 500;
pub const COMBAT_SCAN_RADIUS: f32 = 30.0;

// ── Perception ────────────────────────────────────────────────────────────────

pub const VISION_FOV_DEG: f32 = 120.0;
pub const VISION_RANGE: f32 = 80.0;
/// How long the target may be out of sight before visual counts as lost.
pub const VISUAL_LOST_GRACE_MS: u64 = 3_000;
/// The last tracker gives up once it is this close to the last known position.
pub const LAST_KNOWN_REACHED_RADIUS: f32 = 5.0;

// ── Crowd thinning ────────────────────────────────────────────────────────────

/// Thinning only starts above this many officers in the pursuit.
pub const CROWD_THIN_MIN_CHASING: usize = 3;
pub const CROWD_THIN_RADIUS: f32 = 10.0;
/// Chasers already within `CROWD_THIN_RADIUS` of a cuffed target.
pub const CROWD_THIN_NEARBY: usize = 3;

// ── Search balancing ──────────────────────────────────────────────────────────

/// An officer in a car leaves it to search on foot while
/// `(searching_on_foot + 1) * SEARCH_FOOT_RATIO <= chasing`.
pub const SEARCH_FOOT_RATIO: f32 = 1.75;
/// An officer on foot takes a free vehicle to search while
/// `(searching_in_vehicle + 1) * SEARCH_VEHICLE_RATIO <= chasing`.
pub const SEARCH_VEHICLE_RATIO: f32 = 1.25;

// ── Vehicles ──────────────────────────────────────────────────────────────────

pub const ROADBLOCK_RELEASE_DISTANCE: f32 = 40.0;
pub const DRAG_OUT_MAX_SPEED: f32 = 2.0;
pub const DRAG_OUT_DISTANCE: f32 = 8.0;
/// A target vehicle slower than this can still be chased on foot.
pub const FOOT_CHASE_MAX_TARGET_SPEED: f32 = 5.0;
pub const FOOT_CHASE_VEHICLE_DISTANCE: f32 = 25.0;
pub const FREE_VEHICLE_RADIUS: f32 = 40.0;
/// Both in vehicles: bail out when the target is this slow ...
pub const LEAVE_VEHICLE_MAX_TARGET_SPEED: f32 = 3.0;
/// ... and this close.
pub const LEAVE_VEHICLE_DISTANCE: f32 = 15.0;
/// In a vehicle chasing a target on foot: bail out within this distance.
pub const LEAVE_VEHICLE_FOOT_TARGET_DISTANCE: f32 = 20.0;

// ── On foot ───────────────────────────────────────────────────────────────────

pub const SHOOTING_RANGE: f32 = 50.0;
pub const BUST_RANGE: f32 = 15.0;
pub const CUFF_CONTACT_DISTANCE: f32 = 1.5;
pub const TASER_RANGE: f32 = 10.0;
pub const MAX_TASING_OFFICERS: usize = 1;
pub const SURRENDER_ASK_DISTANCE: f32 = 12.0;

// ── Task deadlines and cooldowns ──────────────────────────────────────────────

pub const ARREST_TIMEOUT_MS: u64 = 15_000;
pub const TASE_TIMEOUT_MS: u64 = 6_000;
pub const DRAG_OUT_TIMEOUT_MS: u64 = 8_000;
pub const ENTER_VEHICLE_TIMEOUT_MS: u64 = 10_000;
pub const SEARCH_PLACE_TIMEOUT_MS: u64 = 30_000;
/// Minimum gap between two weapon-negotiation lines.
pub const NEGOTIATE_SPEECH_INTERVAL_MS: u64 = 4_000;
/// A vehicle an officer failed to enter is off-limits for this long.
pub const VEHICLE_BLACKLIST_MS: u64 = 30_000;
pub const REQUEST_VEHICLE_COOLDOWN_MS: u64 = 20_000;
/// A released officer is not recruited by the same pursuit again before this.
pub const RELEASE_COOLDOWN_MS: u64 = 10_000;

// ── Search places ─────────────────────────────────────────────────────────────

pub const SEARCH_INITIAL_RADIUS: f32 = 15.0;
pub const SEARCH_RADIUS_GROWTH: f32 = 1.5;
pub const SEARCH_AREA_RADIUS: f32 = 120.0;
pub const SEARCH_MIN_SEPARATION: f32 = 10.0;
pub const SEARCH_MAX_ATTEMPTS: u32 = 50;
pub const SEARCH_ARRIVAL_RADIUS: f32 = 3.0;

/// Parameters of the search-place allocator.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SearchPlaceConfig {
    /// First candidate ring around the last known position.
    pub initial_radius: f32,
    /// Each rejected candidate grows the ring by this factor; a ring that
    /// would leave the search area restarts at `initial_radius`.
    pub radius_growth:  f32,
    pub area_radius:    f32,
    pub min_separation: f32,
    pub max_attempts:   u32,
}

impl Default for SearchPlaceConfig {
    fn default() -> Self {
        Self {
            initial_radius: SEARCH_INITIAL_RADIUS,
            radius_growth:  SEARCH_RADIUS_GROWTH,
            area_radius:    SEARCH_AREA_RADIUS,
            min_separation: SEARCH_MIN_SEPARATION,
            max_attempts:   SEARCH_MAX_ATTEMPTS,
        }
    }
}

/// All pursuit tuning in one value.  `Default` is the named constants above.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PursuitConfig {
    pub decision_interval_ms:    u64,
    pub combat_scan_interval_ms: u64,
    pub combat_scan_radius:      f32,

    pub vision_fov_deg:            f32,
    pub vision_range:              f32,
    pub visual_lost_grace_ms:      u64,
    pub last_known_reached_radius: f32,

    pub crowd_thin_min_chasing: usize,
    pub crowd_thin_radius:      f32,
    pub crowd_thin_nearby:      usize,

    pub search_foot_ratio:    f32,
    pub search_vehicle_ratio: f32,

    pub roadblock_release_distance:         f32,
    pub drag_out_max_speed:                 f32,
    pub drag_out_distance:                  f32,
    pub foot_chase_max_target_speed:        f32,
    pub foot_chase_vehicle_distance:        f32,
    pub free_vehicle_radius:                f32,
    pub leave_vehicle_max_target_speed:     f32,
    pub leave_vehicle_distance:             f32,
    pub leave_vehicle_foot_target_distance: f32,

    pub shooting_range:         f32,
    pub bust_range:             f32,
    pub cuff_contact_distance:  f32,
    pub taser_range:            f32,
    pub max_tasing_officers:    usize,
    pub surrender_ask_distance: f32,

    pub arrest_timeout_ms:            u64,
    pub tase_timeout_ms:              u64,
    pub drag_out_timeout_ms:          u64,
    pub enter_vehicle_timeout_ms:     u64,
    pub search_place_timeout_ms:      u64,
    pub negotiate_speech_interval_ms: u64,
    pub vehicle_blacklist_ms:         u64,
    pub request_vehicle_cooldown_ms:  u64,
    pub release_cooldown_ms:          u64,

    pub search_arrival_radius: f32,
    pub search:                SearchPlaceConfig,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            decision_interval_ms:    DECISION_INTERVAL_MS,
            combat_scan_interval_ms: COMBAT_SCAN_INTERVAL_MS,
            combat_scan_radius:      COMBAT_SCAN_RADIUS,

            vision_fov_deg:            VISION_FOV_DEG,
            vision_range:              VISION_RANGE,
            visual_lost_grace_ms:      VISUAL_LOST_GRACE_MS,
            last_known_reached_radius: LAST_KNOWN_REACHED_RADIUS,

            crowd_thin_min_chasing: CROWD_THIN_MIN_CHASING,
            crowd_thin_radius:      CROWD_THIN_RADIUS,
            crowd_thin_nearby:      CROWD_THIN_NEARBY,

            search_foot_ratio:    SEARCH_FOOT_RATIO,
            search_vehicle_ratio: SEARCH_VEHICLE_RATIO,

            roadblock_release_distance:         ROADBLOCK_RELEASE_DISTANCE,
            drag_out_max_speed:                 DRAG_OUT_MAX_SPEED,
            drag_out_distance:                  DRAG_OUT_DISTANCE,
            foot_chase_max_target_speed:        FOOT_CHASE_MAX_TARGET_SPEED,
            foot_chase_vehicle_distance:        FOOT_CHASE_VEHICLE_DISTANCE,
            free_vehicle_radius:                FREE_VEHICLE_RADIUS,
            leave_vehicle_max_target_speed:     LEAVE_VEHICLE_MAX_TARGET_SPEED,
            leave_vehicle_distance:             LEAVE_VEHICLE_DISTANCE,
            leave_vehicle_foot_target_distance: LEAVE_VEHICLE_FOOT_TARGET_DISTANCE,

            shooting_range:         SHOOTING_RANGE,
            bust_range:             BUST_RANGE,
            cuff_contact_distance:  CUFF_CONTACT_DISTANCE,
            taser_range:            TASER_RANGE,
            max_tasing_officers:    MAX_TASING_OFFICERS,
            surrender_ask_distance: SURRENDER_ASK_DISTANCE,

            arrest_timeout_ms:            ARREST_TIMEOUT_MS,
            tase_timeout_ms:              TASE_TIMEOUT_MS,
            drag_out_timeout_ms:          DRAG_OUT_TIMEOUT_MS,
            enter_vehicle_timeout_ms:     ENTER_VEHICLE_TIMEOUT_MS,
            search_place_timeout_ms:      SEARCH_PLACE_TIMEOUT_MS,
            negotiate_speech_interval_ms: NEGOTIATE_SPEECH_INTERVAL_MS,
            vehicle_blacklist_ms:         VEHICLE_BLACKLIST_MS,
            request_vehicle_cooldown_ms:  REQUEST_VEHICLE_COOLDOWN_MS,
            release_cooldown_ms:          RELEASE_COOLDOWN_MS,

            search_arrival_radius: SEARCH_ARRIVAL_RADIUS,
            search:                SearchPlaceConfig::default(),
        }
    }
}

impl PursuitConfig {
    /// Reject values the rules cannot work with.
    pub fn validate(&self) -> PursuitResult<()> {
        let s = &self.search;
        if s.max_attempts == 0 {
            return Err(PursuitError::Config("search.max_attempts must be > 0".into()));
        }
        if !(s.initial_radius > 0.0 && s.initial_radius <= s.area_radius) {
            return Err(PursuitError::Config(format!(
                "search.initial_radius {} must be in (0, area_radius {}]",
                s.initial_radius, s.area_radius
            )));
        }
        if s.radius_growth < 1.0 {
            return Err(PursuitError::Config("search.radius_growth must be >= 1".into()));
        }
        if self.search_foot_ratio <= 0.0 || self.search_vehicle_ratio <= 0.0 {
            return Err(PursuitError::Config("search ratios must be positive".into()));
        }
        if self.cuff_contact_distance > self.bust_range {
            return Err(PursuitError::Config(format!(
                "cuff_contact_distance {} exceeds bust_range {}",
                self.cuff_contact_distance, self.bust_range
            )));
        }
        if self.decision_interval_ms == 0 {
            return Err(PursuitError::Config("decision_interval_ms must be > 0".into()));
        }
        Ok(())
    }
}
