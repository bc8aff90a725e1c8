//! Search places: where officers look once the suspect is out of sight.
//!
//! # Allocation
//!
//! ```text
//! allocate(mode, center)
//!   ├─ reuse: first Unassigned place of `mode` within the search area
//!   └─ generate, at most max_attempts times:
//!        candidate = center + radius · (cos θ, sin θ)      θ from the agent's RNG
//!        radius    = radius · growth  (back to initial once past the area)
//!        reject if the host cannot snap it to navigable ground
//!        reject if outside the search area
//!        reject if within min_separation of any known place (R-tree query)
//!   → None when every attempt was rejected
//! ```
//!
//! An allocated place is held through a [`SearchPlaceLease`].  Completing the
//! lease marks the place searched; dropping it unfinished hands the place
//! back to the pool for the next officer.

use std::sync::Arc;

use parking_lot::Mutex;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use tracing::{debug, trace};

use npc_core::geo::{planar_distance, point_on_circle, to_array};
use npc_core::{AgentRng, TravelMode, Vec3};

use crate::{SearchMode, SearchPlaceConfig};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchState {
    Unassigned,
    Assigned,
    Searched,
}

#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchPlace {
    pub position: Vec3,
    pub mode:     SearchMode,
    pub state:    SearchState,
}

type PlaceEntry = GeomWithData<[f32; 3], usize>;

#[derive(Default)]
struct PoolInner {
    places: Vec<SearchPlace>,
    index:  RTree<PlaceEntry>,
}

impl PoolInner {
    fn assign(&mut self, i: usize) -> Vec3 {
        self.places[i].state = SearchState::Assigned;
        self.places[i].position
    }

    fn too_close(&self, p: Vec3, min_separation: f32) -> bool {
        self.index
            .locate_within_distance(to_array(p), min_separation * min_separation)
            .next()
            .is_some()
    }

    fn insert(&mut self, position: Vec3, mode: SearchMode) -> usize {
        let i = self.places.len();
        self.places.push(SearchPlace { position, mode, state: SearchState::Assigned });
        self.index.insert(GeomWithData::new(to_array(position), i));
        i
    }
}

/// The search places generated for one target.  Cloning shares the pool.
#[derive(Clone, Default)]
pub struct SearchPlacePool {
    inner: Arc<Mutex<PoolInner>>,
}

impl SearchPlacePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a place to search around `center`, or `None` when every
    /// attempt was rejected.  `navigable` snaps a candidate to ground the
    /// given travel mode can reach.
    pub fn allocate<F>(
        &self,
        mode:          SearchMode,
        center:        Vec3,
        config:        &SearchPlaceConfig,
        rng:           &mut AgentRng,
        mut navigable: F,
    ) -> Option<SearchPlaceLease>
    where
        F: FnMut(Vec3, TravelMode) -> Option<Vec3>,
    {
        let mut inner = self.inner.lock();

        let reusable = inner.places.iter().position(|p| {
            p.mode == mode
                && p.state == SearchState::Unassigned
                && planar_distance(p.position, center) <= config.area_radius
        });
        if let Some(i) = reusable {
            let position = inner.assign(i);
            trace!(place = i, ?mode, "search place reused");
            return Some(self.lease(i, position));
        }

        let mut radius = config.initial_radius;
        for attempt in 0..config.max_attempts {
            let candidate = point_on_circle(center, radius, rng.gen_angle());
            radius *= config.radius_growth;
            if radius > config.area_radius {
                radius = config.initial_radius;
            }

            let Some(snapped) = navigable(candidate, mode.travel_mode()) else { continue };
            if planar_distance(snapped, center) > config.area_radius {
                continue;
            }
            if inner.too_close(snapped, config.min_separation) {
                continue;
            }
            let i = inner.insert(snapped, mode);
            trace!(place = i, attempt, ?mode, "search place generated");
            return Some(self.lease(i, snapped));
        }

        debug!(?mode, attempts = config.max_attempts, "no search place found");
        None
    }

    fn lease(&self, index: usize, position: Vec3) -> SearchPlaceLease {
        SearchPlaceLease { pool: Arc::clone(&self.inner), index, position, completed: false }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().places.is_empty()
    }

    pub fn count(&self, state: SearchState) -> usize {
        self.inner.lock().places.iter().filter(|p| p.state == state).count()
    }

    /// Copy of every place, in creation order.
    pub fn places(&self) -> Vec<SearchPlace> {
        self.inner.lock().places.clone()
    }
}

/// Exclusive claim on one search place.
#[must_use = "dropping a SearchPlaceLease immediately returns the place"]
pub struct SearchPlaceLease {
    pool:      Arc<Mutex<PoolInner>>,
    index:     usize,
    position:  Vec3,
    completed: bool,
}

impl SearchPlaceLease {
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Mark the place searched.  It is never handed out again.
    pub fn complete(mut self) {
        self.pool.lock().places[self.index].state = SearchState::Searched;
        self.completed = true;
    }
}

impl Drop for SearchPlaceLease {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let mut inner = self.pool.lock();
        if let Some(place) = inner.places.get_mut(self.index) {
            if place.state == SearchState::Assigned {
                place.state = SearchState::Unassigned;
            }
        }
    }
}
