//! Simulation-wide publish/subscribe bus.
//!
//! # Design
//!
//! Every subscriber owns the receiving half of an unbounded
//! `crossbeam-channel`.  The bus keeps the sending halves and fans each
//! published event out to every subscriber whose [`Topic`] matches.
//!
//! Unsubscribing is dropping the [`Subscription`]: the bus notices through a
//! weak liveness token and prunes the entry on the next publish.  A task that subscribes in its
//! `initialize` hook and drops the subscription in its abort hook therefore
//! cannot leak a listener, whichever path retires it.

use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use tracing::trace;

use npc_core::{AgentId, Vec3};

/// Domain events exchanged between agents' controllers and tasks.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PursuitEvent {
    /// A pursuit started or the suspect broke away again.
    CriminalFleeing { suspect: AgentId, position: Vec3 },
    /// An officer started cuffing the suspect.
    PedBeingArrested { suspect: AgentId, officer: AgentId },
    /// The suspect is in custody.
    PedArrested { suspect: AgentId, officer: AgentId },
    /// The suspect gave up.
    PedSurrendered { suspect: AgentId },
    /// The last officer with eyes on the suspect lost them.
    VisualLost { suspect: AgentId, last_known: Vec3 },
    /// An officer on foot needs a car to keep up.
    VehicleRequested { officer: AgentId, suspect: AgentId, position: Vec3 },
}

impl PursuitEvent {
    /// The suspect this event is about.
    pub fn suspect(&self) -> AgentId {
        match *self {
            PursuitEvent::CriminalFleeing { suspect, .. }
            | PursuitEvent::PedBeingArrested { suspect, .. }
            | PursuitEvent::PedArrested { suspect, .. }
            | PursuitEvent::PedSurrendered { suspect }
            | PursuitEvent::VisualLost { suspect, .. }
            | PursuitEvent::VehicleRequested { suspect, .. } => suspect,
        }
    }
}

/// Which events a subscription receives.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Topic {
    All,
    /// Only events about this suspect.
    Suspect(AgentId),
}

impl Topic {
    #[inline]
    pub fn matches(self, event: &PursuitEvent) -> bool {
        match self {
            Topic::All => true,
            Topic::Suspect(s) => event.suspect() == s,
        }
    }
}

struct Subscriber {
    topic: Topic,
    tx:    Sender<PursuitEvent>,
    alive: Weak<()>,
}

impl Subscriber {
    #[inline]
    fn is_live(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// The bus.  One per simulation, owned by the scheduler environment.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    published:   u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `topic`.  Events published after this call are
    /// queued on the returned subscription until drained.
    pub fn subscribe(&mut self, topic: Topic) -> Subscription {
        let (tx, rx) = unbounded();
        let token = Arc::new(());
        self.subscribers.push(Subscriber { topic, tx, alive: Arc::downgrade(&token) });
        Subscription { rx, _token: token }
    }

    /// Deliver `event` to every matching live subscriber.
    pub fn publish(&mut self, event: PursuitEvent) {
        self.published += 1;
        trace!(?event, subscribers = self.subscribers.len(), "publish");
        self.subscribers.retain(|s| {
            if !s.is_live() {
                return false;
            }
            if s.topic.matches(&event) {
                return s.tx.send(event.clone()).is_ok();
            }
            true
        });
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|s| s.is_live()).count()
    }

    /// Total events published since construction.
    pub fn published(&self) -> u64 {
        self.published
    }
}

/// Receiving end of a bus subscription.  Drop it to unsubscribe.
pub struct Subscription {
    rx:     Receiver<PursuitEvent>,
    _token: Arc<()>,
}

impl Subscription {
    /// Take every queued event without blocking.
    pub fn drain(&self) -> Vec<PursuitEvent> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(ev) => out.push(ev),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    /// `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
