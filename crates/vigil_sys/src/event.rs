//! The cross-technique event bus.
//!
//! Engines never block on the bus: [`Mailbox::recv`] returns whatever is
//! available and the engine folds it into its transition system with
//! [`update_trans_sys`] before the next check. Publishing goes the other
//! way: verdicts and learned invariants are sent to the framework.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use vigil_term::TermId;

use crate::property::PropertyStatus;
use crate::trans::TransSys;

/// One event crossing the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// A system-level invariant learned by some technique.
    Invariant(TermId),
    /// A property status discovered by some technique.
    StatusUpdate {
        /// Property name.
        prop: String,
        /// The new status.
        status: PropertyStatus,
    },
}

/// What a batch of events changed, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDigest {
    /// Invariant terms received.
    pub invariants: Vec<TermId>,
    /// Properties that freshly became `Invariant`.
    pub valids: Vec<String>,
    /// Properties that freshly became `Falsified`.
    pub falsifieds: Vec<String>,
}

/// Folds received events into the system and digests them.
///
/// Status updates pass through the system's monotonic lattice filter, so a
/// stale or duplicate event never shows up in the digest.
pub fn update_trans_sys(sys: &mut TransSys, events: Vec<BusEvent>) -> EventDigest {
    let mut digest = EventDigest::default();
    for event in events {
        match event {
            BusEvent::Invariant(term) => digest.invariants.push(term),
            BusEvent::StatusUpdate { prop, status } => {
                let decided = match &status {
                    PropertyStatus::Invariant => Some(true),
                    PropertyStatus::Falsified(_) => Some(false),
                    _ => None,
                };
                if sys.set_prop_status(&prop, status) {
                    match decided {
                        Some(true) => digest.valids.push(prop),
                        Some(false) => digest.falsifieds.push(prop),
                        None => {}
                    }
                }
            }
        }
    }
    digest
}

/// An engine's endpoint on the bus.
pub trait Mailbox {
    /// Everything available right now; never blocks.
    fn recv(&mut self) -> Vec<BusEvent>;

    /// Publishes a learned invariant.
    fn send_invariant(&mut self, term: TermId);

    /// Publishes a property status.
    fn send_status(&mut self, prop: &str, status: PropertyStatus);

    /// `true` once the other end is gone; engines stop waiting on a closed
    /// bus.
    fn is_closed(&self) -> bool;
}

/// mpsc-backed mailbox; the live endpoint handed to an engine.
#[derive(Debug)]
pub struct ChannelMailbox {
    rx: Receiver<BusEvent>,
    tx: Sender<BusEvent>,
    closed: bool,
}

/// The framework's side of a [`ChannelMailbox`].
#[derive(Debug)]
pub struct BusPeer {
    tx: Sender<BusEvent>,
    rx: Receiver<BusEvent>,
}

/// A connected mailbox/peer pair.
pub fn channel_pair() -> (ChannelMailbox, BusPeer) {
    let (to_engine, from_peer) = mpsc::channel();
    let (to_peer, from_engine) = mpsc::channel();
    (
        ChannelMailbox {
            rx: from_peer,
            tx: to_peer,
            closed: false,
        },
        BusPeer {
            tx: to_engine,
            rx: from_engine,
        },
    )
}

impl Mailbox for ChannelMailbox {
    fn recv(&mut self) -> Vec<BusEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        events
    }

    fn send_invariant(&mut self, term: TermId) {
        if self.tx.send(BusEvent::Invariant(term)).is_err() {
            self.closed = true;
        }
    }

    fn send_status(&mut self, prop: &str, status: PropertyStatus) {
        let event = BusEvent::StatusUpdate {
            prop: prop.to_string(),
            status,
        };
        if self.tx.send(event).is_err() {
            self.closed = true;
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl BusPeer {
    /// Sends an invariant to the engine.
    pub fn send_invariant(&self, term: TermId) {
        let _ = self.tx.send(BusEvent::Invariant(term));
    }

    /// Sends a status update to the engine.
    pub fn send_status(&self, prop: &str, status: PropertyStatus) {
        let _ = self.tx.send(BusEvent::StatusUpdate {
            prop: prop.to_string(),
            status,
        });
    }

    /// Everything the engine has published so far.
    pub fn drain(&self) -> Vec<BusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// In-memory mailbox for tests: events are delivered in per-poll batches and
/// everything published is kept for inspection.
#[derive(Debug, Default)]
pub struct QueueMailbox {
    batches: VecDeque<Vec<BusEvent>>,
    /// Everything the engine published, in order.
    pub published: Vec<BusEvent>,
    closed: bool,
}

impl QueueMailbox {
    /// An open mailbox with no queued batches.
    pub fn new() -> Self {
        QueueMailbox::default()
    }

    /// Queues a batch; each [`recv`](Mailbox::recv) pops exactly one.
    pub fn push_batch(&mut self, events: Vec<BusEvent>) -> &mut Self {
        self.batches.push_back(events);
        self
    }

    /// Queues `n` empty batches, spacing later deliveries by `n` polls.
    pub fn push_empty_batches(&mut self, n: usize) -> &mut Self {
        for _ in 0..n {
            self.batches.push_back(Vec::new());
        }
        self
    }

    /// Marks the far end as gone once the queue drains.
    pub fn close_when_drained(&mut self) -> &mut Self {
        self.closed = true;
        self
    }

    /// Statuses published for `prop`, in order.
    pub fn statuses_for(&self, prop: &str) -> Vec<PropertyStatus> {
        self.published
            .iter()
            .filter_map(|e| match e {
                BusEvent::StatusUpdate { prop: p, status } if p == prop => {
                    Some(status.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl Mailbox for QueueMailbox {
    fn recv(&mut self) -> Vec<BusEvent> {
        self.batches.pop_front().unwrap_or_default()
    }

    fn send_invariant(&mut self, term: TermId) {
        self.published.push(BusEvent::Invariant(term));
    }

    fn send_status(&mut self, prop: &str, status: PropertyStatus) {
        self.published.push(BusEvent::StatusUpdate {
            prop: prop.to_string(),
            status,
        });
    }

    fn is_closed(&self) -> bool {
        self.closed && self.batches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;
    use vigil_term::{Sort, StateVar, TermPool};

    fn tiny_sys(pool: &mut TermPool) -> TransSys {
        let x = pool.declare_state_var(StateVar::new("x", ["m"], Sort::Bool));
        let v = pool.mk_var(x.at(0));
        let t = pool.mk_true();
        TransSys::new(
            "tiny",
            "QF_UF",
            vec![x],
            v,
            t,
            vec![Property::new("p", v)],
            vec![],
        )
    }

    #[test]
    fn digest_splits_event_kinds() {
        let mut pool = TermPool::new();
        let mut sys = tiny_sys(&mut pool);
        let inv = pool.mk_true();
        let digest = update_trans_sys(
            &mut sys,
            vec![
                BusEvent::Invariant(inv),
                BusEvent::StatusUpdate {
                    prop: "p".into(),
                    status: PropertyStatus::Invariant,
                },
            ],
        );
        assert_eq!(digest.invariants, vec![inv]);
        assert_eq!(digest.valids, vec!["p".to_string()]);
        assert!(digest.falsifieds.is_empty());
        assert_eq!(sys.prop_status("p"), PropertyStatus::Invariant);
    }

    #[test]
    fn stale_updates_do_not_reach_the_digest() {
        let mut pool = TermPool::new();
        let mut sys = tiny_sys(&mut pool);
        sys.set_prop_status("p", PropertyStatus::Invariant);
        let digest = update_trans_sys(
            &mut sys,
            vec![BusEvent::StatusUpdate {
                prop: "p".into(),
                status: PropertyStatus::Invariant,
            }],
        );
        assert!(digest.valids.is_empty());
    }

    #[test]
    fn ktrue_updates_apply_silently() {
        let mut pool = TermPool::new();
        let mut sys = tiny_sys(&mut pool);
        let digest = update_trans_sys(
            &mut sys,
            vec![BusEvent::StatusUpdate {
                prop: "p".into(),
                status: PropertyStatus::KTrue(4),
            }],
        );
        assert!(digest.valids.is_empty() && digest.falsifieds.is_empty());
        assert_eq!(sys.prop_status("p"), PropertyStatus::KTrue(4));
    }

    #[test]
    fn channel_pair_roundtrip() {
        let mut pool = TermPool::new();
        let inv = pool.mk_true();
        let (mut mailbox, peer) = channel_pair();
        peer.send_invariant(inv);
        peer.send_status("p", PropertyStatus::KTrue(1));
        let events = mailbox.recv();
        assert_eq!(events.len(), 2);
        assert!(!mailbox.is_closed());

        mailbox.send_status("p", PropertyStatus::Invariant);
        let published = peer.drain();
        assert_eq!(published.len(), 1);
    }

    #[test]
    fn dropped_peer_closes_the_mailbox() {
        let (mut mailbox, peer) = channel_pair();
        drop(peer);
        assert!(mailbox.recv().is_empty());
        assert!(mailbox.is_closed());
    }

    #[test]
    fn queue_mailbox_delivers_one_batch_per_poll() {
        let mut pool = TermPool::new();
        let inv = pool.mk_true();
        let mut mailbox = QueueMailbox::new();
        mailbox
            .push_empty_batches(1)
            .push_batch(vec![BusEvent::Invariant(inv)]);
        assert!(mailbox.recv().is_empty());
        assert_eq!(mailbox.recv(), vec![BusEvent::Invariant(inv)]);
        assert!(mailbox.recv().is_empty());
    }

    #[test]
    fn queue_mailbox_close_waits_for_drain() {
        let mut mailbox = QueueMailbox::new();
        mailbox.push_empty_batches(1).close_when_drained();
        assert!(!mailbox.is_closed());
        mailbox.recv();
        assert!(mailbox.is_closed());
    }
}
