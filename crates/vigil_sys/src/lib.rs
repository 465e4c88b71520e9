//! Transition systems, properties and the cross-technique event bus.
//!
//! A [`TransSys`] is the symbolic system `(I, T, V)` the engines check:
//! `init` over offset 0, `trans` between offsets 0 and 1, and a list of
//! candidate safety [`Property`]s. Property statuses move monotonically
//! through the lattice `Unknown ⊑ KTrue(k) ⊑ KTrue(k+1) ⊑ Invariant`, with
//! `Falsified` as the absorbing sibling of the upper branch.
//!
//! Engines cooperate with the surrounding framework through a [`Mailbox`]:
//! non-blocking receipt of invariants and status updates discovered by other
//! techniques, and publication of this engine's own verdicts.

mod event;
mod property;
mod trace;
mod trans;

pub use event::{
    channel_pair, update_trans_sys, BusEvent, BusPeer, ChannelMailbox, EventDigest, Mailbox,
    QueueMailbox,
};
pub use property::{Property, PropertyStatus};
pub use trace::Trace;
pub use trans::{FunDef, TransSys};
