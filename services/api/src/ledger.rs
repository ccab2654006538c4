//! Completion rules for the payout ledger
//!
//! A slot is received once every transfer confirmation recorded against it
//! has been sent, and a group is done once every one of its slots has been
//! received. Both rules are recomputed from the child rows on each write, with
//! the parent row locked, by the repositories.

/// Count of child rows and of those still outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub total: i64,
    pub outstanding: i64,
}

impl Tally {
    /// Tally a set of completion flags, counting `false` as outstanding
    pub fn from_flags<I>(flags: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        flags.into_iter().fold(Self::default(), |mut tally, done| {
            tally.total += 1;
            if !done {
                tally.outstanding += 1;
            }
            tally
        })
    }
}

/// Received flag of a slot given its confirmations.
///
/// A slot without confirmations keeps its current flag, so a slot marked
/// received by hand is not reopened by the recompute.
pub fn slot_received(confirmations: Tally, current: bool) -> bool {
    if confirmations.total == 0 {
        current
    } else {
        confirmations.outstanding == 0
    }
}

/// Done flag of a group given its slots. A group without slots is not done.
pub fn group_done(slots: Tally) -> bool {
    slots.total > 0 && slots.outstanding == 0
}
