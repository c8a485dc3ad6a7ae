//! Booking status transition table.
//!
//! # Invariants
//! - The graph is acyclic: no transition revisits a state.
//! - Self transitions are never allowed.
//! - `cancelled` and `completed` have no outgoing edges.

use crate::model::booking::BookingStatus;

/// Adjacency list of allowed `from -> to` moves.
pub const TRANSITIONS: &[(BookingStatus, &[BookingStatus])] = &[
    (
        BookingStatus::Pending,
        &[BookingStatus::Confirmed, BookingStatus::Cancelled],
    ),
    (
        BookingStatus::Confirmed,
        &[BookingStatus::Cancelled, BookingStatus::Completed],
    ),
    (BookingStatus::Cancelled, &[]),
    (BookingStatus::Completed, &[]),
];

/// Returns the statuses reachable in one step from `from`.
pub fn allowed_targets(from: BookingStatus) -> &'static [BookingStatus] {
    TRANSITIONS
        .iter()
        .find(|(state, _)| *state == from)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

/// Returns whether `from -> to` is an edge of the transition graph.
pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    allowed_targets(from).contains(&to)
}

impl BookingStatus {
    /// A terminal status has no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        allowed_targets(self).is_empty()
    }
}
