//! Booking domain model.
//!
//! # Responsibility
//! - Define canonical booking data structures used by core business logic.
//! - Hold the status transition graph as static data.
//!
//! # Invariants
//! - Every booking is identified by a stable `BookingId`.
//! - Bookings are never physically deleted by core.

pub mod booking;
pub mod transition;
