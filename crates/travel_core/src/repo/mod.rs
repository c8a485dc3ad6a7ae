//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistence gateway contract used by booking services.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Booking::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod booking_repo;
