//! Reference lookup seam.
//!
//! Confirms that a flight or accommodation exists and is open for booking
//! before a booking referencing it is created. The lookup is read-only.

use crate::model::booking::BookingType;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why a reference cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// No flight/accommodation with this id.
    NotFound { kind: BookingType, reference_id: String },
    /// Record exists but is not active.
    Inactive { kind: BookingType, reference_id: String },
    /// Lookup backend failed.
    Unavailable(String),
}

impl Display for ReferenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, reference_id } => {
                write!(f, "{kind} `{reference_id}` does not exist")
            }
            Self::Inactive { kind, reference_id } => {
                write!(f, "{kind} `{reference_id}` is not active")
            }
            Self::Unavailable(message) => write!(f, "reference lookup failed: {message}"),
        }
    }
}

impl Error for ReferenceError {}

/// Read-only lookup of bookable flights/accommodations.
pub trait ReferenceValidator {
    fn ensure_bookable(&self, kind: BookingType, reference_id: &str)
        -> Result<(), ReferenceError>;
}

/// Accepts every reference. Used when no catalog is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllReferences;

impl ReferenceValidator for AcceptAllReferences {
    fn ensure_bookable(&self, _kind: BookingType, _reference_id: &str) -> Result<(), ReferenceError> {
        Ok(())
    }
}

/// In-memory catalog of known references and their active flag.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    entries: HashMap<(BookingType, String), bool>,
}

impl ReferenceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) one reference.
    pub fn insert(&mut self, kind: BookingType, reference_id: impl Into<String>, active: bool) {
        self.entries.insert((kind, reference_id.into()), active);
    }

    pub fn with_active(mut self, kind: BookingType, reference_id: impl Into<String>) -> Self {
        self.insert(kind, reference_id, true);
        self
    }
}

impl ReferenceValidator for ReferenceCatalog {
    fn ensure_bookable(&self, kind: BookingType, reference_id: &str) -> Result<(), ReferenceError> {
        match self.entries.get(&(kind, reference_id.to_string())) {
            Some(true) => Ok(()),
            Some(false) => Err(ReferenceError::Inactive {
                kind,
                reference_id: reference_id.to_string(),
            }),
            None => Err(ReferenceError::NotFound {
                kind,
                reference_id: reference_id.to_string(),
            }),
        }
    }
}
