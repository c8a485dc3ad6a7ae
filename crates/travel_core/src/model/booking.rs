//! Booking domain model.
//!
//! # Responsibility
//! - Define the canonical booking record and its request shapes.
//! - Validate creation input before it reaches persistence.
//!
//! # Invariants
//! - `id`, `user_id`, `kind` and `reference_id` never change after creation.
//! - `total_price` is never negative.
//! - `status` only changes through the transition table in `model::transition`.
//! - `booking_details` is opaque to core and passes through unvalidated.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

static CURRENCY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid currency code regex"));

/// Stable identifier for a booking.
pub type BookingId = Uuid;

/// Opaque key-value payload carried by a booking (guest info, seat selection).
pub type BookingDetails = Map<String, Value>;

/// What is being booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    Flight,
    Accommodation,
}

impl BookingType {
    pub const ALL: [BookingType; 2] = [BookingType::Flight, BookingType::Accommodation];

    /// Persisted lowercase token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Accommodation => "accommodation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "flight" => Some(Self::Flight),
            "accommodation" => Some(Self::Accommodation),
            _ => None,
        }
    }
}

impl Display for BookingType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value.trim())
            .ok_or_else(|| format!("unknown booking type `{value}`; expected flight|accommodation"))
    }
}

/// Booking lifecycle state.
///
/// Serialized as exactly one of `pending|confirmed|cancelled|completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, awaiting confirmation.
    Pending,
    /// Confirmed by the provider.
    Confirmed,
    /// Cancelled. Terminal.
    Cancelled,
    /// Trip took place. Terminal.
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ];

    /// Persisted lowercase token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value.trim()).ok_or_else(|| {
            format!("unknown booking status `{value}`; expected pending|confirmed|cancelled|completed")
        })
    }
}

/// Canonical booking record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    /// Owning principal, taken from the authenticated caller.
    pub user_id: String,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: BookingType,
    pub status: BookingStatus,
    /// External flight/accommodation identifier. Not unique across bookings.
    pub reference_id: String,
    pub total_price: Decimal,
    pub currency: String,
    pub booking_details: Option<BookingDetails>,
    /// Unix epoch milliseconds.
    pub check_in_date: Option<i64>,
    /// Unix epoch milliseconds.
    pub check_out_date: Option<i64>,
    pub notes: Option<String>,
    /// Unix epoch milliseconds, set by storage.
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed by storage on every write.
    pub updated_at: i64,
}

impl Booking {
    /// Builds a fresh `pending` booking from a validated request.
    ///
    /// Timestamps are zero until storage assigns them on insert.
    pub fn pending(user_id: impl Into<String>, request: NewBooking, currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            kind: request.kind,
            status: BookingStatus::Pending,
            reference_id: request.reference_id,
            total_price: round_price(request.total_price),
            currency,
            booking_details: request.booking_details,
            check_in_date: request.check_in_date,
            check_out_date: request.check_out_date,
            notes: request.notes,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Checks invariants that must hold for any stored booking.
    pub fn validate(&self) -> Result<(), BookingValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(BookingValidationError::EmptyUserId);
        }
        if self.reference_id.trim().is_empty() {
            return Err(BookingValidationError::EmptyReferenceId);
        }
        if self.total_price < Decimal::ZERO {
            return Err(BookingValidationError::NegativePrice(self.total_price));
        }
        if !is_currency_code(&self.currency) {
            return Err(BookingValidationError::InvalidCurrency(self.currency.clone()));
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Creation request.
///
/// `kind`, `reference_id` and `total_price` are required; the rest is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    #[serde(rename = "type")]
    pub kind: BookingType,
    pub reference_id: String,
    pub total_price: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub check_in_date: Option<i64>,
    #[serde(default)]
    pub check_out_date: Option<i64>,
    #[serde(default)]
    pub booking_details: Option<BookingDetails>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewBooking {
    /// Request with only the required fields set.
    pub fn new(kind: BookingType, reference_id: impl Into<String>, total_price: Decimal) -> Self {
        Self {
            kind,
            reference_id: reference_id.into(),
            total_price,
            currency: None,
            check_in_date: None,
            check_out_date: None,
            booking_details: None,
            notes: None,
        }
    }

    /// Validates the request shape.
    ///
    /// Date fields are not correlated with `kind`: a flight may carry dates
    /// and an accommodation may omit them.
    pub fn validate(&self) -> Result<(), BookingValidationError> {
        if self.reference_id.trim().is_empty() {
            return Err(BookingValidationError::EmptyReferenceId);
        }
        if self.total_price < Decimal::ZERO {
            return Err(BookingValidationError::NegativePrice(self.total_price));
        }
        if let Some(currency) = self.currency.as_deref() {
            if !is_currency_code(&normalize_currency(currency)) {
                return Err(BookingValidationError::InvalidCurrency(currency.to_string()));
            }
        }
        Ok(())
    }
}

/// General update surface. Only `notes` and `booking_details` are amendable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingPatch {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub booking_details: Option<BookingDetails>,
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        self.notes.is_none() && self.booking_details.is_none()
    }

    /// Merges present fields onto `booking`; absent fields keep their value.
    pub fn apply_to(&self, booking: &mut Booking) {
        if let Some(notes) = self.notes.as_ref() {
            booking.notes = Some(notes.clone());
        }
        if let Some(details) = self.booking_details.as_ref() {
            booking.booking_details = Some(details.clone());
        }
    }
}

/// Domain validation errors for booking input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingValidationError {
    EmptyUserId,
    EmptyReferenceId,
    NegativePrice(Decimal),
    InvalidCurrency(String),
}

impl Display for BookingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUserId => write!(f, "user id must not be empty"),
            Self::EmptyReferenceId => write!(f, "reference id must not be empty"),
            Self::NegativePrice(price) => write!(f, "total price must not be negative: {price}"),
            Self::InvalidCurrency(code) => {
                write!(f, "currency must be a 3-letter code, got `{code}`")
            }
        }
    }
}

impl Error for BookingValidationError {}

/// Uppercases and trims a currency code.
pub fn normalize_currency(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

/// Returns whether `value` is a 3-letter uppercase code.
pub fn is_currency_code(value: &str) -> bool {
    CURRENCY_CODE_RE.is_match(value)
}

/// Rounds a monetary amount to 2 decimals, half away from zero.
pub fn round_price(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
