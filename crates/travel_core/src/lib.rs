//! Core domain logic for travel bookings.
//! This crate is the single source of truth for booking lifecycle invariants.

pub mod config;
pub mod currency;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use currency::{
    currency_symbol, format_price, Conversion, ConversionPath, CurrencyConverter, ExchangeRate,
};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::booking::{
    Booking, BookingDetails, BookingId, BookingPatch, BookingStatus, BookingType,
    BookingValidationError, NewBooking,
};
pub use model::transition::{allowed_targets, can_transition, TRANSITIONS};
pub use repo::booking_repo::{
    BookingFilter, BookingRepository, RepoError, RepoResult, SqliteBookingRepository, StatusWrite,
};
pub use service::booking_service::{BookingService, BookingServiceError, ServiceResult};
pub use service::notify::{
    BookingNotice, LogDispatcher, NoopDispatcher, NoticeKind, NotificationDispatcher, NotifyError,
};
pub use service::page::{Page, PageRequest};
pub use service::reference::{
    AcceptAllReferences, ReferenceCatalog, ReferenceError, ReferenceValidator,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
