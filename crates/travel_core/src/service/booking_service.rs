//! Booking lifecycle service.
//!
//! # Responsibility
//! - Create bookings in `pending` and serve id/reference/owner lookups.
//! - Apply status transitions through the static transition table.
//! - Enforce cancellation rules with distinguishable errors.
//! - Fire confirmation/cancellation notices after committed transitions and
//!   reminders on request.
//!
//! # Invariants
//! - Every status write is conditional on the status that was validated, so
//!   two racing transitions cannot both succeed.
//! - Notification failures are logged and swallowed; they never undo or fail
//!   a committed write.
//! - Each operation mutates at most one booking row.

use crate::config::CoreConfig;
use crate::model::booking::{
    normalize_currency, Booking, BookingId, BookingPatch, BookingStatus, BookingType,
    BookingValidationError, NewBooking,
};
use crate::model::transition::can_transition;
use crate::repo::booking_repo::{BookingFilter, BookingRepository, RepoError, StatusWrite};
use crate::service::notify::{BookingNotice, NoopDispatcher, NoticeKind, NotificationDispatcher};
use crate::service::page::{Page, PageRequest};
use crate::service::reference::{AcceptAllReferences, ReferenceError, ReferenceValidator};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors surfaced by booking lifecycle operations.
#[derive(Debug)]
pub enum BookingServiceError {
    /// Request failed domain validation.
    Validation(BookingValidationError),
    /// No booking with this id.
    NotFound(BookingId),
    /// No booking carries this reference id.
    ReferenceNotFound(String),
    /// The referenced flight/accommodation cannot be booked.
    ReferenceUnavailable(ReferenceError),
    /// `to` is not reachable from `from` in one step.
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    /// `cancel` on a booking that is already cancelled.
    AlreadyCancelled(BookingId),
    /// `cancel` on a completed booking.
    CannotCancelCompleted(BookingId),
    /// Stored status changed between validation and write.
    ConcurrentModification {
        id: BookingId,
        expected: BookingStatus,
        actual: BookingStatus,
    },
    /// Storage failure. Not retried here.
    Persistence(RepoError),
    /// Write succeeded but read-back did not match.
    InconsistentState(&'static str),
}

impl BookingServiceError {
    /// True for the generic invalid-transition error and its cancel-specific
    /// variants.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::AlreadyCancelled(_) | Self::CannotCancelCompleted(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::ReferenceNotFound(_))
    }

    /// Stable machine-readable code for callers mapping errors to responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NotFound(_) | Self::ReferenceNotFound(_) => "not_found",
            Self::ReferenceUnavailable(_) => "reference_unavailable",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::AlreadyCancelled(_) => "already_cancelled",
            Self::CannotCancelCompleted(_) => "cannot_cancel_completed",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::Persistence(_) => "persistence_error",
            Self::InconsistentState(_) => "inconsistent_state",
        }
    }
}

impl Display for BookingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "booking not found: {id}"),
            Self::ReferenceNotFound(reference_id) => {
                write!(f, "booking not found for reference `{reference_id}`")
            }
            Self::ReferenceUnavailable(err) => write!(f, "{err}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "cannot transition from {from} to {to}")
            }
            Self::AlreadyCancelled(id) => write!(f, "booking {id} is already cancelled"),
            Self::CannotCancelCompleted(id) => {
                write!(f, "booking {id} is completed and cannot be cancelled")
            }
            Self::ConcurrentModification {
                id,
                expected,
                actual,
            } => write!(
                f,
                "booking {id} changed concurrently: expected {expected}, found {actual}"
            ),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent booking state: {details}"),
        }
    }
}

impl Error for BookingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::ReferenceUnavailable(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BookingServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Persistence(other),
        }
    }
}

impl From<BookingValidationError> for BookingServiceError {
    fn from(value: BookingValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ReferenceError> for BookingServiceError {
    fn from(value: ReferenceError) -> Self {
        Self::ReferenceUnavailable(value)
    }
}

pub type ServiceResult<T> = Result<T, BookingServiceError>;

/// Booking lifecycle facade over a repository implementation.
pub struct BookingService<R: BookingRepository> {
    repo: R,
    config: CoreConfig,
    references: Box<dyn ReferenceValidator>,
    notifier: Box<dyn NotificationDispatcher>,
}

impl<R: BookingRepository> BookingService<R> {
    /// Creates a service with default config, no reference checks and no
    /// notifications.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            config: CoreConfig::default(),
            references: Box::new(AcceptAllReferences),
            notifier: Box::new(NoopDispatcher),
        }
    }

    pub fn with_config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_reference_validator(mut self, validator: impl ReferenceValidator + 'static) -> Self {
        self.references = Box::new(validator);
        self
    }

    pub fn with_notifier(mut self, notifier: impl NotificationDispatcher + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Creates a `pending` booking owned by `user_id`.
    ///
    /// # Contract
    /// - Currency defaults to the configured base currency.
    /// - The reference must be bookable per the reference validator.
    /// - No notification is sent.
    pub fn create(&self, user_id: &str, request: NewBooking) -> ServiceResult<Booking> {
        if user_id.trim().is_empty() {
            return Err(BookingValidationError::EmptyUserId.into());
        }
        request.validate()?;
        self.references
            .ensure_bookable(request.kind, request.reference_id.as_str())?;

        let currency = request
            .currency
            .as_deref()
            .map(normalize_currency)
            .unwrap_or_else(|| self.config.base_currency.clone());
        let booking = Booking::pending(user_id, request, currency);
        let id = self.repo.insert(&booking)?;

        let created = self
            .repo
            .get(id)?
            .ok_or(BookingServiceError::InconsistentState(
                "created booking not found in read-back",
            ))?;
        info!(
            "event=booking_create module=booking status=ok booking_id={} booking_type={}",
            created.id, created.kind
        );
        Ok(created)
    }

    pub fn find_by_id(&self, id: BookingId) -> ServiceResult<Booking> {
        self.repo
            .get(id)?
            .ok_or(BookingServiceError::NotFound(id))
    }

    /// Bookings owned by `user_id`, newest first.
    pub fn find_by_user(&self, user_id: &str, request: PageRequest) -> ServiceResult<Page<Booking>> {
        self.page(&BookingFilter::User(user_id.to_string()), request)
    }

    /// Returns the oldest booking carrying `reference_id`.
    ///
    /// References are not unique; use `list_by_reference_id` to see all.
    pub fn find_by_reference_id(&self, reference_id: &str) -> ServiceResult<Booking> {
        self.repo
            .find_first(&BookingFilter::Reference(reference_id.to_string()))?
            .ok_or_else(|| BookingServiceError::ReferenceNotFound(reference_id.to_string()))
    }

    /// Every booking carrying `reference_id`, oldest first.
    pub fn list_by_reference_id(&self, reference_id: &str) -> ServiceResult<Vec<Booking>> {
        Ok(self
            .repo
            .find_all_ascending(&BookingFilter::Reference(reference_id.to_string()))?)
    }

    /// Merges `notes` / `booking_details` onto an existing booking.
    pub fn update(&self, id: BookingId, patch: &BookingPatch) -> ServiceResult<Booking> {
        if patch.is_empty() {
            return self.find_by_id(id);
        }
        if !self.repo.update_details(id, patch)? {
            return Err(BookingServiceError::NotFound(id));
        }
        self.repo
            .get(id)?
            .ok_or(BookingServiceError::InconsistentState(
                "updated booking not found in read-back",
            ))
    }

    /// Moves a booking to `target` if the transition table allows it.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist.
    /// - `InvalidTransition` when `target` is not reachable, including
    ///   `target == current`.
    /// - `ConcurrentModification` when another writer changed the status
    ///   after it was read.
    pub fn update_status(&self, id: BookingId, target: BookingStatus) -> ServiceResult<Booking> {
        let booking = self.find_by_id(id)?;
        self.transition(id, booking.status, target, Some(&booking))
    }

    /// Like `update_status`, but the caller states the status it observed.
    ///
    /// A legal `(expected, target)` pair goes straight to the conditional
    /// write; a stale `expected` surfaces as `ConcurrentModification`.
    /// An illegal pair reports `NotFound` for an unknown id before
    /// `InvalidTransition`.
    pub fn update_status_from(
        &self,
        id: BookingId,
        expected: BookingStatus,
        target: BookingStatus,
    ) -> ServiceResult<Booking> {
        if !can_transition(expected, target) && self.repo.get(id)?.is_none() {
            return Err(BookingServiceError::NotFound(id));
        }
        self.transition(id, expected, target, None)
    }

    /// Cancels a `pending` or `confirmed` booking.
    pub fn cancel(&self, id: BookingId) -> ServiceResult<Booking> {
        let booking = self.find_by_id(id)?;
        match booking.status {
            BookingStatus::Cancelled => Err(BookingServiceError::AlreadyCancelled(id)),
            BookingStatus::Completed => Err(BookingServiceError::CannotCancelCompleted(id)),
            current => self.transition(id, current, BookingStatus::Cancelled, Some(&booking)),
        }
    }

    pub fn bookings_by_type(
        &self,
        kind: BookingType,
        request: PageRequest,
    ) -> ServiceResult<Page<Booking>> {
        self.page(&BookingFilter::Type(kind), request)
    }

    pub fn bookings_by_status(
        &self,
        status: BookingStatus,
        request: PageRequest,
    ) -> ServiceResult<Page<Booking>> {
        self.page(&BookingFilter::Status(status), request)
    }

    fn page(&self, filter: &BookingFilter, request: PageRequest) -> ServiceResult<Page<Booking>> {
        let request =
            request.normalized(self.config.default_page_limit, self.config.max_page_limit);
        let total = self.repo.count(filter)?;
        let items = self.repo.find_many(filter, request.offset(), request.limit)?;
        Ok(Page::new(items, total, request))
    }

    /// Sends a reminder for an upcoming confirmed booking.
    ///
    /// Returns `false` without dispatching when the booking is not confirmed
    /// or the dispatcher fails; dispatch failures are logged, not returned.
    pub fn send_reminder(&self, id: BookingId) -> ServiceResult<bool> {
        let booking = self.find_by_id(id)?;
        if booking.status != BookingStatus::Confirmed {
            info!(
                "event=booking_notice module=booking status=skipped kind=reminder booking_id={id} booking_status={}",
                booking.status
            );
            return Ok(false);
        }
        Ok(self.notify(&BookingNotice::from_booking(NoticeKind::Reminder, &booking)))
    }

    /// Applies `from -> to` with a conditional write.
    ///
    /// When the read-back after a committed write fails and `snapshot` holds
    /// the booking as read before the write, the result is that snapshot with
    /// the new status; its `updated_at` is the pre-write value.
    fn transition(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        snapshot: Option<&Booking>,
    ) -> ServiceResult<Booking> {
        if !can_transition(from, to) {
            return Err(BookingServiceError::InvalidTransition { from, to });
        }

        match self.repo.update_status(id, from, to)? {
            StatusWrite::Applied => {}
            StatusWrite::Missing => return Err(BookingServiceError::NotFound(id)),
            StatusWrite::Conflict(actual) => {
                warn!(
                    "event=booking_status module=booking status=conflict booking_id={id} expected={from} actual={actual} target={to}"
                );
                return Err(BookingServiceError::ConcurrentModification {
                    id,
                    expected: from,
                    actual,
                });
            }
        }

        let updated = match self.read_back(id) {
            Ok(booking) => booking,
            Err(err) => {
                error!(
                    "event=booking_status module=booking status=read_back_failed booking_id={id} from={from} committed={to} error={err}"
                );
                match snapshot {
                    Some(snapshot) => Booking {
                        status: to,
                        ..snapshot.clone()
                    },
                    None => return Err(err),
                }
            }
        };
        info!("event=booking_status module=booking status=ok booking_id={id} from={from} to={to}");

        if let Some(kind) = NoticeKind::for_status(to) {
            self.notify(&BookingNotice::from_booking(kind, &updated));
        }
        Ok(updated)
    }

    fn read_back(&self, id: BookingId) -> ServiceResult<Booking> {
        self.repo
            .get(id)?
            .ok_or(BookingServiceError::InconsistentState(
                "transitioned booking not found in read-back",
            ))
    }

    fn notify(&self, notice: &BookingNotice) -> bool {
        match self.notifier.dispatch(notice) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "event=booking_notice module=booking status=error kind={} booking_id={} error={}",
                    notice.kind.as_str(),
                    notice.booking_id,
                    err
                );
                false
            }
        }
    }
}
