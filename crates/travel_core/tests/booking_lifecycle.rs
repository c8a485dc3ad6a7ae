use rust_decimal::Decimal;
use serde_json::json;
use std::cell::Cell;
use std::sync::{Arc, Mutex};
use travel_core::db::open_db_in_memory;
use travel_core::{
    Booking, BookingDetails, BookingFilter, BookingId, BookingNotice, BookingPatch,
    BookingRepository, BookingService, BookingServiceError, BookingStatus, BookingType,
    CoreConfig, NewBooking, NoticeKind, NotificationDispatcher, NotifyError, ReferenceCatalog,
    RepoError, RepoResult, SqliteBookingRepository, StatusWrite,
};
use uuid::Uuid;

fn accommodation(price: Decimal) -> NewBooking {
    NewBooking::new(BookingType::Accommodation, "hotel-lisbon-12", price)
}

fn flight() -> NewBooking {
    NewBooking::new(BookingType::Flight, "TP-1337", Decimal::new(12900, 2))
}

#[derive(Clone, Default)]
struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<BookingNotice>>>,
}

impl NotificationDispatcher for RecordingDispatcher {
    fn dispatch(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

struct FailingDispatcher;

impl NotificationDispatcher for FailingDispatcher {
    fn dispatch(&self, _notice: &BookingNotice) -> Result<(), NotifyError> {
        Err(NotifyError("smtp unreachable".to_string()))
    }
}

#[test]
fn created_booking_is_pending_with_default_currency() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));

    let booking = service.create("user-1", flight()).unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.currency, "EUR");
    assert_eq!(booking.user_id, "user-1");
    assert_eq!(service.find_by_id(booking.id).unwrap(), booking);
}

#[test]
fn create_uses_configured_base_currency_and_normalizes_explicit_codes() {
    let conn = open_db_in_memory().unwrap();
    let config = CoreConfig::from_toml_str("base_currency = \"CHF\"").unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn)).with_config(config);

    let defaulted = service.create("user-1", flight()).unwrap();
    assert_eq!(defaulted.currency, "CHF");

    let mut request = flight();
    request.currency = Some("gbp".to_string());
    let explicit = service.create("user-1", request).unwrap();
    assert_eq!(explicit.currency, "GBP");
}

#[test]
fn create_rejects_blank_user_and_negative_price() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));

    let err = service.create(" ", flight()).unwrap_err();
    assert!(matches!(err, BookingServiceError::Validation(_)));

    let err = service
        .create("user-1", accommodation(Decimal::new(-1, 0)))
        .unwrap_err();
    assert_eq!(err.code(), "validation_failed");
}

#[test]
fn create_checks_reference_catalog() {
    let conn = open_db_in_memory().unwrap();
    let mut catalog = ReferenceCatalog::new().with_active(BookingType::Flight, "TP-1337");
    catalog.insert(BookingType::Accommodation, "hotel-closed", false);
    let service = BookingService::new(SqliteBookingRepository::new(&conn))
        .with_reference_validator(catalog);

    service.create("user-1", flight()).unwrap();

    let closed = NewBooking::new(BookingType::Accommodation, "hotel-closed", Decimal::ONE);
    let err = service.create("user-1", closed).unwrap_err();
    assert!(matches!(err, BookingServiceError::ReferenceUnavailable(_)));

    let repo = SqliteBookingRepository::new(&conn);
    assert_eq!(
        repo.count(&BookingFilter::User("user-1".to_string()))
            .unwrap(),
        1
    );
}

#[test]
fn find_by_id_and_reference_report_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));

    let missing = Uuid::new_v4();
    let err = service.find_by_id(missing).unwrap_err();
    assert!(matches!(err, BookingServiceError::NotFound(id) if id == missing));

    let err = service.find_by_reference_id("nope").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn find_by_reference_returns_oldest_of_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));

    let first = service.create("alice", accommodation(Decimal::ONE)).unwrap();
    let second = service.create("bob", accommodation(Decimal::TWO)).unwrap();

    assert_eq!(service.find_by_reference_id("hotel-lisbon-12").unwrap().id, first.id);
    let all: Vec<BookingId> = service
        .list_by_reference_id("hotel-lisbon-12")
        .unwrap()
        .into_iter()
        .map(|booking| booking.id)
        .collect();
    assert_eq!(all, vec![first.id, second.id]);
}

#[test]
fn update_amends_notes_and_details_only() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));
    let booking = service.create("user-1", accommodation(Decimal::TEN)).unwrap();

    let mut details = BookingDetails::new();
    details.insert("guest".to_string(), json!({"name": "R. Costa", "adults": 2}));
    let patch = BookingPatch {
        notes: Some("ground floor please".to_string()),
        booking_details: Some(details.clone()),
    };
    let updated = service.update(booking.id, &patch).unwrap();

    assert_eq!(updated.notes.as_deref(), Some("ground floor please"));
    assert_eq!(updated.booking_details, Some(details));
    assert_eq!(updated.status, BookingStatus::Pending);
    assert_eq!(updated.total_price, booking.total_price);
    assert_eq!(updated.reference_id, booking.reference_id);

    let err = service.update(Uuid::new_v4(), &patch).unwrap_err();
    assert!(matches!(err, BookingServiceError::NotFound(_)));

    let untouched = service.update(booking.id, &BookingPatch::default()).unwrap();
    assert_eq!(untouched, updated);
}

#[test]
fn accommodation_confirm_then_cancel_then_cancel_again() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));

    let mut request = accommodation(Decimal::new(45000, 2));
    request.currency = Some("EUR".to_string());
    let booking = service.create("user-1", request).unwrap();
    assert_eq!(booking.total_price, Decimal::new(45000, 2));

    let confirmed = service
        .update_status(booking.id, BookingStatus::Confirmed)
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let cancelled = service.cancel(booking.id).unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let err = service.cancel(booking.id).unwrap_err();
    assert!(matches!(err, BookingServiceError::AlreadyCancelled(id) if id == booking.id));
    assert!(err.is_invalid_transition());
}

#[test]
fn flight_cannot_skip_confirmation() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));
    let booking = service.create("user-1", flight()).unwrap();

    let err = service
        .update_status(booking.id, BookingStatus::Completed)
        .unwrap_err();
    assert!(matches!(
        err,
        BookingServiceError::InvalidTransition {
            from: BookingStatus::Pending,
            to: BookingStatus::Completed,
        }
    ));
    assert_eq!(
        service.find_by_id(booking.id).unwrap().status,
        BookingStatus::Pending
    );
}

#[test]
fn cancel_completed_booking_is_distinguished() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));
    let booking = service.create("user-1", flight()).unwrap();
    service
        .update_status(booking.id, BookingStatus::Confirmed)
        .unwrap();
    service
        .update_status(booking.id, BookingStatus::Completed)
        .unwrap();

    let err = service.cancel(booking.id).unwrap_err();
    assert!(matches!(err, BookingServiceError::CannotCancelCompleted(_)));
    assert_eq!(err.code(), "cannot_cancel_completed");
}

#[test]
fn cancel_pending_booking_succeeds() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));
    let booking = service.create("user-1", flight()).unwrap();

    let cancelled = service.cancel(booking.id).unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(cancelled.is_terminal());
}

#[test]
fn status_operations_on_unknown_id_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));
    let missing = Uuid::new_v4();

    assert!(service
        .update_status(missing, BookingStatus::Confirmed)
        .unwrap_err()
        .is_not_found());
    assert!(service.cancel(missing).unwrap_err().is_not_found());
    assert!(service
        .update_status_from(missing, BookingStatus::Pending, BookingStatus::Confirmed)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn stale_expected_status_is_a_concurrent_modification() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));
    let booking = service.create("user-1", flight()).unwrap();

    // Two callers both observed `pending`; the first one wins.
    service
        .update_status_from(booking.id, BookingStatus::Pending, BookingStatus::Cancelled)
        .unwrap();
    let err = service
        .update_status_from(booking.id, BookingStatus::Pending, BookingStatus::Confirmed)
        .unwrap_err();

    match err {
        BookingServiceError::ConcurrentModification {
            id,
            expected,
            actual,
        } => {
            assert_eq!(id, booking.id);
            assert_eq!(expected, BookingStatus::Pending);
            assert_eq!(actual, BookingStatus::Cancelled);
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Repository that lets a competing writer slip in between the service's
/// read and its conditional write.
struct RacingRepo<'conn> {
    inner: SqliteBookingRepository<'conn>,
    competing: BookingStatus,
}

impl BookingRepository for RacingRepo<'_> {
    fn insert(&self, booking: &Booking) -> RepoResult<BookingId> {
        self.inner.insert(booking)
    }

    fn get(&self, id: BookingId) -> RepoResult<Option<Booking>> {
        self.inner.get(id)
    }

    fn find_first(&self, filter: &BookingFilter) -> RepoResult<Option<Booking>> {
        self.inner.find_first(filter)
    }

    fn find_many(
        &self,
        filter: &BookingFilter,
        offset: u64,
        limit: u32,
    ) -> RepoResult<Vec<Booking>> {
        self.inner.find_many(filter, offset, limit)
    }

    fn find_all_ascending(&self, filter: &BookingFilter) -> RepoResult<Vec<Booking>> {
        self.inner.find_all_ascending(filter)
    }

    fn count(&self, filter: &BookingFilter) -> RepoResult<u64> {
        self.inner.count(filter)
    }

    fn update_details(&self, id: BookingId, patch: &BookingPatch) -> RepoResult<bool> {
        self.inner.update_details(id, patch)
    }

    fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> RepoResult<StatusWrite> {
        self.inner.update_status(id, expected, self.competing)?;
        self.inner.update_status(id, expected, next)
    }
}

#[test]
fn racing_cancellations_do_not_both_succeed() {
    let conn = open_db_in_memory().unwrap();
    let setup = BookingService::new(SqliteBookingRepository::new(&conn));
    let booking = setup.create("user-1", flight()).unwrap();

    let racing = BookingService::new(RacingRepo {
        inner: SqliteBookingRepository::new(&conn),
        competing: BookingStatus::Cancelled,
    });
    let err = racing.cancel(booking.id).unwrap_err();
    assert!(matches!(
        err,
        BookingServiceError::ConcurrentModification {
            actual: BookingStatus::Cancelled,
            ..
        }
    ));
}

#[test]
fn confirmations_and_cancellations_are_dispatched() {
    let conn = open_db_in_memory().unwrap();
    let dispatcher = RecordingDispatcher::default();
    let service = BookingService::new(SqliteBookingRepository::new(&conn))
        .with_notifier(dispatcher.clone());

    let booking = service.create("user-1", flight()).unwrap();
    assert!(dispatcher.sent.lock().unwrap().is_empty());

    service
        .update_status(booking.id, BookingStatus::Confirmed)
        .unwrap();
    service.cancel(booking.id).unwrap();

    let sent = dispatcher.sent.lock().unwrap();
    let kinds: Vec<NoticeKind> = sent.iter().map(|notice| notice.kind).collect();
    assert_eq!(kinds, vec![NoticeKind::Confirmation, NoticeKind::Cancellation]);
    assert!(sent.iter().all(|notice| notice.booking_id == booking.id));
}

#[test]
fn notification_failure_does_not_fail_the_transition() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn))
        .with_notifier(FailingDispatcher);

    let booking = service.create("user-1", accommodation(Decimal::TEN)).unwrap();
    let confirmed = service
        .update_status(booking.id, BookingStatus::Confirmed)
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let cancelled = service.cancel(booking.id).unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(
        service.find_by_id(booking.id).unwrap().status,
        BookingStatus::Cancelled
    );
}

#[test]
fn illegal_pair_on_unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn));

    let err = service
        .update_status_from(Uuid::new_v4(), BookingStatus::Completed, BookingStatus::Pending)
        .unwrap_err();
    assert!(err.is_not_found());

    let booking = service.create("user-1", flight()).unwrap();
    let err = service
        .update_status_from(booking.id, BookingStatus::Completed, BookingStatus::Pending)
        .unwrap_err();
    assert!(matches!(err, BookingServiceError::InvalidTransition { .. }));
}

/// Repository whose reads fail once a status write has committed.
struct UnreadableAfterWrite<'conn> {
    inner: SqliteBookingRepository<'conn>,
    written: Cell<bool>,
}

impl BookingRepository for UnreadableAfterWrite<'_> {
    fn insert(&self, booking: &Booking) -> RepoResult<BookingId> {
        self.inner.insert(booking)
    }

    fn get(&self, id: BookingId) -> RepoResult<Option<Booking>> {
        if self.written.get() {
            return Err(RepoError::InvalidData("storage went away".to_string()));
        }
        self.inner.get(id)
    }

    fn find_first(&self, filter: &BookingFilter) -> RepoResult<Option<Booking>> {
        self.inner.find_first(filter)
    }

    fn find_many(
        &self,
        filter: &BookingFilter,
        offset: u64,
        limit: u32,
    ) -> RepoResult<Vec<Booking>> {
        self.inner.find_many(filter, offset, limit)
    }

    fn find_all_ascending(&self, filter: &BookingFilter) -> RepoResult<Vec<Booking>> {
        self.inner.find_all_ascending(filter)
    }

    fn count(&self, filter: &BookingFilter) -> RepoResult<u64> {
        self.inner.count(filter)
    }

    fn update_details(&self, id: BookingId, patch: &BookingPatch) -> RepoResult<bool> {
        self.inner.update_details(id, patch)
    }

    fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> RepoResult<StatusWrite> {
        let outcome = self.inner.update_status(id, expected, next)?;
        self.written.set(outcome == StatusWrite::Applied);
        Ok(outcome)
    }
}

#[test]
fn committed_transition_survives_failed_read_back() {
    let conn = open_db_in_memory().unwrap();
    let setup = BookingService::new(SqliteBookingRepository::new(&conn));
    let booking = setup.create("user-1", flight()).unwrap();

    let dispatcher = RecordingDispatcher::default();
    let service = BookingService::new(UnreadableAfterWrite {
        inner: SqliteBookingRepository::new(&conn),
        written: Cell::new(false),
    })
    .with_notifier(dispatcher.clone());

    let confirmed = service
        .update_status(booking.id, BookingStatus::Confirmed)
        .unwrap();
    assert_eq!(confirmed.id, booking.id);
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let sent = dispatcher.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NoticeKind::Confirmation);
    assert_eq!(
        setup.find_by_id(booking.id).unwrap().status,
        BookingStatus::Confirmed
    );
}

#[test]
fn reminders_go_only_to_confirmed_bookings() {
    let conn = open_db_in_memory().unwrap();
    let dispatcher = RecordingDispatcher::default();
    let service = BookingService::new(SqliteBookingRepository::new(&conn))
        .with_notifier(dispatcher.clone());
    let booking = service.create("user-1", accommodation(Decimal::TEN)).unwrap();

    assert!(!service.send_reminder(booking.id).unwrap());
    service
        .update_status(booking.id, BookingStatus::Confirmed)
        .unwrap();
    assert!(service.send_reminder(booking.id).unwrap());
    assert!(service.send_reminder(Uuid::new_v4()).unwrap_err().is_not_found());

    let kinds: Vec<NoticeKind> = dispatcher
        .sent
        .lock()
        .unwrap()
        .iter()
        .map(|notice| notice.kind)
        .collect();
    assert_eq!(kinds, vec![NoticeKind::Confirmation, NoticeKind::Reminder]);
}

#[test]
fn failed_reminder_dispatch_reports_not_sent() {
    let conn = open_db_in_memory().unwrap();
    let service = BookingService::new(SqliteBookingRepository::new(&conn))
        .with_notifier(FailingDispatcher);
    let booking = service.create("user-1", flight()).unwrap();
    service
        .update_status(booking.id, BookingStatus::Confirmed)
        .unwrap();

    assert!(!service.send_reminder(booking.id).unwrap());
}
