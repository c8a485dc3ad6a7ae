//! Booking notification seam.
//!
//! # Invariants
//! - Dispatch is fire-and-forget from the service's point of view: a failed
//!   dispatch is logged and never changes the outcome of a committed write.
//! - Notices carry identifiers and status only, never booking details.

use crate::model::booking::{Booking, BookingId, BookingStatus, BookingType};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// What happened to the booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Confirmation,
    Cancellation,
    /// Upcoming trip; sent on request, never by a transition.
    Reminder,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::Cancellation => "cancellation",
            Self::Reminder => "reminder",
        }
    }

    /// Notice emitted after a committed move into `status`, if any.
    pub fn for_status(status: BookingStatus) -> Option<Self> {
        match status {
            BookingStatus::Confirmed => Some(Self::Confirmation),
            BookingStatus::Cancelled => Some(Self::Cancellation),
            BookingStatus::Pending | BookingStatus::Completed => None,
        }
    }
}

/// Message handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingNotice {
    pub kind: NoticeKind,
    pub booking_id: BookingId,
    pub user_id: String,
    pub booking_type: BookingType,
    pub reference_id: String,
    pub status: BookingStatus,
}

impl BookingNotice {
    pub fn from_booking(kind: NoticeKind, booking: &Booking) -> Self {
        Self {
            kind,
            booking_id: booking.id,
            user_id: booking.user_id.clone(),
            booking_type: booking.kind,
            reference_id: booking.reference_id.clone(),
            status: booking.status,
        }
    }
}

/// Delivery failure reported by a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError(pub String);

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification failed: {}", self.0)
    }
}

impl Error for NotifyError {}

/// Outbound booking messages (email, push).
pub trait NotificationDispatcher {
    fn dispatch(&self, notice: &BookingNotice) -> Result<(), NotifyError>;
}

/// Drops every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl NotificationDispatcher for NoopDispatcher {
    fn dispatch(&self, _notice: &BookingNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Records each notice as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn dispatch(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
        info!(
            "event=booking_notice module=notify status=ok kind={} booking_id={} booking_type={} booking_status={}",
            notice.kind.as_str(),
            notice.booking_id,
            notice.booking_type,
            notice.status
        );
        Ok(())
    }
}
