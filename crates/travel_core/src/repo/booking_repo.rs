//! Booking repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the persistence gateway consumed by `BookingService`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Booking::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it; an
//!   unknown `status` token is fatal.
//! - Status writes are conditional on the expected current status.
//! - List order is `created_at DESC` with insertion order as tiebreaker.

use crate::db::DbError;
use crate::model::booking::{
    Booking, BookingDetails, BookingId, BookingPatch, BookingStatus, BookingType,
    BookingValidationError,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

const BOOKING_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    type,
    status,
    reference_id,
    total_price,
    currency,
    booking_details,
    check_in_date,
    check_out_date,
    notes,
    created_at,
    updated_at
FROM bookings";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for booking persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(BookingValidationError),
    Db(DbError),
    NotFound(BookingId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "booking not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted booking data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<BookingValidationError> for RepoError {
    fn from(value: BookingValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Single-field predicate for booking queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingFilter {
    User(String),
    Type(BookingType),
    Status(BookingStatus),
    Reference(String),
}

impl BookingFilter {
    fn where_clause(&self) -> (&'static str, Value) {
        match self {
            Self::User(user_id) => ("user_id = ?1", Value::Text(user_id.clone())),
            Self::Type(kind) => ("type = ?1", Value::Text(kind.as_str().to_string())),
            Self::Status(status) => ("status = ?1", Value::Text(status.as_str().to_string())),
            Self::Reference(reference_id) => {
                ("reference_id = ?1", Value::Text(reference_id.clone()))
            }
        }
    }
}

/// Outcome of a conditional status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWrite {
    /// Stored status matched the expected one and was replaced.
    Applied,
    /// No booking with that id.
    Missing,
    /// Booking exists but its status moved on; carries the stored value.
    Conflict(BookingStatus),
}

/// Persistence gateway for bookings.
pub trait BookingRepository {
    /// Inserts a new booking row. Single-row atomic insert.
    fn insert(&self, booking: &Booking) -> RepoResult<BookingId>;
    /// Gets one booking by id.
    fn get(&self, id: BookingId) -> RepoResult<Option<Booking>>;
    /// Gets the oldest booking matching `filter`.
    fn find_first(&self, filter: &BookingFilter) -> RepoResult<Option<Booking>>;
    /// Lists matching bookings newest first.
    fn find_many(&self, filter: &BookingFilter, offset: u64, limit: u32)
        -> RepoResult<Vec<Booking>>;
    /// Lists every matching booking oldest first.
    fn find_all_ascending(&self, filter: &BookingFilter) -> RepoResult<Vec<Booking>>;
    /// Counts matching bookings.
    fn count(&self, filter: &BookingFilter) -> RepoResult<u64>;
    /// Merges `notes` / `booking_details`. Returns `false` when `id` is unknown.
    fn update_details(&self, id: BookingId, patch: &BookingPatch) -> RepoResult<bool>;
    /// Replaces `expected` with `next` only if the stored status is still `expected`.
    fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> RepoResult<StatusWrite>;
}

/// SQLite-backed booking repository.
pub struct SqliteBookingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookingRepository<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_bookings(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Booking>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut bookings = Vec::new();
        while let Some(row) = rows.next()? {
            bookings.push(parse_booking_row(row)?);
        }
        Ok(bookings)
    }

    fn current_status(&self, id: BookingId) -> RepoResult<Option<BookingStatus>> {
        let status_text: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM bookings WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        status_text.map(|text| parse_status(&text)).transpose()
    }
}

impl BookingRepository for SqliteBookingRepository<'_> {
    fn insert(&self, booking: &Booking) -> RepoResult<BookingId> {
        booking.validate()?;

        self.conn.execute(
            "INSERT INTO bookings (
                id,
                user_id,
                type,
                status,
                reference_id,
                total_price,
                currency,
                booking_details,
                check_in_date,
                check_out_date,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                booking.id.to_string(),
                booking.user_id.as_str(),
                booking.kind.as_str(),
                booking.status.as_str(),
                booking.reference_id.as_str(),
                booking.total_price.to_string(),
                booking.currency.as_str(),
                details_to_db(booking.booking_details.as_ref())?,
                booking.check_in_date,
                booking.check_out_date,
                booking.notes.as_deref(),
            ],
        )?;

        Ok(booking.id)
    }

    fn get(&self, id: BookingId) -> RepoResult<Option<Booking>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOOKING_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_booking_row(row)?));
        }
        Ok(None)
    }

    fn find_first(&self, filter: &BookingFilter) -> RepoResult<Option<Booking>> {
        let (clause, value) = filter.where_clause();
        let sql = format!(
            "{BOOKING_SELECT_SQL} WHERE {clause} ORDER BY created_at ASC, rowid ASC LIMIT 1;"
        );
        Ok(self.query_bookings(&sql, vec![value])?.into_iter().next())
    }

    fn find_many(
        &self,
        filter: &BookingFilter,
        offset: u64,
        limit: u32,
    ) -> RepoResult<Vec<Booking>> {
        let (clause, value) = filter.where_clause();
        let sql = format!(
            "{BOOKING_SELECT_SQL} WHERE {clause}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2 OFFSET ?3;"
        );
        let offset = i64::try_from(offset)
            .map_err(|_| RepoError::InvalidData(format!("offset {offset} out of range")))?;
        self.query_bookings(
            &sql,
            vec![value, Value::Integer(i64::from(limit)), Value::Integer(offset)],
        )
    }

    fn find_all_ascending(&self, filter: &BookingFilter) -> RepoResult<Vec<Booking>> {
        let (clause, value) = filter.where_clause();
        let sql = format!("{BOOKING_SELECT_SQL} WHERE {clause} ORDER BY created_at ASC, rowid ASC;");
        self.query_bookings(&sql, vec![value])
    }

    fn count(&self, filter: &BookingFilter) -> RepoResult<u64> {
        let (clause, value) = filter.where_clause();
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM bookings WHERE {clause};"),
            [value],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }

    fn update_details(&self, id: BookingId, patch: &BookingPatch) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE bookings
             SET
                notes = COALESCE(?2, notes),
                booking_details = COALESCE(?3, booking_details),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                patch.notes.as_deref(),
                details_to_db(patch.booking_details.as_ref())?,
            ],
        )?;
        Ok(changed > 0)
    }

    fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> RepoResult<StatusWrite> {
        let changed = self.conn.execute(
            "UPDATE bookings
             SET
                status = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND status = ?2;",
            params![id.to_string(), expected.as_str(), next.as_str()],
        )?;

        if changed > 0 {
            return Ok(StatusWrite::Applied);
        }

        match self.current_status(id)? {
            None => Ok(StatusWrite::Missing),
            Some(actual) => Ok(StatusWrite::Conflict(actual)),
        }
    }
}

fn parse_booking_row(row: &Row<'_>) -> RepoResult<Booking> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in bookings.id"))
    })?;

    let type_text: String = row.get("type")?;
    let kind = BookingType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid booking type `{type_text}` in bookings.type"))
    })?;

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text)?;

    let price_text: String = row.get("total_price")?;
    let total_price = Decimal::from_str(&price_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid price `{price_text}` in bookings.total_price"
        ))
    })?;

    let booking_details = match row.get::<_, Option<String>>("booking_details")? {
        Some(text) => Some(serde_json::from_str::<BookingDetails>(&text).map_err(|err| {
            RepoError::InvalidData(format!("invalid json in bookings.booking_details: {err}"))
        })?),
        None => None,
    };

    let booking = Booking {
        id,
        user_id: row.get("user_id")?,
        kind,
        status,
        reference_id: row.get("reference_id")?,
        total_price,
        currency: row.get("currency")?,
        booking_details,
        check_in_date: row.get("check_in_date")?,
        check_out_date: row.get("check_out_date")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    booking.validate()?;
    Ok(booking)
}

fn parse_status(value: &str) -> RepoResult<BookingStatus> {
    BookingStatus::parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid booking status `{value}` in bookings.status"))
    })
}

fn details_to_db(details: Option<&BookingDetails>) -> RepoResult<Option<String>> {
    details
        .map(|value| {
            serde_json::to_string(value).map_err(|err| {
                RepoError::InvalidData(format!("booking_details not serializable: {err}"))
            })
        })
        .transpose()
}
