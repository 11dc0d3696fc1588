use chrono::{NaiveDate, Utc};

use crate::catalog;
use crate::limits::*;
use crate::model::*;

use super::availability::{is_date_blocked, is_slot_taken};
use super::{BookingError, CatalogPolicy};

pub(crate) fn now() -> Timestamp {
    Utc::now()
}

/// Trimmed, non-blank, bounded text.
pub(crate) fn require_text(field: &str, value: &str, max_len: usize) -> Result<String, BookingError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BookingError::validation(format!("{field} is required")));
    }
    if value.len() > max_len {
        return Err(BookingError::validation(format!("{field} is too long")));
    }
    Ok(value.to_string())
}

pub(crate) fn require_email(value: &str) -> Result<String, BookingError> {
    let email = require_text("student_email", value, MAX_FIELD_LEN)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(BookingError::validation("student_email is malformed")),
    }
}

/// A blank reason becomes `None`; anything else is trimmed and bounded.
pub(crate) fn optional_reason(value: Option<&str>) -> Result<Option<String>, BookingError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(r) if r.len() > MAX_REASON_LEN => Err(BookingError::validation("reason is too long")),
        Some(r) => Ok(Some(r.to_string())),
    }
}

pub(crate) fn require_date(field: &str, value: Option<NaiveDate>) -> Result<NaiveDate, BookingError> {
    value.ok_or_else(|| BookingError::validation(format!("{field} is required")))
}

pub(crate) fn require_admin(actor: &Actor) -> Result<(), BookingError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(BookingError::Authorization("admin privileges required"))
    }
}

pub(crate) fn check_offered(policy: CatalogPolicy, date: NaiveDate, time: &str) -> Result<(), BookingError> {
    if policy == CatalogPolicy::Strict && !catalog::offers(date, time) {
        return Err(BookingError::validation(format!(
            "no session \"{time}\" is offered on {date}"
        )));
    }
    Ok(())
}

pub(crate) fn check_not_blocked(blocked: &[BlockedPeriod], date: NaiveDate) -> Result<(), BookingError> {
    if is_date_blocked(blocked, date) {
        return Err(BookingError::DateBlocked(date));
    }
    Ok(())
}

pub(crate) fn check_slot_free(
    bookings: &[Booking],
    date: NaiveDate,
    time: &str,
    exclude: Option<&str>,
) -> Result<(), BookingError> {
    if is_slot_taken(bookings, date, time, exclude) {
        return Err(BookingError::SlotTaken {
            date,
            time: time.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn find_booking<'a>(bookings: &'a [Booking], id: &str) -> Result<&'a Booking, BookingError> {
    bookings
        .iter()
        .find(|b| b.id == id)
        .ok_or_else(|| BookingError::NotFound(id.to_string()))
}
