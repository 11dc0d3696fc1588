//! Pure booking mutations.
//!
//! Every function reads the caller's snapshot and returns the record to
//! write. Nothing here touches the store; ids and timestamps come from the
//! caller.

use chrono::NaiveDate;

use crate::limits::*;
use crate::model::*;

use super::conflict::*;
use super::{BookingError, CatalogPolicy};

/// Validate a booking request against the snapshot and build the new record.
pub fn create(
    bookings: &[Booking],
    blocked: &[BlockedPeriod],
    request: &BookingRequest,
    actor: &Actor,
    policy: CatalogPolicy,
    id: RecordId,
    now: Timestamp,
) -> Result<Booking, BookingError> {
    let date = require_date("date", request.date)?;
    let time = require_text("time", &request.time, MAX_FIELD_LEN)?;
    let student_name = require_text("student_name", &request.student_name, MAX_FIELD_LEN)?;
    let student_id = require_text("student_id", &request.student_id, MAX_FIELD_LEN)?;
    let student_email = require_email(&request.student_email)?;
    let reason = optional_reason(request.reason.as_deref())?.unwrap_or_else(|| DEFAULT_REASON.to_string());

    check_offered(policy, date, &time)?;
    check_not_blocked(blocked, date)?;
    check_slot_free(bookings, date, &time, None)?;

    Ok(Booking {
        id,
        date,
        time,
        student_name,
        student_id,
        student_email,
        reason,
        status: BookingStatus::Booked,
        created_by: actor.uid.clone(),
        created_at: now,
        updated_at: None,
        updated_by: None,
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
        reschedule_reason: None,
    })
}

/// Mark a booking cancelled. Cancelling twice overwrites the reason and
/// timestamp; the status stays cancelled.
pub fn cancel(
    bookings: &[Booking],
    id: &str,
    reason: Option<&str>,
    actor: &Actor,
    now: Timestamp,
) -> Result<Booking, BookingError> {
    require_admin(actor)?;
    let mut booking = find_booking(bookings, id)?.clone();
    booking.status = BookingStatus::Cancelled;
    booking.cancellation_reason = optional_reason(reason)?;
    booking.cancelled_at = Some(now);
    booking.cancelled_by = Some(actor.uid.clone());
    Ok(booking)
}

/// Move a booking to another slot. Moving onto its own slot always succeeds.
#[allow(clippy::too_many_arguments)]
pub fn reschedule(
    bookings: &[Booking],
    id: &str,
    new_date: NaiveDate,
    new_time: &str,
    reason: Option<&str>,
    actor: &Actor,
    policy: CatalogPolicy,
    now: Timestamp,
) -> Result<Booking, BookingError> {
    require_admin(actor)?;
    let mut booking = find_booking(bookings, id)?.clone();
    if !booking.is_active() {
        return Err(BookingError::validation("a cancelled booking cannot be rescheduled"));
    }
    let new_time = require_text("time", new_time, MAX_FIELD_LEN)?;
    check_offered(policy, new_date, &new_time)?;
    if booking.date != new_date || booking.time != new_time {
        check_slot_free(bookings, new_date, &new_time, Some(id))?;
    }

    booking.date = new_date;
    booking.time = new_time;
    if let Some(reason) = optional_reason(reason)? {
        booking.reschedule_reason = Some(reason);
    }
    booking.updated_at = Some(now);
    booking.updated_by = Some(actor.uid.clone());
    Ok(booking)
}

/// Edit a booking's student details. Slot and status are untouched.
pub fn modify(
    bookings: &[Booking],
    id: &str,
    changes: &BookingChanges,
    actor: &Actor,
    now: Timestamp,
) -> Result<Booking, BookingError> {
    require_admin(actor)?;
    let mut booking = find_booking(bookings, id)?.clone();
    if changes.is_empty() {
        return Err(BookingError::validation("no changes given"));
    }
    if let Some(name) = &changes.student_name {
        booking.student_name = require_text("student_name", name, MAX_FIELD_LEN)?;
    }
    if let Some(student_id) = &changes.student_id {
        booking.student_id = require_text("student_id", student_id, MAX_FIELD_LEN)?;
    }
    if let Some(email) = &changes.student_email {
        booking.student_email = require_email(email)?;
    }
    if let Some(reason) = &changes.reason {
        booking.reason = require_text("reason", reason, MAX_REASON_LEN)?;
    }
    booking.updated_at = Some(now);
    booking.updated_by = Some(actor.uid.clone());
    Ok(booking)
}

pub fn add_blocked_period(
    request: &BlockRequest,
    actor: &Actor,
    id: RecordId,
    now: Timestamp,
) -> Result<BlockedPeriod, BookingError> {
    require_admin(actor)?;
    let start_date = require_date("start_date", request.start_date)?;
    let end_date = require_date("end_date", request.end_date)?;
    let reason = require_text("reason", &request.reason, MAX_REASON_LEN)?;
    if start_date > end_date {
        return Err(BookingError::validation("start_date must not be after end_date"));
    }
    Ok(BlockedPeriod {
        id,
        start_date,
        end_date,
        reason,
        created_by: actor.uid.clone(),
        created_at: now,
    })
}

/// Removing an unknown id is not an error; the result says whether it existed.
pub fn remove_blocked_period(
    periods: &[BlockedPeriod],
    id: &str,
    actor: &Actor,
) -> Result<Removal, BookingError> {
    require_admin(actor)?;
    Ok(if periods.iter().any(|p| p.id == id) {
        Removal::Removed
    } else {
        Removal::Missing
    })
}
