use chrono::NaiveDate;

use crate::model::*;

// ── Availability predicates ──────────────────────────────────────

/// True iff a non-cancelled booking other than `exclude` holds `(date, time)`.
///
/// `exclude` lets a booking be moved onto its own slot without colliding
/// with itself.
pub fn is_slot_taken(bookings: &[Booking], date: NaiveDate, time: &str, exclude: Option<&str>) -> bool {
    bookings
        .iter()
        .filter(|b| exclude != Some(b.id.as_str()))
        .any(|b| b.occupies(date, time))
}

/// True iff `date` falls inside any period, both ends inclusive.
pub fn is_date_blocked(periods: &[BlockedPeriod], date: NaiveDate) -> bool {
    periods.iter().any(|p| p.contains(date))
}

/// The booking currently occupying a slot, if any.
pub fn active_booking_for<'a>(bookings: &'a [Booking], date: NaiveDate, time: &str) -> Option<&'a Booking> {
    bookings.iter().find(|b| b.occupies(date, time))
}

/// How a single slot should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState<'a> {
    Available,
    Booked(&'a Booking),
    Blocked,
}

impl SlotState<'_> {
    pub fn is_available(&self) -> bool {
        matches!(self, SlotState::Available)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SlotState::Available => "available",
            SlotState::Booked(_) => "booked",
            SlotState::Blocked => "blocked",
        }
    }
}

/// Booked wins over blocked: an existing booking inside a later block is
/// still shown as booked.
pub fn slot_state<'a>(
    bookings: &'a [Booking],
    blocked: &[BlockedPeriod],
    date: NaiveDate,
    time: &str,
) -> SlotState<'a> {
    if let Some(booking) = active_booking_for(bookings, date, time) {
        SlotState::Booked(booking)
    } else if is_date_blocked(blocked, date) {
        SlotState::Blocked
    } else {
        SlotState::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T10: &str = "10:00 – 11:00";
    const T1130: &str = "11:30 – 12:00";

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn booking(id: &str, day: &str, time: &str, status: BookingStatus) -> Booking {
        Booking {
            id: id.into(),
            date: date(day),
            time: time.into(),
            student_name: "Student".into(),
            student_id: "240000".into(),
            student_email: "s@umail.uom.ac.mu".into(),
            reason: DEFAULT_REASON.into(),
            status,
            created_by: "uid-s".into(),
            created_at: "2025-01-01T00:00:00Z".parse().unwrap(),
            updated_at: None,
            updated_by: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            reschedule_reason: None,
        }
    }

    fn block(start: &str, end: &str) -> BlockedPeriod {
        BlockedPeriod {
            id: "p1".into(),
            start_date: date(start),
            end_date: date(end),
            reason: "Exams".into(),
            created_by: "uid-admin".into(),
            created_at: "2025-01-01T00:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn taken_by_active_booking() {
        let bookings = vec![booking("b1", "2025-01-07", T10, BookingStatus::Booked)];
        assert!(is_slot_taken(&bookings, date("2025-01-07"), T10, None));
        assert!(!is_slot_taken(&bookings, date("2025-01-07"), T1130, None));
        assert!(!is_slot_taken(&bookings, date("2025-01-10"), T10, None));
    }

    #[test]
    fn cancelled_occupant_frees_slot() {
        let bookings = vec![booking("b1", "2025-01-07", T10, BookingStatus::Cancelled)];
        assert!(!is_slot_taken(&bookings, date("2025-01-07"), T10, None));
    }

    #[test]
    fn exclude_ignores_self() {
        let bookings = vec![booking("b1", "2025-01-07", T10, BookingStatus::Booked)];
        assert!(!is_slot_taken(&bookings, date("2025-01-07"), T10, Some("b1")));
        assert!(is_slot_taken(&bookings, date("2025-01-07"), T10, Some("b2")));
    }

    #[test]
    fn exclude_does_not_hide_other_occupant() {
        let bookings = vec![
            booking("b1", "2025-01-07", T10, BookingStatus::Cancelled),
            booking("b2", "2025-01-07", T10, BookingStatus::Booked),
        ];
        assert!(is_slot_taken(&bookings, date("2025-01-07"), T10, Some("b1")));
    }

    #[test]
    fn blocked_boundaries_inclusive() {
        let periods = vec![block("2025-01-06", "2025-01-10")];
        assert!(is_date_blocked(&periods, date("2025-01-06")));
        assert!(is_date_blocked(&periods, date("2025-01-10")));
        assert!(!is_date_blocked(&periods, date("2025-01-05")));
        assert!(!is_date_blocked(&periods, date("2025-01-11")));
        assert!(!is_date_blocked(&[], date("2025-01-08")));
    }

    #[test]
    fn single_day_block() {
        let periods = vec![block("2025-03-14", "2025-03-14")];
        assert!(is_date_blocked(&periods, date("2025-03-14")));
        assert!(!is_date_blocked(&periods, date("2025-03-13")));
        assert!(!is_date_blocked(&periods, date("2025-03-15")));
    }

    #[test]
    fn slot_state_precedence() {
        let bookings = vec![booking("b1", "2025-01-07", T10, BookingStatus::Booked)];
        let periods = vec![block("2025-01-06", "2025-01-10")];

        let booked = slot_state(&bookings, &periods, date("2025-01-07"), T10);
        assert!(matches!(booked, SlotState::Booked(b) if b.id == "b1"));

        let blocked = slot_state(&bookings, &periods, date("2025-01-07"), T1130);
        assert_eq!(blocked, SlotState::Blocked);

        let free = slot_state(&bookings, &periods, date("2025-01-14"), T10);
        assert!(free.is_available());
        assert_eq!(free.label(), "available");
    }
}
