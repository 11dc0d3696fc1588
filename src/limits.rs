/// Max length of short text fields (names, student ids, emails, slot labels).
pub const MAX_FIELD_LEN: usize = 256;

/// Max length of free-text reasons (booking, cancellation, reschedule, block).
pub const MAX_REASON_LEN: usize = 2_000;

/// Number of bookings listed as recent activity.
pub const RECENT_ACTIVITY_LEN: usize = 10;

/// Default capacity of per-collection change channels.
pub const DEFAULT_EVENT_BUFFER: usize = 256;
