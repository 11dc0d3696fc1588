use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned key of a record. Keys are not part of the record body.
pub type RecordId = String;

/// RFC 3339 UTC instant, the only timestamp type.
pub type Timestamp = DateTime<Utc>;

pub const BOOKINGS: &str = "counseling_bookings";
pub const BLOCKED_PERIODS: &str = "blocked_periods";
pub const USERS: &str = "users";

/// Reason recorded when a student leaves the field empty.
pub const DEFAULT_REASON: &str = "General counseling";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// A student's claim on one catalog slot for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    #[serde(skip)]
    pub id: RecordId,
    pub date: NaiveDate,
    pub time: String,
    pub student_name: String,
    pub student_id: String,
    pub student_email: String,
    #[serde(default)]
    pub reason: String,
    pub status: BookingStatus,
    pub created_by: String,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reschedule_reason: Option<String>,
}

impl Booking {
    /// Cancelled bookings never occupy their slot.
    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    pub fn occupies(&self, date: NaiveDate, time: &str) -> bool {
        self.is_active() && self.date == date && self.time == time
    }
}

/// Inclusive date range during which no bookings may be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedPeriod {
    #[serde(skip)]
    pub id: RecordId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub created_by: String,
    pub created_at: Timestamp,
}

impl BlockedPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Still in force on `today`; expired once its end date has passed.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        today <= self.end_date
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: Timestamp,
}

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// An identity with its resolved role. Every mutation is performed by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub uid: String,
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn new(identity: &Identity, role: Role) -> Self {
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Form input for a new booking. Blank strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub date: Option<NaiveDate>,
    pub time: String,
    pub student_name: String,
    pub student_id: String,
    #[serde(default)]
    pub student_email: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Admin edits of a booking's student details. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingChanges {
    pub student_name: Option<String>,
    pub student_id: Option<String>,
    pub student_email: Option<String>,
    pub reason: Option<String>,
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        self.student_name.is_none()
            && self.student_id.is_none()
            && self.student_email.is_none()
            && self.reason.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: String,
}

/// Outcome of removing a blocked period. Removing a missing id still succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Missing,
}

/// Point-in-time copy of both booking collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub bookings: Vec<Booking>,
    pub blocked: Vec<BlockedPeriod>,
}
