mod availability;
mod conflict;
mod error;
pub mod mutator;
mod mutations;
mod queries;

pub use availability::{active_booking_for, is_date_blocked, is_slot_taken, slot_state, SlotState};
pub use error::BookingError;
pub use queries::{analytics, week_monday, week_view, Analytics, DayView, SlotView, WeekSummary, WeekView};

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::warn;

use crate::auth::IdentityProvider;
use crate::model::*;
use crate::observability::{Operation, MUTATIONS_TOTAL, MUTATION_DURATION_SECONDS};
use crate::role::{resolve_role, AdminAllowList};
use crate::store::{self, DocumentStore};

/// Whether booking and reschedule targets must be catalog slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogPolicy {
    /// Reject slot labels the catalog does not offer on that weekday.
    #[default]
    Strict,
    /// Accept any non-blank label.
    Lenient,
}

/// Booking service bound to a document store and an identity provider.
///
/// Every mutation reads a fresh snapshot, runs the pure check in
/// [`mutator`], then writes the returned record. Mutations issued through
/// the same `Engine` are serialized, so they cannot double-book each other.
/// Writers in other processes are not coordinated with; the store stays
/// last-write-wins between them.
pub struct Engine {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    allow_list: AdminAllowList,
    policy: CatalogPolicy,
    write_gate: Mutex<()>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        allow_list: AdminAllowList,
        policy: CatalogPolicy,
    ) -> Self {
        Self {
            store,
            identity,
            allow_list,
            policy,
            write_gate: Mutex::new(()),
        }
    }

    /// The signed-in identity with its resolved role.
    pub async fn current_actor(&self) -> Result<Actor, BookingError> {
        let identity = self
            .identity
            .current()
            .ok_or(BookingError::Authorization("sign-in required"))?;
        let stored = store::load_user(self.store.as_ref(), &identity.uid)
            .await?
            .map(|u| u.role);
        let role = resolve_role(&identity, &self.allow_list, stored);
        Ok(Actor::new(&identity, role))
    }

    /// False when nobody is signed in.
    pub async fn is_admin(&self) -> Result<bool, BookingError> {
        if self.identity.current().is_none() {
            return Ok(false);
        }
        Ok(self.current_actor().await?.is_admin())
    }
}

/// Record outcome and latency of one operation; log rejections.
async fn observe<T, F>(op: Operation, fut: F) -> Result<T, BookingError>
where
    F: Future<Output = Result<T, BookingError>>,
{
    let start = Instant::now();
    let result = fut.await;
    let status = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::counter!(MUTATIONS_TOTAL, "op" => op.label(), "status" => status).increment(1);
    metrics::histogram!(MUTATION_DURATION_SECONDS, "op" => op.label())
        .record(start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        warn!(op = op.label(), "rejected: {e}");
    }
    result
}
