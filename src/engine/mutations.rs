use chrono::NaiveDate;
use tracing::{debug, info};

use crate::model::*;
use crate::observability::Operation;
use crate::role::initial_role;
use crate::store::{self, record_path};

use super::conflict::now;
use super::{mutator, observe, BookingError, Engine};

impl Engine {
    /// Book a slot for the signed-in user. The student email is always the
    /// signed-in identity's, whatever the request carries.
    pub async fn create_booking(&self, mut request: BookingRequest) -> Result<Booking, BookingError> {
        observe(Operation::CreateBooking, async {
            let actor = self.current_actor().await?;
            request.student_email = actor.email.clone();

            let _gate = self.write_gate.lock().await;
            let schedule = store::load_schedule(self.store.as_ref()).await?;
            let id = self.store.push(BOOKINGS).await?;
            let booking = mutator::create(
                &schedule.bookings,
                &schedule.blocked,
                &request,
                &actor,
                self.policy,
                id,
                now(),
            )?;
            // User record first: a failure here leaves no booking behind.
            self.ensure_user_record(&actor).await?;
            store::save(self.store.as_ref(), &booking.id, &booking).await?;

            info!(id = %booking.id, date = %booking.date, time = %booking.time, "booking created");
            Ok(booking)
        })
        .await
    }

    pub async fn cancel_booking(&self, id: &str, reason: Option<&str>) -> Result<Booking, BookingError> {
        observe(Operation::CancelBooking, async {
            let actor = self.current_actor().await?;
            let _gate = self.write_gate.lock().await;
            let current = self.load_booking(id).await?;
            let booking = mutator::cancel(&current, id, reason, &actor, now())?;
            store::save(self.store.as_ref(), id, &booking).await?;

            info!(%id, by = %actor.uid, "booking cancelled");
            Ok(booking)
        })
        .await
    }

    pub async fn reschedule_booking(
        &self,
        id: &str,
        new_date: NaiveDate,
        new_time: &str,
        reason: Option<&str>,
    ) -> Result<Booking, BookingError> {
        observe(Operation::RescheduleBooking, async {
            let actor = self.current_actor().await?;
            let _gate = self.write_gate.lock().await;
            let bookings: Vec<Booking> = store::load(self.store.as_ref()).await?;
            let booking = mutator::reschedule(
                &bookings,
                id,
                new_date,
                new_time,
                reason,
                &actor,
                self.policy,
                now(),
            )?;
            store::save(self.store.as_ref(), id, &booking).await?;

            info!(%id, date = %booking.date, time = %booking.time, "booking rescheduled");
            Ok(booking)
        })
        .await
    }

    pub async fn modify_booking(&self, id: &str, changes: &BookingChanges) -> Result<Booking, BookingError> {
        observe(Operation::ModifyBooking, async {
            let actor = self.current_actor().await?;
            let _gate = self.write_gate.lock().await;
            let current = self.load_booking(id).await?;
            let booking = mutator::modify(&current, id, changes, &actor, now())?;
            store::save(self.store.as_ref(), id, &booking).await?;

            info!(%id, "booking details modified");
            Ok(booking)
        })
        .await
    }

    pub async fn add_blocked_period(&self, request: &BlockRequest) -> Result<BlockedPeriod, BookingError> {
        observe(Operation::AddBlockedPeriod, async {
            let actor = self.current_actor().await?;
            let _gate = self.write_gate.lock().await;
            let id = self.store.push(BLOCKED_PERIODS).await?;
            let period = mutator::add_blocked_period(request, &actor, id, now())?;
            store::save(self.store.as_ref(), &period.id, &period).await?;

            info!(id = %period.id, start = %period.start_date, end = %period.end_date, "period blocked");
            Ok(period)
        })
        .await
    }

    /// Hard-delete a blocked period. An unknown id succeeds with
    /// [`Removal::Missing`].
    pub async fn remove_blocked_period(&self, id: &str) -> Result<Removal, BookingError> {
        observe(Operation::RemoveBlockedPeriod, async {
            let actor = self.current_actor().await?;
            let _gate = self.write_gate.lock().await;
            let periods: Vec<BlockedPeriod> = store::load(self.store.as_ref()).await?;
            let removal = mutator::remove_blocked_period(&periods, id, &actor)?;
            match removal {
                Removal::Removed => {
                    self.store.remove(&record_path(BLOCKED_PERIODS, id)).await?;
                    info!(%id, "blocked period removed");
                }
                Removal::Missing => debug!(%id, "blocked period already absent"),
            }
            Ok(removal)
        })
        .await
    }

    /// Single-record snapshot for operations that only touch one booking.
    async fn load_booking(&self, id: &str) -> Result<Vec<Booking>, BookingError> {
        let booking: Option<Booking> = store::load_one(self.store.as_ref(), id).await?;
        Ok(booking.into_iter().collect())
    }

    /// The user record is written once; an existing role is never revoked.
    async fn ensure_user_record(&self, actor: &Actor) -> Result<(), BookingError> {
        if store::load_user(self.store.as_ref(), &actor.uid).await?.is_some() {
            return Ok(());
        }
        let user = UserRecord {
            email: actor.email.clone(),
            role: initial_role(&actor.email, &self.allow_list),
            created_at: now(),
        };
        store::save_user(self.store.as_ref(), &actor.uid, &user).await?;
        debug!(uid = %actor.uid, role = ?user.role, "user record created");
        Ok(())
    }
}
