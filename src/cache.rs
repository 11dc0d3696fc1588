use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model::*;
use crate::observability::{ACTIVE_BOOKINGS, CACHE_REFRESHES_TOTAL, STORE_EVENTS_TOTAL};
use crate::store::{self, DocumentStore, StoreError, StoreEvent};

/// Bookings and blocked periods kept current from store notifications.
///
/// The snapshot is a cache; the store stays authoritative. Dropping the
/// `LiveSchedule` stops the refresh task.
pub struct LiveSchedule {
    schedule: Arc<RwLock<Schedule>>,
    version: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl LiveSchedule {
    /// Subscribe, load both collections, and start refreshing.
    pub async fn spawn(store: Arc<dyn DocumentStore>) -> Result<Self, StoreError> {
        // Subscribe before the initial load so no change slips in between.
        let bookings_rx = store.subscribe(BOOKINGS)?;
        let blocked_rx = store.subscribe(BLOCKED_PERIODS)?;
        let initial = store::load_schedule(store.as_ref()).await?;
        record_active(&initial);

        let schedule = Arc::new(RwLock::new(initial));
        let (version_tx, version) = watch::channel(0);
        let task = tokio::spawn(refresh_loop(
            store,
            schedule.clone(),
            bookings_rx,
            blocked_rx,
            version_tx,
        ));
        Ok(Self {
            schedule,
            version,
            task,
        })
    }

    pub async fn snapshot(&self) -> Schedule {
        self.schedule.read().await.clone()
    }

    /// Bumped after every refresh.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.version.clone()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }
}

impl Drop for LiveSchedule {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn refresh_loop(
    store: Arc<dyn DocumentStore>,
    schedule: Arc<RwLock<Schedule>>,
    mut bookings_rx: broadcast::Receiver<StoreEvent>,
    mut blocked_rx: broadcast::Receiver<StoreEvent>,
    version: watch::Sender<u64>,
) {
    loop {
        let collection = tokio::select! {
            r = bookings_rx.recv() => match settle(r, &mut bookings_rx) {
                Some(()) => BOOKINGS,
                None => break,
            },
            r = blocked_rx.recv() => match settle(r, &mut blocked_rx) {
                Some(()) => BLOCKED_PERIODS,
                None => break,
            },
        };
        metrics::counter!(STORE_EVENTS_TOTAL, "collection" => collection).increment(1);

        if let Err(e) = reload(store.as_ref(), &schedule, collection).await {
            warn!(collection, "schedule refresh failed: {e}");
            continue;
        }
        metrics::counter!(CACHE_REFRESHES_TOTAL, "collection" => collection).increment(1);
        version.send_modify(|v| *v += 1);
        debug!(collection, "schedule refreshed");
    }
    debug!("store closed, schedule refresh stopped");
}

/// Fold a received event and everything already queued behind it into one
/// reload. `None` once the channel is closed.
fn settle(
    first: Result<StoreEvent, RecvError>,
    rx: &mut broadcast::Receiver<StoreEvent>,
) -> Option<()> {
    match first {
        Ok(_) => {}
        Err(RecvError::Lagged(n)) => debug!("schedule refresh lagged by {n} events"),
        Err(RecvError::Closed) => return None,
    }
    loop {
        match rx.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) => return Some(()),
            Err(TryRecvError::Closed) => return None,
        }
    }
}

async fn reload(
    store: &dyn DocumentStore,
    schedule: &RwLock<Schedule>,
    collection: &str,
) -> Result<(), StoreError> {
    if collection == BOOKINGS {
        let bookings: Vec<Booking> = store::load(store).await?;
        let mut guard = schedule.write().await;
        guard.bookings = bookings;
        record_active(&guard);
    } else {
        let blocked: Vec<BlockedPeriod> = store::load(store).await?;
        schedule.write().await.blocked = blocked;
    }
    Ok(())
}

fn record_active(schedule: &Schedule) {
    let active = schedule.bookings.iter().filter(|b| b.is_active()).count();
    metrics::gauge!(ACTIVE_BOOKINGS).set(active as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    async fn wait_for_version(live: &LiveSchedule, at_least: u64) {
        let mut rx = live.changes();
        tokio::time::timeout(Duration::from_secs(2), async {
            while *rx.borrow_and_update() < at_least {
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("schedule did not refresh in time");
    }

    fn period(start: &str, end: &str) -> serde_json::Value {
        json!({
            "start_date": start,
            "end_date": end,
            "reason": "Exams",
            "created_by": "uid-admin",
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn initial_load_and_refresh() {
        let store = Arc::new(MemoryStore::default());
        store
            .set("blocked_periods/p1", period("2025-01-06", "2025-01-10"))
            .await
            .unwrap();

        let live = LiveSchedule::spawn(store.clone()).await.unwrap();
        assert_eq!(live.snapshot().await.blocked.len(), 1);
        assert_eq!(live.version(), 0);

        store
            .set("blocked_periods/p2", period("2025-02-01", "2025-02-02"))
            .await
            .unwrap();
        wait_for_version(&live, 1).await;
        assert_eq!(live.snapshot().await.blocked.len(), 2);

        store.remove("blocked_periods/p1").await.unwrap();
        store.remove("blocked_periods/p2").await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while !live.snapshot().await.blocked.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("removals not observed");
    }

    #[tokio::test]
    async fn undecodable_writes_do_not_stop_refresh() {
        let store = Arc::new(MemoryStore::default());
        let live = LiveSchedule::spawn(store.clone()).await.unwrap();

        store
            .set("counseling_bookings/junk", json!({"date": 42}))
            .await
            .unwrap();
        wait_for_version(&live, 1).await;
        assert!(live.snapshot().await.bookings.is_empty());

        store
            .set("blocked_periods/p1", period("2025-01-06", "2025-01-06"))
            .await
            .unwrap();
        wait_for_version(&live, 2).await;
        assert_eq!(live.snapshot().await.blocked.len(), 1);
    }
}
