use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Counter: booking and blocked-period mutations. Labels: op, status.
pub const MUTATIONS_TOTAL: &str = "counsel_mutations_total";

/// Histogram: mutation latency in seconds, store round-trips included. Labels: op.
pub const MUTATION_DURATION_SECONDS: &str = "counsel_mutation_duration_seconds";

/// Counter: change notifications received by the live schedule. Labels: collection.
pub const STORE_EVENTS_TOTAL: &str = "counsel_store_events_total";

/// Counter: live schedule reloads. Labels: collection.
pub const CACHE_REFRESHES_TOTAL: &str = "counsel_cache_refreshes_total";

/// Gauge: non-cancelled bookings in the live schedule.
pub const ACTIVE_BOOKINGS: &str = "counsel_active_bookings";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Engine operations, as labelled in metrics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateBooking,
    CancelBooking,
    RescheduleBooking,
    ModifyBooking,
    AddBlockedPeriod,
    RemoveBlockedPeriod,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::CreateBooking => "create_booking",
            Operation::CancelBooking => "cancel_booking",
            Operation::RescheduleBooking => "reschedule_booking",
            Operation::ModifyBooking => "modify_booking",
            Operation::AddBlockedPeriod => "add_blocked_period",
            Operation::RemoveBlockedPeriod => "remove_blocked_period",
        }
    }
}
