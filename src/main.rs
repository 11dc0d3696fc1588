use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use counsel::cache::LiveSchedule;
use counsel::config::Config;
use counsel::engine::{week_view, SlotState};
use counsel::model::Schedule;
use counsel::notify::NotifyHub;
use counsel::store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    counsel::observability::init(config.metrics_port)?;

    let notify = NotifyHub::new(config.event_buffer);
    let store = match &config.seed_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let store = MemoryStore::from_json(serde_json::from_str(&raw)?, notify)?;
            info!("seeded store from {}", path.display());
            store
        }
        None => MemoryStore::new(notify),
    };
    let store = Arc::new(store);

    info!("counsel started");
    info!("  admins on allow-list: {}", config.admin_emails.len());
    info!("  catalog policy: {:?}", config.catalog_policy);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let live = LiveSchedule::spawn(store.clone()).await?;
    log_week(&live.snapshot().await);
    let mut changes = live.changes();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    warn!("schedule refresh stopped");
                    break;
                }
                log_week(&live.snapshot().await);
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    if let Some(path) = &config.export_file {
        std::fs::write(path, serde_json::to_string_pretty(&store.to_json())?)?;
        info!("exported store to {}", path.display());
    }

    info!("counsel stopped");
    Ok(())
}

/// Current week at a glance, one line per session day, then the blocked periods.
fn log_week(schedule: &Schedule) {
    let today = Local::now().date_naive();
    let week = week_view(schedule, today);
    info!(
        "week {} – {}: {} slots, {} booked, {} blocked, {} available",
        week.monday,
        week.friday,
        week.summary.total,
        week.summary.booked,
        week.summary.blocked,
        week.summary.available
    );
    for day in &week.days {
        let slots: Vec<String> = day
            .slots
            .iter()
            .map(|s| match s.state {
                SlotState::Booked(b) => format!("{} booked ({})", s.time, b.student_id),
                other => format!("{} {}", s.time, other.label()),
            })
            .collect();
        info!("  {} {}: {}", day.date.format("%a"), day.date, slots.join(", "));
    }
    for p in &schedule.blocked {
        info!(
            "  blocked {} – {} ({} days, {}): {}",
            p.start_date,
            p.end_date,
            p.days(),
            if p.is_active(today) { "active" } else { "expired" },
            p.reason
        );
    }
}

/// Resolves on ctrl-c, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
