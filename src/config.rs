use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

use crate::engine::CatalogPolicy;
use crate::limits::DEFAULT_EVENT_BUFFER;
use crate::role::AdminAllowList;

pub const DEFAULT_ADMIN_EMAILS: &str = "admin@umail.uom.ac.mu";

/// Runtime settings, read from `COUNSEL_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub admin_emails: AdminAllowList,
    pub metrics_port: Option<u16>,
    /// Realtime-database export to seed the in-memory store from.
    pub seed_file: Option<PathBuf>,
    /// Where to write the store tree on shutdown.
    pub export_file: Option<PathBuf>,
    pub catalog_policy: CatalogPolicy,
    pub event_buffer: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Invalid values fall back to defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let admin_csv = lookup("COUNSEL_ADMIN_EMAILS").unwrap_or_else(|| {
            info!("COUNSEL_ADMIN_EMAILS not set, using default: {DEFAULT_ADMIN_EMAILS}");
            DEFAULT_ADMIN_EMAILS.to_string()
        });
        let admin_emails = AdminAllowList::parse(&admin_csv);
        if admin_emails.is_empty() {
            warn!("admin allow-list is empty; only stored roles grant admin");
        }

        let strict = parse_or(&lookup, "COUNSEL_STRICT_CATALOG", true);
        Self {
            admin_emails,
            metrics_port: parse_opt(&lookup, "COUNSEL_METRICS_PORT"),
            seed_file: lookup("COUNSEL_SEED_FILE").map(PathBuf::from),
            export_file: lookup("COUNSEL_EXPORT_FILE").map(PathBuf::from),
            catalog_policy: if strict {
                CatalogPolicy::Strict
            } else {
                CatalogPolicy::Lenient
            },
            event_buffer: parse_or(&lookup, "COUNSEL_EVENT_BUFFER", DEFAULT_EVENT_BUFFER).max(1),
        }
    }
}

fn parse_opt<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T::Err: Display,
{
    let raw = lookup(key)?;
    raw.trim()
        .parse()
        .map_err(|e| warn!("Invalid {key} value {raw:?}: {e}; ignoring"))
        .ok()
}

fn parse_or<T: FromStr + Display>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T::Err: Display,
{
    if lookup(key).is_none() {
        info!("{key} not set, using default: {default}");
        return default;
    }
    parse_opt(lookup, key).unwrap_or(default)
}
