use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::warn;
use ulid::Ulid;

use crate::model::*;
use crate::notify::NotifyHub;

#[derive(Debug)]
pub enum StoreError {
    InvalidPath(String),
    InvalidValue(&'static str),
    Codec(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InvalidPath(p) => write!(f, "invalid store path: {p:?}"),
            StoreError::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            StoreError::Codec(e) => write!(f, "record codec error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Codec(e)
    }
}

/// A change to one collection. `key: None` means the whole collection was
/// replaced; `value: None` means the record (or collection) was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent {
    pub collection: String,
    pub key: Option<RecordId>,
    pub value: Option<Value>,
}

/// Realtime document store the booking core runs against.
///
/// Paths are `collection` or `collection/key`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Write a value. Writing `null` removes the target.
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Generate a fresh key under `collection`. Nothing is written.
    async fn push(&self, collection: &str) -> Result<RecordId, StoreError>;

    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    fn subscribe(&self, collection: &str) -> Result<broadcast::Receiver<StoreEvent>, StoreError>;
}

struct Location<'a> {
    collection: &'a str,
    key: Option<&'a str>,
}

fn parse_path(path: &str) -> Result<Location<'_>, StoreError> {
    let mut parts = path.trim_matches('/').split('/');
    let collection = parts.next().filter(|s| !s.is_empty());
    let key = parts.next();
    match (collection, key, parts.next()) {
        (Some(collection), None, None) => Ok(Location { collection, key: None }),
        (Some(collection), Some(key), None) if !key.is_empty() => Ok(Location {
            collection,
            key: Some(key),
        }),
        _ => Err(StoreError::InvalidPath(path.to_string())),
    }
}

pub fn record_path(collection: &str, key: &str) -> String {
    format!("{collection}/{key}")
}

/// In-memory document store with push-based change notification.
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<RecordId, Value>>,
    notify: NotifyHub,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(NotifyHub::default())
    }
}

impl MemoryStore {
    pub fn new(notify: NotifyHub) -> Self {
        Self {
            collections: DashMap::new(),
            notify,
        }
    }

    /// Load a whole tree shaped like a realtime-database export:
    /// `{ "collection": { "key": { ...record } } }`.
    pub fn from_json(tree: Value, notify: NotifyHub) -> Result<Self, StoreError> {
        let store = Self::new(notify);
        let Value::Object(root) = tree else {
            return Err(StoreError::InvalidValue("export root must be an object"));
        };
        for (collection, records) in root {
            let Value::Object(records) = records else {
                return Err(StoreError::InvalidValue("collection must be an object"));
            };
            store
                .collections
                .insert(collection, records.into_iter().collect());
        }
        Ok(store)
    }

    /// Export the whole tree in the same shape `from_json` reads.
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        for entry in self.collections.iter() {
            if entry.value().is_empty() {
                continue;
            }
            let records: Map<String, Value> = entry
                .value()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            root.insert(entry.key().clone(), Value::Object(records));
        }
        Value::Object(root)
    }

    pub fn record_count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }

    fn remove_location(&self, loc: &Location<'_>) {
        let removed = match loc.key {
            Some(key) => self
                .collections
                .get_mut(loc.collection)
                .is_some_and(|mut c| c.remove(key).is_some()),
            None => self.collections.remove(loc.collection).is_some(),
        };
        if removed {
            self.notify.send(&StoreEvent {
                collection: loc.collection.to_string(),
                key: loc.key.map(str::to_string),
                value: None,
            });
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let loc = parse_path(path)?;
        let Some(records) = self.collections.get(loc.collection) else {
            return Ok(None);
        };
        Ok(match loc.key {
            Some(key) => records.get(key).cloned(),
            None if records.is_empty() => None,
            None => Some(Value::Object(
                records.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
        })
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let loc = parse_path(path)?;
        if value.is_null() {
            self.remove_location(&loc);
            return Ok(());
        }
        match loc.key {
            Some(key) => {
                self.collections
                    .entry(loc.collection.to_string())
                    .or_default()
                    .insert(key.to_string(), value.clone());
            }
            None => {
                let Value::Object(records) = value.clone() else {
                    return Err(StoreError::InvalidValue("collection must be an object"));
                };
                self.collections
                    .insert(loc.collection.to_string(), records.into_iter().collect());
            }
        }
        self.notify.send(&StoreEvent {
            collection: loc.collection.to_string(),
            key: loc.key.map(str::to_string),
            value: Some(value),
        });
        Ok(())
    }

    async fn push(&self, collection: &str) -> Result<RecordId, StoreError> {
        let loc = parse_path(collection)?;
        if loc.key.is_some() {
            return Err(StoreError::InvalidPath(collection.to_string()));
        }
        Ok(Ulid::new().to_string())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let loc = parse_path(path)?;
        self.remove_location(&loc);
        Ok(())
    }

    fn subscribe(&self, collection: &str) -> Result<broadcast::Receiver<StoreEvent>, StoreError> {
        let loc = parse_path(collection)?;
        if loc.key.is_some() {
            return Err(StoreError::InvalidPath(collection.to_string()));
        }
        Ok(self.notify.subscribe(loc.collection))
    }
}

// ── Typed access ─────────────────────────────────────────

/// A record kept under a store-assigned key.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;

    fn set_id(&mut self, id: RecordId);
}

impl Record for Booking {
    const COLLECTION: &'static str = BOOKINGS;

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}

impl Record for BlockedPeriod {
    const COLLECTION: &'static str = BLOCKED_PERIODS;

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}

/// Decode every record of a collection snapshot. Records that do not decode
/// are skipped with a warning.
pub fn decode_records<T: Record>(snapshot: Option<Value>) -> Vec<T> {
    let Some(Value::Object(records)) = snapshot else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(records.len());
    for (key, value) in records {
        match serde_json::from_value::<T>(value) {
            Ok(mut record) => {
                record.set_id(key);
                out.push(record);
            }
            Err(e) => {
                warn!(collection = T::COLLECTION, %key, "skipping undecodable record: {e}");
            }
        }
    }
    out
}

pub async fn load<T: Record, S: DocumentStore + ?Sized>(store: &S) -> Result<Vec<T>, StoreError> {
    Ok(decode_records(store.get(T::COLLECTION).await?))
}

pub async fn load_one<T: Record, S: DocumentStore + ?Sized>(
    store: &S,
    id: &str,
) -> Result<Option<T>, StoreError> {
    let Some(value) = store.get(&record_path(T::COLLECTION, id)).await? else {
        return Ok(None);
    };
    let mut record: T = serde_json::from_value(value)?;
    record.set_id(id.to_string());
    Ok(Some(record))
}

pub async fn save<T: Record, S: DocumentStore + ?Sized>(
    store: &S,
    id: &str,
    record: &T,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(record)?;
    store.set(&record_path(T::COLLECTION, id), value).await
}

pub async fn load_schedule<S: DocumentStore + ?Sized>(store: &S) -> Result<Schedule, StoreError> {
    Ok(Schedule {
        bookings: load(store).await?,
        blocked: load(store).await?,
    })
}

pub async fn load_user<S: DocumentStore + ?Sized>(
    store: &S,
    uid: &str,
) -> Result<Option<UserRecord>, StoreError> {
    match store.get(&record_path(USERS, uid)).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub async fn save_user<S: DocumentStore + ?Sized>(
    store: &S,
    uid: &str,
    user: &UserRecord,
) -> Result<(), StoreError> {
    store
        .set(&record_path(USERS, uid), serde_json::to_value(user)?)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_remove_record() {
        let store = MemoryStore::default();
        store
            .set("blocked_periods/p1", json!({"reason": "Exams"}))
            .await
            .unwrap();

        let got = store.get("blocked_periods/p1").await.unwrap();
        assert_eq!(got, Some(json!({"reason": "Exams"})));

        let whole = store.get("blocked_periods").await.unwrap().unwrap();
        assert_eq!(whole, json!({"p1": {"reason": "Exams"}}));

        store.remove("blocked_periods/p1").await.unwrap();
        assert_eq!(store.get("blocked_periods/p1").await.unwrap(), None);
        assert_eq!(store.get("blocked_periods").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_null_removes() {
        let store = MemoryStore::default();
        store.set("users/u1", json!({"email": "a@x.edu"})).await.unwrap();
        store.set("users/u1", Value::Null).await.unwrap();
        assert_eq!(store.record_count("users"), 0);
    }

    #[tokio::test]
    async fn push_generates_distinct_keys_without_writing() {
        let store = MemoryStore::default();
        let a = store.push("counseling_bookings").await.unwrap();
        let b = store.push("counseling_bookings").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.record_count("counseling_bookings"), 0);
        assert!(store.push("counseling_bookings/x").await.is_err());
    }

    #[tokio::test]
    async fn invalid_paths_rejected() {
        let store = MemoryStore::default();
        for path in ["", "/", "a/b/c", "a//b"] {
            assert!(
                matches!(store.get(path).await, Err(StoreError::InvalidPath(_))),
                "path {path:?} should be rejected"
            );
        }
        assert!(store.subscribe("users/u1").is_err());
    }

    #[tokio::test]
    async fn subscribers_see_writes_and_removals() {
        let store = MemoryStore::default();
        let mut rx = store.subscribe("counseling_bookings").unwrap();

        store
            .set("counseling_bookings/b1", json!({"time": "10:00 – 11:00"}))
            .await
            .unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.key.as_deref(), Some("b1"));
        assert!(ev.value.is_some());

        store.remove("counseling_bookings/b1").await.unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.value, None);

        // Removing something absent is silent.
        store.remove("counseling_bookings/b1").await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn json_import_export() {
        let tree = json!({
            "blocked_periods": {
                "p1": {
                    "start_date": "2025-01-06",
                    "end_date": "2025-01-10",
                    "reason": "Exams",
                    "created_by": "uid-admin",
                    "created_at": "2025-01-01T00:00:00Z"
                }
            },
            "users": { "uid-admin": { "email": "admin@x.edu", "role": "admin", "created_at": "2025-01-01T00:00:00Z" } }
        });
        let store = MemoryStore::from_json(tree.clone(), NotifyHub::default()).unwrap();
        assert_eq!(store.to_json(), tree);

        let periods: Vec<BlockedPeriod> = load(&store).await.unwrap();
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].id, "p1");

        let user = load_user(&store, "uid-admin").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);

        assert!(MemoryStore::from_json(json!([1, 2]), NotifyHub::default()).is_err());
    }

    #[test]
    fn undecodable_records_are_skipped() {
        let snapshot = json!({
            "good": {
                "start_date": "2025-01-06",
                "end_date": "2025-01-06",
                "reason": "Holiday",
                "created_by": "uid-admin",
                "created_at": "2025-01-01T00:00:00Z"
            },
            "bad": { "start_date": "not a date" }
        });
        let periods: Vec<BlockedPeriod> = decode_records(Some(snapshot));
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].id, "good");
    }
}
