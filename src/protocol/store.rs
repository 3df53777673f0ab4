//! Replicated auth records.
//!
//! Every consuming application reads its own pair of storage keys, so the
//! single logical [`AuthRecord`] is written once per [`Replica`]. Writes fan
//! out to all replicas in one storage batch and reads take one snapshot of
//! all of them, so no reader sees a partial write.

use std::{
    fmt, iter,
    sync::{Arc, OnceLock},
};

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{are_all_cookie_strings_equal, Error, KeyValueStore, ScopedStore, StorageError};

pub const DEFAULT_APPS: [&str; 3] = ["case-management", "customer-portal", "back-office"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    app: String,
    record_key: String,
    cookie_key: String,
}

impl Replica {
    #[must_use]
    pub fn for_app(app: &str) -> Self {
        Self {
            app: app.to_string(),
            record_key: format!("{app}:AuthRecord"),
            cookie_key: format!("{app}:Cookies"),
        }
    }

    #[must_use]
    pub fn app(&self) -> &str {
        &self.app
    }

    #[must_use]
    pub fn record_key(&self) -> &str {
        &self.record_key
    }

    #[must_use]
    pub fn cookie_key(&self) -> &str {
        &self.cookie_key
    }
}

static APP_NAME: OnceLock<Option<Regex>> = OnceLock::new();

pub fn valid_app_name(app: &str) -> bool {
    APP_NAME
        .get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(app))
}

/// The applications holding a copy of the auth record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSet {
    replicas: Vec<Replica>,
}

impl ReplicaSet {
    /// # Errors
    /// Returns an error if no application is given, or a name is not a
    /// lowercase path segment.
    pub fn new<I, S>(apps: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut replicas: Vec<Replica> = Vec::new();

        for app in apps {
            let app = app.as_ref().trim();
            if !valid_app_name(app) {
                return Err(Error::InvalidAppName(app.to_string()));
            }
            if replicas.iter().all(|replica| replica.app != app) {
                replicas.push(Replica::for_app(app));
            }
        }

        if replicas.is_empty() {
            return Err(Error::NoReplicas);
        }

        Ok(Self { replicas })
    }

    #[must_use]
    pub fn find(&self, app: &str) -> Option<&Replica> {
        self.replicas.iter().find(|replica| replica.app == app)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Replica> {
        self.replicas.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }
}

impl Default for ReplicaSet {
    fn default() -> Self {
        Self {
            replicas: DEFAULT_APPS.iter().map(|app| Replica::for_app(app)).collect(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthRecord {
    pub cookies: String,
    pub token: String,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub expiry_time: DateTime<Utc>,
}

impl fmt::Debug for AuthRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRecord")
            .field("cookies", &"***")
            .field("token", &"***")
            .field("expiry_time", &self.expiry_time)
            .finish()
    }
}

fn serialize_iso_millis<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced { source: String },
    UnknownApp,
    NoSourceRecord,
    Failed,
}

impl SyncOutcome {
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self {
            SyncOutcome::Synced { source } => Some(source),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct AuthStore {
    storage: Arc<dyn KeyValueStore>,
    replicas: Arc<ReplicaSet>,
}

impl fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthStore")
            .field("replicas", &self.replicas)
            .finish_non_exhaustive()
    }
}

impl AuthStore {
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, replicas: ReplicaSet) -> Self {
        Self {
            storage,
            replicas: Arc::new(replicas),
        }
    }

    #[must_use]
    pub fn replicas(&self) -> &ReplicaSet {
        &self.replicas
    }

    /// The same replicas, kept apart from every other namespace of the
    /// underlying storage.
    #[must_use]
    pub fn scoped(&self, namespace: &str) -> Self {
        Self {
            storage: Arc::new(ScopedStore::new(self.storage.clone(), namespace)),
            replicas: self.replicas.clone(),
        }
    }

    fn cookie_keys(&self) -> Vec<&str> {
        self.replicas.iter().map(Replica::cookie_key).collect()
    }

    fn replica_batch<'a>(&'a self, record: &'a str, cookies: &'a str) -> Vec<(&'a str, &'a str)> {
        self.replicas
            .iter()
            .flat_map(|replica| [(replica.record_key(), record), (replica.cookie_key(), cookies)])
            .collect()
    }

    /// Write a fresh record, stamped now, into every replica in one batch.
    ///
    /// # Errors
    /// Propagates the storage failure; no replica is written in that case.
    #[instrument(skip_all)]
    pub fn store_auth(&self, cookies: &str, token: &SecretString) -> Result<AuthRecord, StorageError> {
        let record = AuthRecord {
            cookies: cookies.to_string(),
            token: token.expose_secret().to_string(),
            expiry_time: Utc::now(),
        };
        let payload = serde_json::to_string(&record)?;

        self.storage.set_many(&self.replica_batch(&payload, cookies))?;

        debug!("stored auth record in {} replicas", self.replicas.len());

        Ok(record)
    }

    /// True when every replica holds a cookie string equal to `cookies`.
    /// A replica that was never written makes the cache stale.
    ///
    /// # Errors
    /// Propagates storage read failures.
    pub fn is_stored_auth_current(&self, cookies: &str) -> Result<bool, StorageError> {
        let Some(stored) = self
            .storage
            .get_many(&self.cookie_keys())?
            .into_iter()
            .collect::<Option<Vec<String>>>()
        else {
            return Ok(false);
        };

        Ok(are_all_cookie_strings_equal(
            iter::once(cookies.to_string()).chain(stored),
        ))
    }

    /// Read the record held by one application's replica.
    ///
    /// # Errors
    /// Propagates storage failures and malformed JSON.
    pub fn record(&self, app: &str) -> Result<Option<AuthRecord>, StorageError> {
        let Some(replica) = self.replicas.find(app) else {
            return Ok(None);
        };

        match self.storage.get(&replica.record_key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Copy the replica of the application `current_url` belongs to over
    /// every replica. The application is the first path segment.
    #[instrument(skip(self), fields(url = %current_url))]
    pub fn sync_os_auth(&self, current_url: &Url) -> SyncOutcome {
        let Some(source) = current_url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .and_then(|app| self.replicas.find(app))
        else {
            return SyncOutcome::UnknownApp;
        };

        match self.copy_replica(source) {
            Ok(true) => {
                debug!("synced auth replicas from {}", source.app);
                SyncOutcome::Synced {
                    source: source.app.clone(),
                }
            }
            Ok(false) => SyncOutcome::NoSourceRecord,
            Err(err) => {
                warn!("failed to sync auth replicas from {}: {}", source.app, err);
                SyncOutcome::Failed
            }
        }
    }

    fn copy_replica(&self, source: &Replica) -> Result<bool, StorageError> {
        let mut snapshot = self
            .storage
            .get_many(&[source.record_key(), source.cookie_key()])?
            .into_iter();
        let (Some(Some(record)), Some(Some(cookies))) = (snapshot.next(), snapshot.next()) else {
            return Ok(false);
        };

        self.storage.set_many(&self.replica_batch(&record, &cookies))?;

        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::protocol::MemoryStore;
    use serde_json::Value;
    use std::{sync::Mutex, thread};

    /// Records every batch it applies.
    #[derive(Default)]
    struct BatchLog {
        inner: MemoryStore,
        batches: Mutex<Vec<usize>>,
    }

    impl KeyValueStore for BatchLog {
        fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
            self.inner.get_many(keys)
        }

        fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
            self.batches.lock().unwrap().push(entries.len());
            self.inner.set_many(entries)
        }
    }

    fn store() -> (Arc<MemoryStore>, AuthStore) {
        let memory = Arc::new(MemoryStore::new());
        let store = AuthStore::new(memory.clone(), ReplicaSet::default());
        (memory, store)
    }

    #[test]
    fn replica_set_rejects_bad_names() {
        assert!(matches!(ReplicaSet::new(["Case Management"]), Err(Error::InvalidAppName(_))));
        assert!(matches!(ReplicaSet::new(Vec::<String>::new()), Err(Error::NoReplicas)));
    }

    #[test]
    fn replica_set_drops_duplicates() {
        let set = ReplicaSet::new(["crm", "billing", "crm"]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.find("billing").map(Replica::cookie_key), Some("billing:Cookies"));
    }

    #[test]
    fn store_auth_writes_every_replica() {
        let (memory, store) = store();

        store.store_auth("a=1", &SecretString::from("tok".to_string())).unwrap();

        for app in DEFAULT_APPS {
            assert_eq!(memory.get(&format!("{app}:Cookies")).unwrap().as_deref(), Some("a=1"));

            let raw = memory.get(&format!("{app}:AuthRecord")).unwrap().unwrap();
            let json: Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(json["Cookies"], "a=1");
            assert_eq!(json["Token"], "tok");
            let expiry = json["ExpiryTime"].as_str().unwrap();
            assert!(DateTime::parse_from_rfc3339(expiry).is_ok());
            assert!(expiry.ends_with('Z'));
        }

        let record = store.record("back-office").unwrap().unwrap();
        assert_eq!(record.token, "tok");
    }

    #[test]
    fn current_only_when_all_replicas_match() {
        let (memory, store) = store();
        assert!(!store.is_stored_auth_current("a=1").unwrap());

        store.store_auth("a=1; b=2", &SecretString::from("tok".to_string())).unwrap();
        assert!(store.is_stored_auth_current("b=2;a=1").unwrap());

        memory.set("customer-portal:Cookies", "a=1; b=3").unwrap();
        assert!(!store.is_stored_auth_current("a=1; b=2").unwrap());
    }

    #[test]
    fn sync_copies_active_app_over_the_others() {
        let (memory, store) = store();
        store.store_auth("old=1", &SecretString::from("old".to_string())).unwrap();
        memory.set("customer-portal:AuthRecord", "{\"fresh\":true}").unwrap();
        memory.set("customer-portal:Cookies", "new=1").unwrap();

        let url = Url::parse("https://apps.test/customer-portal/Home?x=1").unwrap();
        let outcome = store.sync_os_auth(&url);

        assert_eq!(outcome.source(), Some("customer-portal"));
        for app in DEFAULT_APPS {
            assert_eq!(memory.get(&format!("{app}:Cookies")).unwrap().as_deref(), Some("new=1"));
            assert_eq!(
                memory.get(&format!("{app}:AuthRecord")).unwrap().as_deref(),
                Some("{\"fresh\":true}")
            );
        }
    }

    #[test]
    fn sync_ignores_unknown_or_empty_records() {
        let (memory, store) = store();

        let unknown = Url::parse("https://apps.test/reporting/Home").unwrap();
        assert_eq!(store.sync_os_auth(&unknown), SyncOutcome::UnknownApp);

        let root = Url::parse("https://apps.test/").unwrap();
        assert_eq!(store.sync_os_auth(&root), SyncOutcome::UnknownApp);

        let known = Url::parse("https://apps.test/back-office/").unwrap();
        assert_eq!(store.sync_os_auth(&known), SyncOutcome::NoSourceRecord);
        assert_eq!(memory.get("case-management:Cookies").unwrap(), None);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let record = AuthRecord {
            cookies: "session=abc".to_string(),
            token: "s3cr3t".to_string(),
            expiry_time: Utc::now(),
        };
        let rendered = format!("{record:?}");
        assert!(!rendered.contains("abc"));
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn replica_writes_are_a_single_batch() {
        let log = Arc::new(BatchLog::default());
        let store = AuthStore::new(log.clone(), ReplicaSet::default());

        store.store_auth("a=1", &SecretString::from("tok".to_string())).unwrap();
        store.sync_os_auth(&Url::parse("https://apps.test/back-office/").unwrap());

        assert_eq!(*log.batches.lock().unwrap(), vec![6, 6]);
    }

    #[test]
    fn concurrent_writers_leave_replicas_consistent() {
        let (memory, store) = store();

        let writers: Vec<_> = (0..8)
            .map(|writer| {
                let store = store.clone();
                thread::spawn(move || {
                    for round in 0..50 {
                        let cookies = format!("user={writer}-{round}");
                        let token = SecretString::from(format!("tok-{writer}"));
                        store.store_auth(&cookies, &token).unwrap();
                        store.sync_os_auth(&Url::parse("https://apps.test/customer-portal/").unwrap());
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let winner = memory.get("case-management:Cookies").unwrap().unwrap();
        assert!(store.is_stored_auth_current(&winner).unwrap());
        for app in DEFAULT_APPS {
            let record = store.record(app).unwrap().unwrap();
            assert_eq!(record.cookies, winner);
        }
    }

    #[test]
    fn scoped_stores_do_not_share_records() {
        let (memory, store) = store();
        let victim = store.scoped("victim");
        let other = store.scoped("other");

        victim.store_auth("sid=victim", &SecretString::from("v".to_string())).unwrap();
        other.store_auth("sid=other", &SecretString::from("o".to_string())).unwrap();

        assert!(victim.is_stored_auth_current("sid=victim").unwrap());
        assert_eq!(victim.record("back-office").unwrap().unwrap().token, "v");
        assert_eq!(
            memory.get("victim/back-office:Cookies").unwrap().as_deref(),
            Some("sid=victim")
        );
        assert_eq!(memory.get("back-office:Cookies").unwrap(), None);
    }
}
