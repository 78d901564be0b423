use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::debug;

/// Intended use of an issued code. A code issued for one purpose is never
/// accepted by the other flow's verification path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    EmailVerification,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::EmailVerification => "email_verification",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }
}

/// A pending one-time passcode for a single email address.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub code: String,
    pub expires_at: Instant,
    pub name: String,
    pub purpose: OtpPurpose,
    pub attempts: u32,
}

impl OtpRecord {
    pub fn new(code: String, name: String, purpose: OtpPurpose, ttl: Duration) -> Self {
        Self {
            code,
            expires_at: Instant::now() + ttl,
            name,
            purpose,
            attempts: 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// In-memory OTP store: one pending record per email address.
///
/// A single mutex guards the whole map, so read-modify-write sequences on a
/// key cannot race with a concurrent put or delete. Holds per-process state
/// only; a multi-instance deployment needs an external keyed store behind
/// the same operations.
#[derive(Clone, Default)]
pub struct OtpStore {
    pub(crate) records: Arc<Mutex<HashMap<String, OtpRecord>>>,
}

impl OtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record for `email`, replacing any existing one. Only the most
    /// recently issued code is ever valid for a key.
    pub fn put(&self, email: &str, record: OtpRecord) {
        let mut records = self.records.lock().unwrap();
        records.insert(email.to_string(), record);
    }

    /// Get the current record for `email`. An expired record is removed on
    /// the spot and reported as absent, whether or not the sweeper has run.
    pub fn get(&self, email: &str) -> Option<OtpRecord> {
        let mut records = self.records.lock().unwrap();
        let record = records.get(email)?.clone();
        if record.is_expired() {
            records.remove(email);
            return None;
        }
        Some(record)
    }

    /// Remove the record for `email`, if any.
    pub fn delete(&self, email: &str) {
        let mut records = self.records.lock().unwrap();
        records.remove(email);
    }

    /// Remove every expired record, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, record| !record.is_expired());
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn the background sweeper that bounds store growth. Lazy expiry on
/// `get` keeps reads correct even when a sweep is delayed; this task only
/// reclaims memory for codes nobody presented again.
pub fn spawn_sweeper(store: OtpStore, period: Duration) {
    tokio::spawn(async move {
        let mut interval = interval(period);
        loop {
            interval.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                debug!("Swept {} expired OTP record(s)", removed);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, ttl: Duration) -> OtpRecord {
        OtpRecord::new(
            code.to_string(),
            "Alice".to_string(),
            OtpPurpose::EmailVerification,
            ttl,
        )
    }

    fn expired_record(code: &str) -> OtpRecord {
        let mut record = record(code, Duration::from_secs(600));
        record.expires_at = Instant::now() - Duration::from_secs(1);
        record
    }

    #[test]
    fn test_put_get_delete_round_trip() {
        let store = OtpStore::new();
        store.put("alice@example.com", record("123456", Duration::from_secs(600)));

        let stored = store.get("alice@example.com").unwrap();
        assert_eq!(stored.code, "123456");
        assert_eq!(stored.attempts, 0);

        store.delete("alice@example.com");
        assert!(store.get("alice@example.com").is_none());

        // Deleting an absent key is a no-op.
        store.delete("alice@example.com");
    }

    #[test]
    fn test_put_replaces_existing_record() {
        let store = OtpStore::new();
        store.put("alice@example.com", record("111111", Duration::from_secs(600)));
        store.put("alice@example.com", record("222222", Duration::from_secs(600)));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("alice@example.com").unwrap().code, "222222");
    }

    #[test]
    fn test_expired_record_is_never_returned() {
        let store = OtpStore::new();
        store.put("alice@example.com", expired_record("123456"));

        assert!(store.get("alice@example.com").is_none());
        // Lazy expiry also removed it physically.
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_sweep_removes_only_expired_records() {
        let store = OtpStore::new();
        store.put("expired1@example.com", expired_record("111111"));
        store.put("expired2@example.com", expired_record("222222"));
        store.put("fresh@example.com", record("333333", Duration::from_secs(600)));

        assert_eq!(store.sweep(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get("fresh@example.com").is_some());
    }

    #[test]
    fn test_concurrent_puts_keep_one_record_per_key() {
        let store = OtpStore::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.put(
                            "alice@example.com",
                            record(&format!("{:06}", 100_000 + i), Duration::from_secs(600)),
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1);
    }
}
