use super::store::{OtpPurpose, OtpStore};

/// Failed verification attempts allowed before a record is forfeited.
pub const MAX_ATTEMPTS: u32 = 3;

/// Result of checking a presented code against the stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Code matched; the record has been consumed.
    Success { email: String, name: String },
    /// No record for this key, or the record had expired.
    NotFound,
    /// Record exists but was issued for a different purpose; left untouched.
    WrongPurpose,
    /// The attempt ceiling was already spent; the record has been deleted.
    TooManyAttempts,
    /// Code did not match; the failed attempt has been counted.
    InvalidCode { attempts_left: u32 },
}

impl OtpStore {
    /// Verify `presented_code` against the record for `email`.
    ///
    /// The whole check runs under one acquisition of the store mutex, so a
    /// concurrent re-issuance or delete for the same key cannot interleave
    /// with the failed-attempt bookkeeping.
    pub fn verify(
        &self,
        email: &str,
        presented_code: &str,
        expected_purpose: Option<OtpPurpose>,
    ) -> VerifyOutcome {
        let mut records = self.records.lock().unwrap();

        let Some(mut record) = records.get(email).cloned() else {
            return VerifyOutcome::NotFound;
        };

        if record.is_expired() {
            records.remove(email);
            return VerifyOutcome::NotFound;
        }

        if let Some(expected) = expected_purpose {
            if record.purpose != expected {
                return VerifyOutcome::WrongPurpose;
            }
        }

        if record.attempts >= MAX_ATTEMPTS {
            records.remove(email);
            return VerifyOutcome::TooManyAttempts;
        }

        if record.code == presented_code {
            records.remove(email);
            return VerifyOutcome::Success {
                email: email.to_string(),
                name: record.name,
            };
        }

        // Failed attempt: count it and store the updated record back, still
        // under the same lock acquisition.
        record.attempts += 1;
        let attempts_left = MAX_ATTEMPTS - record.attempts;
        records.insert(email.to_string(), record);
        VerifyOutcome::InvalidCode { attempts_left }
    }
}
