//! Test doubles shared by the unit tests of this crate.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

use crate::error::UserResult;
use crate::security::{Clock, PasswordHasher};

/// Reversible "hash" so tests do not pay for argon2 in debug builds.
#[derive(Debug, Default, Clone)]
pub struct PlainTextHasher;

impl PasswordHasher for PlainTextHasher {
    fn hash(&self, password: &str) -> UserResult<String> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("plain$") == Some(password)
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
