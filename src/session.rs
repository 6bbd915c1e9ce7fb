//! In-memory login sessions. Tokens live for the lifetime of the process;
//! restarting the console signs everyone out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::{Rng, distributions::Alphanumeric};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "console-session";

#[derive(Clone, Default)]
pub struct Sessions {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session for a signed-in user and returns its token.
    pub fn create(&self, username: &str) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        self.lock().insert(token.clone(), username.to_string());
        token
    }

    /// Username behind a token, if the session is still alive.
    pub fn resolve(&self, token: &str) -> Option<String> {
        self.lock().get(token).cloned()
    }

    pub fn revoke(&self, token: &str) {
        self.lock().remove(token);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
