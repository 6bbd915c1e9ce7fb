//! Record store backing the console: users, kiosks, the activity log, and
//! settings, persisted as one JSON data file.
//!
//! The console process is the only writer. Mutations update the in-memory
//! state and rewrite the file through a temp-file rename; readers are served
//! from memory and never wait on disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::config::BootstrapAdmin;
use crate::error::Error;
use crate::model::{Kiosk, LogEntry, Settings, User, UserRole};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DataSet {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    kiosks: Vec<Kiosk>,
    #[serde(default)]
    logs: Vec<LogEntry>,
    #[serde(default)]
    settings: Settings,
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    log_capacity: usize,
    state: RwLock<DataSet>,
}

impl Store {
    /// Opens the data file, creating and seeding it with the bootstrap
    /// administrator when it does not exist yet.
    pub async fn open(
        path: &Path,
        log_capacity: usize,
        bootstrap: &BootstrapAdmin,
    ) -> Result<Self, Error> {
        let (state, fresh) = if fs::try_exists(path).await? {
            let raw = fs::read(path).await?;
            let state: DataSet = serde_json::from_slice(&raw)?;
            debug!(
                users = state.users.len(),
                kiosks = state.kiosks.len(),
                "loaded data file"
            );
            (state, false)
        } else {
            info!(path = %path.display(), admin = %bootstrap.username, "seeding new data file");
            let state = DataSet {
                users: vec![User {
                    username: bootstrap.username.clone(),
                    password: bootstrap.password.clone(),
                    role: UserRole::Admin,
                    full_name: bootstrap.full_name.clone(),
                }],
                ..DataSet::default()
            };
            (state, true)
        };

        let store = Self {
            inner: Arc::new(Inner {
                path: path.to_path_buf(),
                log_capacity,
                state: RwLock::new(state),
            }),
        };
        if fresh {
            store.persist().await?;
        }
        Ok(store)
    }

    pub fn users(&self) -> Result<Vec<User>, Error> {
        Ok(self.read()?.users.clone())
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    /// Plaintext credential check against the stored user list.
    pub fn verify_login(&self, username: &str, password: &str) -> Result<Option<User>, Error> {
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .cloned())
    }

    /// Inserts or replaces a user, keyed by username.
    pub async fn save_user(&self, user: User) -> Result<(), Error> {
        {
            let mut state = self.write()?;
            match state.users.iter_mut().find(|u| u.username == user.username) {
                Some(existing) => *existing = user,
                None => state.users.push(user),
            }
        }
        self.persist().await
    }

    pub async fn delete_user(&self, username: &str) -> Result<(), Error> {
        {
            let mut state = self.write()?;
            let before = state.users.len();
            state.users.retain(|u| u.username != username);
            if state.users.len() == before {
                return Err(Error::UserNotFound(username.to_string()));
            }
        }
        self.persist().await
    }

    pub fn kiosks(&self) -> Result<Vec<Kiosk>, Error> {
        Ok(self.read()?.kiosks.clone())
    }

    pub fn kiosk(&self, id: &str) -> Result<Option<Kiosk>, Error> {
        Ok(self.read()?.kiosks.iter().find(|k| k.id == id).cloned())
    }

    /// Inserts or replaces a kiosk, keyed by id. Insertion order is the
    /// dashboard order.
    pub async fn save_kiosk(&self, kiosk: Kiosk) -> Result<(), Error> {
        {
            let mut state = self.write()?;
            match state.kiosks.iter_mut().find(|k| k.id == kiosk.id) {
                Some(existing) => *existing = kiosk,
                None => state.kiosks.push(kiosk),
            }
        }
        self.persist().await
    }

    pub fn logs(&self) -> Result<Vec<LogEntry>, Error> {
        Ok(self.read()?.logs.clone())
    }

    /// Appends an activity-log entry, newest first, dropping entries past
    /// the configured capacity.
    pub async fn add_log(&self, username: &str, action: &str, details: &str) -> Result<(), Error> {
        {
            let mut state = self.write()?;
            let now = Utc::now();
            let entry = LogEntry {
                id: now.timestamp_millis().to_string(),
                timestamp: now,
                username: username.to_string(),
                action: action.to_string(),
                details: details.to_string(),
            };
            state.logs.insert(0, entry);
            state.logs.truncate(self.inner.log_capacity);
        }
        self.persist().await
    }

    pub fn settings(&self) -> Result<Settings, Error> {
        Ok(self.read()?.settings.clone())
    }

    pub async fn save_settings(&self, settings: Settings) -> Result<(), Error> {
        {
            let mut state = self.write()?;
            state.settings = settings;
        }
        self.persist().await
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, DataSet>, Error> {
        self.inner.state.read().map_err(|_| Error::LockPoisoned)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, DataSet>, Error> {
        self.inner.state.write().map_err(|_| Error::LockPoisoned)
    }

    /// Serializes the current state and swaps it into place via a sibling
    /// temp file so a crash never leaves a torn data file.
    async fn persist(&self) -> Result<(), Error> {
        let bytes = {
            let state = self.read()?;
            serde_json::to_vec_pretty(&*state)?
        };
        let tmp = self.inner.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.inner.path).await?;
        Ok(())
    }
}
