//! Record types shared by the store, the rotation engine, the console
//! screens, and the export generators.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dwell applied when a slide carries no usable duration.
pub const FALLBACK_DWELL: Duration = Duration::from_secs(10);

/// How a slide's source address is rendered. Both kinds end up as the source
/// of an embedded frame; the distinction only matters to the authoring UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideKind {
    Url,
    Image,
}

impl SlideKind {
    /// Column value used in the exported master bundle.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Url => "URL",
            Self::Image => "IMAGE",
        }
    }
}

impl fmt::Display for SlideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url => f.write_str("url"),
            Self::Image => f.write_str("image"),
        }
    }
}

/// One playlist entry. The source address is taken as-is; the console never
/// validates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Slide {
    pub id: String,
    pub kind: SlideKind,
    pub source: String,
    /// Whole seconds on screen. `None` or zero falls back to ten seconds at
    /// schedule time; the editor nudges toward a minimum but the engine does
    /// not enforce one.
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Slide {
    /// Dwell the advance timer is armed with for this slide.
    pub fn effective_dwell(&self, fallback: Duration) -> Duration {
        match self.duration_secs {
            Some(secs) if secs > 0 => Duration::from_secs(u64::from(secs)),
            _ => fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KioskStatus {
    Online,
    Offline,
    Maintenance,
}

impl KioskStatus {
    pub const ALL: &'static [Self] = &[Self::Online, Self::Offline, Self::Maintenance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for KioskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A display station and its ordered playlist. Slide order is rotation
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Kiosk {
    pub id: String,
    pub name: String,
    pub location: String,
    pub status: KioskStatus,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

impl Kiosk {
    /// A kiosk under maintenance is excluded from the exported players; the
    /// SQLite-backed player shows its deactivated screen instead.
    pub fn is_active(&self) -> bool {
        self.status != KioskStatus::Maintenance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    Admin,
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::User => f.write_str("user"),
        }
    }
}

/// Console account. Passwords are stored and compared in plaintext; this
/// mirrors the system being managed, where the console is the only reader of
/// its own data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct User {
    pub username: String,
    pub password: String,
    pub role: UserRole,
    pub full_name: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// One line of the activity log, newest first in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub action: String,
    pub details: String,
}

/// Console-wide settings edited on the settings screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Accent color name for the console chrome.
    #[serde(default = "Settings::default_theme_color")]
    pub theme_color: String,
    /// Where the exported master bundle will be published; embedded into the
    /// SQLite-backed player artifact.
    #[serde(default)]
    pub db_server_url: String,
}

impl Settings {
    fn default_theme_color() -> String {
        "blue".to_string()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme_color: Self::default_theme_color(),
            db_server_url: String::new(),
        }
    }
}
