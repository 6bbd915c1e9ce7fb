use serde::Serialize;

use crate::model::{Kiosk, Slide};

/// Kiosk header data shown in the player overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct KioskFacts {
    pub id: String,
    pub name: String,
    pub location: String,
}

impl From<&Kiosk> for KioskFacts {
    fn from(kiosk: &Kiosk) -> Self {
        Self {
            id: kiosk.id.clone(),
            name: kiosk.name.clone(),
            location: kiosk.location.clone(),
        }
    }
}

/// Display-state transitions pushed from a rotation engine to its player
/// surface. Serialized as-is onto the session's event stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum PlayerEvent {
    /// Show this slide. The surface keys its frame by `slide.id` so a slide
    /// change forces a frame reload.
    Slide {
        kiosk: KioskFacts,
        slide: Slide,
        index: usize,
        total: usize,
        /// Seconds the advance timer was armed with.
        dwell_secs: u64,
    },
    /// Playlist is valid but empty; rotation is suspended.
    Waiting { kiosk: KioskFacts },
    /// The kiosk id could not be resolved. Terminal for this session.
    Missing { kiosk_id: String },
    /// A refresh attempt failed; the engine keeps its last snapshot and
    /// retries at the next poll.
    RefreshFailed { kiosk_id: String, message: String },
}
