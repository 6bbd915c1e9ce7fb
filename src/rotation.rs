//! Slide-rotation engine for one display session.
//!
//! The engine is split in two layers. [`Rotation`] is the pure state
//! machine: a playlist snapshot plus the current position, with wholesale
//! snapshot replacement and wrap-around advancement. [`run`] drives it with
//! timers: a recurring refresh tick that re-reads the playlist through a
//! [`PlaylistSource`], and at most one armed advance deadline. Both timers
//! live in a single `select!` loop, so they never race each other and the
//! playlist needs no locking.
//!
//! One engine instance serves one display session. Position state dies with
//! the session; cancelling the task drops both timers.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::Sender;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::events::{KioskFacts, PlayerEvent};
use crate::model::{FALLBACK_DWELL, Kiosk, Slide};
use crate::store::Store;

/// Where a rotation engine gets its playlist snapshots.
///
/// The live console implements this on the record store; tests substitute
/// scripted sources.
pub trait PlaylistSource: Send + Sync {
    /// Latest snapshot for a kiosk, or `None` when no such kiosk exists.
    fn snapshot(&self, kiosk_id: &str) -> Result<Option<Kiosk>, Error>;
}

impl PlaylistSource for Store {
    fn snapshot(&self, kiosk_id: &str) -> Result<Option<Kiosk>, Error> {
        self.kiosk(kiosk_id)
    }
}

/// What a wholesale playlist swap did to the visible position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The current position still shows the same slide. Any pending advance
    /// timer keeps running.
    Unchanged,
    /// The slide at the current position was replaced in place. The surface
    /// re-renders, but the pending advance timer keeps running.
    Replaced,
    /// The position was past the end of the new snapshot and reset to 0.
    Reset,
    /// The playlist went empty; rotation suspends.
    Emptied,
    /// Content appeared where there was none; position 0 becomes visible.
    Filled,
}

/// Pure rotation state: playlist snapshot plus current position.
///
/// Invariant: `index` is a valid position into `slides` whenever `slides` is
/// non-empty, and 0 otherwise.
#[derive(Debug)]
pub struct Rotation {
    slides: Vec<Slide>,
    index: usize,
    fallback: Duration,
}

impl Rotation {
    pub fn new(fallback: Duration) -> Self {
        Self {
            slides: Vec::new(),
            index: 0,
            fallback,
        }
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&Slide> {
        self.slides.get(self.index)
    }

    /// Dwell for the slide at the current position, `None` when empty.
    pub fn dwell(&self) -> Option<Duration> {
        self.current().map(|s| s.effective_dwell(self.fallback))
    }

    /// Replaces the playlist wholesale. The position is preserved when it
    /// still points inside the new snapshot and reset to 0 otherwise.
    pub fn apply_snapshot(&mut self, slides: Vec<Slide>) -> SnapshotOutcome {
        let was_empty = self.slides.is_empty();
        let previous = self.current().cloned();
        self.slides = slides;

        if self.slides.is_empty() {
            self.index = 0;
            return if was_empty {
                SnapshotOutcome::Unchanged
            } else {
                SnapshotOutcome::Emptied
            };
        }
        if was_empty {
            self.index = 0;
            return SnapshotOutcome::Filled;
        }
        if self.index >= self.slides.len() {
            self.index = 0;
            return SnapshotOutcome::Reset;
        }
        let now = &self.slides[self.index];
        match previous {
            Some(prev) if prev.id == now.id && prev.source == now.source => {
                SnapshotOutcome::Unchanged
            }
            _ => SnapshotOutcome::Replaced,
        }
    }

    /// Advances one position, wrapping at the end. `None` when the playlist
    /// is empty and rotation is suspended.
    pub fn advance(&mut self) -> Option<usize> {
        if self.slides.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.slides.len();
        Some(self.index)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RotationOptions {
    /// How often the engine re-reads its kiosk from the source.
    pub poll_interval: Duration,
    /// Dwell applied to slides without a usable duration.
    pub fallback_dwell: Duration,
}

impl Default for RotationOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            fallback_dwell: FALLBACK_DWELL,
        }
    }
}

/// Runs one display session until cancelled, the surface goes away, or the
/// kiosk disappears from the source.
///
/// The first refresh happens immediately; every index change (including the
/// very first display) arms exactly one advance deadline for the current
/// slide's dwell. A refresh never interrupts an armed deadline: the next
/// advance fires against whatever snapshot is current at fire time. Source
/// errors degrade to a visible event and are retried at the next tick; a
/// missing kiosk ends the session.
pub async fn run(
    source: Arc<dyn PlaylistSource>,
    kiosk_id: String,
    opts: RotationOptions,
    events: Sender<PlayerEvent>,
    cancel: CancellationToken,
) -> Result<(), Error> {
    let mut rotation = Rotation::new(opts.fallback_dwell);
    let mut facts: Option<KioskFacts> = None;
    let mut advance_at: Option<Instant> = None;
    let mut announced = false;

    let mut refresh = time::interval(opts.poll_interval);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(kiosk = %kiosk_id, "player session started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(kiosk = %kiosk_id, "player session cancelled");
                break;
            }

            _ = refresh.tick() => {
                match source.snapshot(&kiosk_id) {
                    Ok(Some(kiosk)) => {
                        let header = KioskFacts::from(&kiosk);
                        let outcome = rotation.apply_snapshot(kiosk.slides);
                        facts = Some(header.clone());
                        match outcome {
                            SnapshotOutcome::Filled | SnapshotOutcome::Reset => {
                                // Index change: render and (re)arm the one
                                // advance deadline, superseding any pending one.
                                if !emit_slide(&events, &header, &rotation).await {
                                    break;
                                }
                                advance_at = rotation.dwell().map(|d| Instant::now() + d);
                                announced = true;
                            }
                            SnapshotOutcome::Replaced => {
                                // Same position, new content. The in-flight
                                // advance deadline is left alone.
                                if !emit_slide(&events, &header, &rotation).await {
                                    break;
                                }
                                announced = true;
                            }
                            SnapshotOutcome::Emptied => {
                                advance_at = None;
                                if events.send(PlayerEvent::Waiting { kiosk: header }).await.is_err() {
                                    break;
                                }
                                announced = true;
                            }
                            SnapshotOutcome::Unchanged => {
                                if !announced {
                                    // First refresh found an empty playlist.
                                    if events.send(PlayerEvent::Waiting { kiosk: header }).await.is_err() {
                                        break;
                                    }
                                    announced = true;
                                }
                            }
                        }
                    }
                    Ok(None) => {
                        warn!(kiosk = %kiosk_id, "kiosk missing from source; ending session");
                        let _ = events
                            .send(PlayerEvent::Missing { kiosk_id: kiosk_id.clone() })
                            .await;
                        break;
                    }
                    Err(err) => {
                        warn!(kiosk = %kiosk_id, error = %err, "playlist refresh failed");
                        let failed = PlayerEvent::RefreshFailed {
                            kiosk_id: kiosk_id.clone(),
                            message: err.to_string(),
                        };
                        if events.send(failed).await.is_err() {
                            break;
                        }
                    }
                }
            }

            // `advance_at` is Copy; the future snapshots the deadline so the
            // handlers below stay free to re-arm it.
            _ = async move {
                match advance_at {
                    Some(at) => time::sleep_until(at).await,
                    None => future::pending().await,
                }
            }, if advance_at.is_some() => {
                if rotation.advance().is_some() {
                    match facts.clone() {
                        Some(header) => {
                            if !emit_slide(&events, &header, &rotation).await {
                                break;
                            }
                            advance_at = rotation.dwell().map(|d| Instant::now() + d);
                        }
                        None => advance_at = None,
                    }
                } else {
                    advance_at = None;
                }
            }
        }
    }

    Ok(())
}

/// Sends the current slide to the surface. Returns false when the surface is
/// gone and the session should end.
async fn emit_slide(events: &Sender<PlayerEvent>, kiosk: &KioskFacts, rotation: &Rotation) -> bool {
    let (Some(slide), Some(dwell)) = (rotation.current(), rotation.dwell()) else {
        return true;
    };
    events
        .send(PlayerEvent::Slide {
            kiosk: kiosk.clone(),
            slide: slide.clone(),
            index: rotation.index(),
            total: rotation.len(),
            dwell_secs: dwell.as_secs(),
        })
        .await
        .is_ok()
}
