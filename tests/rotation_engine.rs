use std::sync::{Arc, Mutex};
use std::time::Duration;

use kiosk_console::Error;
use kiosk_console::events::PlayerEvent;
use kiosk_console::model::{Kiosk, KioskStatus, Slide, SlideKind};
use kiosk_console::rotation::{self, PlaylistSource, RotationOptions};
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;

fn slide(id: &str, duration_secs: Option<u32>) -> Slide {
    Slide {
        id: id.to_string(),
        kind: SlideKind::Url,
        source: format!("https://example.com/{id}"),
        duration_secs,
        title: None,
    }
}

fn kiosk(slides: Vec<Slide>) -> Kiosk {
    Kiosk {
        id: "kiosk-1".to_string(),
        name: "Lobby".to_string(),
        location: "Hall 1".to_string(),
        status: KioskStatus::Online,
        slides,
    }
}

struct FixedSource(Kiosk);

impl PlaylistSource for FixedSource {
    fn snapshot(&self, _kiosk_id: &str) -> Result<Option<Kiosk>, Error> {
        Ok(Some(self.0.clone()))
    }
}

struct SharedSource(Arc<Mutex<Kiosk>>);

impl PlaylistSource for SharedSource {
    fn snapshot(&self, _kiosk_id: &str) -> Result<Option<Kiosk>, Error> {
        Ok(Some(self.0.lock().unwrap().clone()))
    }
}

struct MissingSource;

impl PlaylistSource for MissingSource {
    fn snapshot(&self, _kiosk_id: &str) -> Result<Option<Kiosk>, Error> {
        Ok(None)
    }
}

/// Fails the first snapshot, then serves normally.
struct FlakySource {
    calls: Mutex<u32>,
    kiosk: Kiosk,
}

impl PlaylistSource for FlakySource {
    fn snapshot(&self, _kiosk_id: &str) -> Result<Option<Kiosk>, Error> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls == 1 {
            Err(Error::LockPoisoned)
        } else {
            Ok(Some(self.kiosk.clone()))
        }
    }
}

fn start_engine(
    source: Arc<dyn PlaylistSource>,
) -> (mpsc::Receiver<PlayerEvent>, CancellationToken) {
    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    tokio::spawn(rotation::run(
        source,
        "kiosk-1".to_string(),
        RotationOptions::default(),
        tx,
        cancel.clone(),
    ));
    (rx, cancel)
}

async fn next_event(rx: &mut mpsc::Receiver<PlayerEvent>) -> PlayerEvent {
    timeout(Duration::from_secs(600), rx.recv())
        .await
        .expect("timed out waiting for a player event")
        .expect("engine ended unexpectedly")
}

fn slide_id(event: &PlayerEvent) -> String {
    match event {
        PlayerEvent::Slide { slide, .. } => slide.id.clone(),
        other => panic!("expected a slide event, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn two_slide_cycle_timing() {
    let source = Arc::new(FixedSource(kiosk(vec![
        slide("a", Some(5)),
        slide("b", Some(3)),
    ])));
    let (mut rx, cancel) = start_engine(source);
    let started = Instant::now();

    assert_eq!(slide_id(&next_event(&mut rx).await), "a");
    assert!(started.elapsed() < Duration::from_secs(1));

    assert_eq!(slide_id(&next_event(&mut rx).await), "b");
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6),
        "first advance at {elapsed:?}"
    );

    // Wraps back to the start; full cycle is the sum of both dwells.
    assert_eq!(slide_id(&next_event(&mut rx).await), "a");
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(8) && elapsed < Duration::from_secs(9),
        "wrap at {elapsed:?}"
    );

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn empty_playlist_never_arms_a_timer() {
    let source = Arc::new(FixedSource(kiosk(Vec::new())));
    let (mut rx, cancel) = start_engine(source);

    assert!(matches!(
        next_event(&mut rx).await,
        PlayerEvent::Waiting { .. }
    ));

    // Several poll cycles pass without content; nothing further is emitted.
    let nothing = timeout(Duration::from_secs(120), rx.recv()).await;
    assert!(nothing.is_err(), "no events expected for an empty playlist");

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn unset_duration_uses_fallback_dwell() {
    let source = Arc::new(FixedSource(kiosk(vec![
        slide("a", None),
        slide("b", Some(0)),
    ])));
    let (mut rx, cancel) = start_engine(source);
    let started = Instant::now();

    match next_event(&mut rx).await {
        PlayerEvent::Slide { dwell_secs, .. } => assert_eq!(dwell_secs, 10),
        other => panic!("expected a slide event, got {other:?}"),
    }
    assert_eq!(slide_id(&next_event(&mut rx).await), "b");
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11),
        "fallback advance at {elapsed:?}"
    );

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn shrinking_playlist_resets_to_start_at_refresh() {
    let five: Vec<Slide> = (0..5).map(|i| slide(&format!("s{i}"), Some(7))).collect();
    let shared = Arc::new(Mutex::new(kiosk(five.clone())));
    let (mut rx, cancel) = start_engine(Arc::new(SharedSource(shared.clone())));

    // Walk to the last position (t = 28s), then shrink before the 30s poll.
    for expected in 0..5 {
        assert_eq!(slide_id(&next_event(&mut rx).await), format!("s{expected}"));
    }
    shared.lock().unwrap().slides = five[..2].to_vec();

    match next_event(&mut rx).await {
        PlayerEvent::Slide { slide, index, total, .. } => {
            assert_eq!(slide.id, "s0");
            assert_eq!(index, 0);
            assert_eq!(total, 2);
        }
        other => panic!("expected a slide event, got {other:?}"),
    }

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_recovers_on_next_poll_without_duplicates() {
    let source = Arc::new(FlakySource {
        calls: Mutex::new(0),
        kiosk: kiosk(vec![slide("a", Some(5)), slide("b", Some(3))]),
    });
    let (mut rx, cancel) = start_engine(source);
    let started = Instant::now();

    assert!(matches!(
        next_event(&mut rx).await,
        PlayerEvent::RefreshFailed { .. }
    ));

    // Exactly one render transition once the retry succeeds.
    assert_eq!(slide_id(&next_event(&mut rx).await), "a");
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(30) && elapsed < Duration::from_secs(31),
        "recovery at {elapsed:?}"
    );

    // The single armed timer fires one dwell later; no duplicate schedule.
    assert_eq!(slide_id(&next_event(&mut rx).await), "b");
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(35) && elapsed < Duration::from_secs(36),
        "advance after recovery at {elapsed:?}"
    );

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn playlist_emptied_mid_rotation_suspends_until_content_returns() {
    let shared = Arc::new(Mutex::new(kiosk(vec![
        slide("a", Some(5)),
        slide("b", Some(5)),
    ])));
    let (mut rx, cancel) = start_engine(Arc::new(SharedSource(shared.clone())));

    assert_eq!(slide_id(&next_event(&mut rx).await), "a");
    shared.lock().unwrap().slides = Vec::new();

    // Rotation keeps going until the poll observes the empty playlist.
    let waiting_seen = loop {
        match next_event(&mut rx).await {
            PlayerEvent::Slide { .. } => continue,
            PlayerEvent::Waiting { .. } => break true,
            other => panic!("unexpected event {other:?}"),
        }
    };
    assert!(waiting_seen);

    // Suspended: no timers fire while the playlist stays empty.
    let nothing = timeout(Duration::from_secs(120), rx.recv()).await;
    assert!(nothing.is_err(), "no events expected while suspended");

    // Content returning at a later poll resumes from the start.
    shared.lock().unwrap().slides = vec![slide("c", Some(5))];
    assert_eq!(slide_id(&next_event(&mut rx).await), "c");

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn missing_kiosk_is_terminal_for_the_session() {
    let (mut rx, _cancel) = start_engine(Arc::new(MissingSource));

    assert!(matches!(
        next_event(&mut rx).await,
        PlayerEvent::Missing { .. }
    ));

    // The engine ends and drops its sender; no retry happens.
    let closed = timeout(Duration::from_secs(120), rx.recv()).await;
    assert_eq!(closed.expect("channel should close"), None);
}
