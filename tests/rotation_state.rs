use std::time::Duration;

use kiosk_console::model::{Slide, SlideKind};
use kiosk_console::rotation::{Rotation, SnapshotOutcome};

const FALLBACK: Duration = Duration::from_secs(10);

fn slide(id: &str, duration_secs: Option<u32>) -> Slide {
    Slide {
        id: id.to_string(),
        kind: SlideKind::Url,
        source: format!("https://example.com/{id}"),
        duration_secs,
        title: None,
    }
}

#[test]
fn full_cycle_returns_to_start() {
    let mut rotation = Rotation::new(FALLBACK);
    let slides: Vec<Slide> = (0..4).map(|i| slide(&format!("s{i}"), Some(5))).collect();
    assert_eq!(rotation.apply_snapshot(slides), SnapshotOutcome::Filled);
    for _ in 0..4 {
        rotation.advance();
    }
    assert_eq!(rotation.index(), 0);
}

#[test]
fn empty_playlist_suspends() {
    let mut rotation = Rotation::new(FALLBACK);
    assert_eq!(rotation.apply_snapshot(Vec::new()), SnapshotOutcome::Unchanged);
    assert!(rotation.is_empty());
    assert_eq!(rotation.dwell(), None);
    assert_eq!(rotation.advance(), None);
    assert_eq!(rotation.index(), 0);
}

#[test]
fn shrinking_snapshot_resets_position() {
    let mut rotation = Rotation::new(FALLBACK);
    let five: Vec<Slide> = (0..5).map(|i| slide(&format!("s{i}"), Some(5))).collect();
    rotation.apply_snapshot(five.clone());
    for _ in 0..4 {
        rotation.advance();
    }
    assert_eq!(rotation.index(), 4);

    let two = five[..2].to_vec();
    assert_eq!(rotation.apply_snapshot(two), SnapshotOutcome::Reset);
    assert_eq!(rotation.index(), 0);
}

#[test]
fn position_survives_snapshot_when_still_valid() {
    let mut rotation = Rotation::new(FALLBACK);
    let slides: Vec<Slide> = (0..3).map(|i| slide(&format!("s{i}"), Some(5))).collect();
    rotation.apply_snapshot(slides.clone());
    rotation.advance();
    assert_eq!(rotation.apply_snapshot(slides), SnapshotOutcome::Unchanged);
    assert_eq!(rotation.index(), 1);
}

#[test]
fn replaced_slide_at_position_is_reported() {
    let mut rotation = Rotation::new(FALLBACK);
    rotation.apply_snapshot(vec![slide("a", Some(5)), slide("b", Some(5))]);
    rotation.advance();
    let swapped = vec![slide("a", Some(5)), slide("c", Some(5))];
    assert_eq!(rotation.apply_snapshot(swapped), SnapshotOutcome::Replaced);
    assert_eq!(rotation.index(), 1);
    assert_eq!(rotation.current().map(|s| s.id.as_str()), Some("c"));
}

#[test]
fn emptied_and_filled_transitions() {
    let mut rotation = Rotation::new(FALLBACK);
    assert_eq!(
        rotation.apply_snapshot(vec![slide("a", Some(5))]),
        SnapshotOutcome::Filled
    );
    assert_eq!(rotation.apply_snapshot(Vec::new()), SnapshotOutcome::Emptied);
    assert_eq!(
        rotation.apply_snapshot(vec![slide("b", Some(5))]),
        SnapshotOutcome::Filled
    );
    assert_eq!(rotation.current().map(|s| s.id.as_str()), Some("b"));
}

#[test]
fn dwell_falls_back_for_unset_or_zero_durations() {
    let mut rotation = Rotation::new(FALLBACK);
    rotation.apply_snapshot(vec![slide("a", None)]);
    assert_eq!(rotation.dwell(), Some(FALLBACK));

    rotation.apply_snapshot(vec![slide("a", Some(0))]);
    assert_eq!(rotation.dwell(), Some(FALLBACK));

    rotation.apply_snapshot(vec![slide("a", Some(7))]);
    assert_eq!(rotation.dwell(), Some(Duration::from_secs(7)));
}
