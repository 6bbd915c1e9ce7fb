use std::time::Duration;

use kiosk_console::export::{self, OfflineConfig, PlayerArtifact};
use kiosk_console::model::{Kiosk, KioskStatus, Slide, SlideKind};
use rusqlite::Connection;

const FALLBACK: Duration = Duration::from_secs(10);
const RETRY: Duration = Duration::from_secs(30);

fn slide(id: &str, duration_secs: Option<u32>) -> Slide {
    Slide {
        id: id.to_string(),
        kind: SlideKind::Url,
        source: format!("https://example.com/{id}"),
        duration_secs,
        title: None,
    }
}

fn kiosk(id: &str, status: KioskStatus, slides: Vec<Slide>) -> Kiosk {
    Kiosk {
        id: id.to_string(),
        name: format!("Kiosk {id}"),
        location: "Hall 1".to_string(),
        status,
        slides,
    }
}

#[test]
fn offline_config_collapses_durations_to_the_first_slide() {
    let kiosk = kiosk(
        "k1",
        KioskStatus::Online,
        vec![slide("a", Some(15)), slide("b", Some(3))],
    );
    let config = OfflineConfig::for_kiosk(&kiosk);
    assert_eq!(config.interval, 15);
    assert_eq!(
        config.sites,
        vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string()
        ]
    );
}

#[test]
fn offline_config_falls_back_for_unset_or_empty() {
    let unset = kiosk("k1", KioskStatus::Online, vec![slide("a", None)]);
    assert_eq!(OfflineConfig::for_kiosk(&unset).interval, 10);

    let empty = kiosk("k2", KioskStatus::Online, Vec::new());
    let config = OfflineConfig::for_kiosk(&empty);
    assert_eq!(config.interval, 10);
    assert!(config.sites.is_empty());
}

#[test]
fn offline_config_wire_shape_is_stable() {
    let kiosk = kiosk("k1", KioskStatus::Online, vec![slide("a", Some(5))]);
    let json = serde_json::to_value(OfflineConfig::for_kiosk(&kiosk)).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "interval": 5, "sites": ["https://example.com/a"] })
    );
}

#[test]
fn generic_player_reads_config_json_and_allows_overrides() {
    let page = PlayerArtifact::generic_json(FALLBACK, RETRY).render();
    assert!(page.contains("var currentSource = 'config.json';"));
    assert!(page.contains("params.get('source')"));
    assert!(page.contains("var RETRY_DELAY_MS = 30000;"));
    assert!(page.contains("var FALLBACK_DWELL_MS = 10000;"));
    // The artifact is self-contained; no console routes may leak into it.
    assert!(!page.contains("/player/"));
}

#[test]
fn kiosk_player_binds_its_own_document() {
    let kiosk = kiosk("kiosk-7", KioskStatus::Online, vec![slide("a", Some(5))]);
    let page = PlayerArtifact::kiosk_json(&kiosk, FALLBACK, RETRY).render();
    assert!(page.contains("var currentSource = 'kiosk-7.json';"));
    assert!(page.contains("var KIOSK_ID = 'kiosk-7';"));
    assert!(page.contains("KIOSK_ID + '.json'"));
}

#[test]
fn sqlite_player_embeds_engine_and_bundle_address() {
    let kiosk = kiosk("kiosk-7", KioskStatus::Online, vec![slide("a", Some(5))]);
    let page =
        PlayerArtifact::kiosk_sqlite(&kiosk, "http://server/master.sqlite", FALLBACK, RETRY)
            .render();
    assert!(page.contains("sql-wasm.js"));
    assert!(page.contains("var currentSource = 'http://server/master.sqlite';"));
    assert!(page.contains("SELECT is_active FROM kiosks"));
    assert!(page.contains("ORDER BY sort_order"));

    // An unset bundle address defaults to a file next to the artifact.
    let page = PlayerArtifact::kiosk_sqlite(&kiosk, "", FALLBACK, RETRY).render();
    assert!(page.contains("var currentSource = 'master.sqlite';"));
}

#[test]
fn artifact_titles_are_html_escaped() {
    let mut named = kiosk("k1", KioskStatus::Online, Vec::new());
    named.name = "Lobby <& friends>".to_string();
    let page = PlayerArtifact::kiosk_json(&named, FALLBACK, RETRY).render();
    assert!(page.contains("Kiosk Player - Lobby &lt;&amp; friends&gt;"));
    assert!(!page.contains("<& friends>"));
}

#[test]
fn master_bundle_schema_and_flags() {
    let kiosks = vec![
        kiosk(
            "k1",
            KioskStatus::Online,
            vec![slide("a", Some(15)), slide("b", None)],
        ),
        kiosk("k2", KioskStatus::Maintenance, vec![slide("c", Some(5))]),
    ];

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("master.sqlite");
    export::write_master_db(&path, &kiosks).unwrap();

    let conn = Connection::open(&path).unwrap();
    let active: i64 = conn
        .query_row("SELECT is_active FROM kiosks WHERE id = 'k1'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(active, 1);
    let active: i64 = conn
        .query_row("SELECT is_active FROM kiosks WHERE id = 'k2'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(active, 0, "maintenance kiosks export as inactive");

    let mut stmt = conn
        .prepare("SELECT id, type, duration, sort_order FROM slides WHERE kiosk_id = 'k1' ORDER BY sort_order")
        .unwrap();
    let rows: Vec<(String, String, i64, i64)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], ("a".to_string(), "URL".to_string(), 15, 0));
    // Unset durations are written with the fallback applied.
    assert_eq!(rows[1], ("b".to_string(), "URL".to_string(), 10, 1));
}

#[test]
fn master_bundle_bytes_are_a_sqlite_file() {
    let kiosks = vec![kiosk("k1", KioskStatus::Online, vec![slide("a", Some(5))])];
    let bytes = export::master_db_bytes(&kiosks).unwrap();
    assert!(bytes.starts_with(b"SQLite format 3\0"));
}
