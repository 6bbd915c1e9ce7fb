use kiosk_console::Error;
use kiosk_console::config::BootstrapAdmin;
use kiosk_console::model::{Kiosk, KioskStatus, Settings, Slide, SlideKind, UserRole};
use kiosk_console::store::Store;

fn bootstrap() -> BootstrapAdmin {
    BootstrapAdmin {
        username: "admin".to_string(),
        password: "secret".to_string(),
        full_name: "Administrator".to_string(),
    }
}

fn sample_kiosk(id: &str) -> Kiosk {
    Kiosk {
        id: id.to_string(),
        name: "Lobby".to_string(),
        location: "Hall 1".to_string(),
        status: KioskStatus::Online,
        slides: vec![Slide {
            id: "s1".to_string(),
            kind: SlideKind::Image,
            source: "https://example.com/a.png".to_string(),
            duration_secs: Some(15),
            title: Some("Welcome".to_string()),
        }],
    }
}

#[tokio::test]
async fn fresh_data_file_seeds_bootstrap_admin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("console-data.json");
    let store = Store::open(&path, 100, &bootstrap()).await.unwrap();

    let users = store.users().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "admin");
    assert_eq!(users[0].role, UserRole::Admin);
    assert!(path.exists(), "seeding must persist the data file");
}

#[tokio::test]
async fn kiosks_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("console-data.json");
    {
        let store = Store::open(&path, 100, &bootstrap()).await.unwrap();
        store.save_kiosk(sample_kiosk("kiosk-1")).await.unwrap();
    }

    let store = Store::open(&path, 100, &bootstrap()).await.unwrap();
    let kiosk = store.kiosk("kiosk-1").unwrap().expect("kiosk persisted");
    assert_eq!(kiosk.name, "Lobby");
    assert_eq!(kiosk.slides.len(), 1);
    assert_eq!(kiosk.slides[0].duration_secs, Some(15));
}

#[tokio::test]
async fn save_kiosk_replaces_by_id_and_keeps_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("console-data.json");
    let store = Store::open(&path, 100, &bootstrap()).await.unwrap();

    store.save_kiosk(sample_kiosk("kiosk-1")).await.unwrap();
    store.save_kiosk(sample_kiosk("kiosk-2")).await.unwrap();

    let mut updated = sample_kiosk("kiosk-1");
    updated.name = "Entrance".to_string();
    store.save_kiosk(updated).await.unwrap();

    let kiosks = store.kiosks().unwrap();
    assert_eq!(kiosks.len(), 2);
    assert_eq!(kiosks[0].id, "kiosk-1");
    assert_eq!(kiosks[0].name, "Entrance");
    assert_eq!(kiosks[1].id, "kiosk-2");
}

#[tokio::test]
async fn login_is_a_plaintext_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("console-data.json");
    let store = Store::open(&path, 100, &bootstrap()).await.unwrap();

    assert!(store.verify_login("admin", "secret").unwrap().is_some());
    assert!(store.verify_login("admin", "wrong").unwrap().is_none());
    assert!(store.verify_login("ghost", "secret").unwrap().is_none());
}

#[tokio::test]
async fn activity_log_is_capped_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("console-data.json");
    let store = Store::open(&path, 3, &bootstrap()).await.unwrap();

    for i in 0..5 {
        store
            .add_log("admin", "UPDATE_KIOSK", &format!("edit {i}"))
            .await
            .unwrap();
    }

    let logs = store.logs().unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].details, "edit 4");
    assert_eq!(logs[2].details, "edit 2");
}

#[tokio::test]
async fn deleting_an_unknown_user_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("console-data.json");
    let store = Store::open(&path, 100, &bootstrap()).await.unwrap();

    match store.delete_user("ghost").await {
        Err(Error::UserNotFound(name)) => assert_eq!(name, "ghost"),
        other => panic!("expected UserNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn settings_default_and_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("console-data.json");
    let store = Store::open(&path, 100, &bootstrap()).await.unwrap();

    let settings = store.settings().unwrap();
    assert_eq!(settings.theme_color, "blue");
    assert!(settings.db_server_url.is_empty());

    store
        .save_settings(Settings {
            theme_color: "emerald".to_string(),
            db_server_url: "http://server/master.sqlite".to_string(),
        })
        .await
        .unwrap();

    let settings = store.settings().unwrap();
    assert_eq!(settings.theme_color, "emerald");
    assert_eq!(settings.db_server_url, "http://server/master.sqlite");
}
