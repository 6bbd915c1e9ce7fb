//! Console web layer: session-gated admin screens, the live player surface
//! with its event stream, and the export endpoints.
//!
//! Pages are rendered server-side as plain HTML strings; the only script in
//! the console is the player surface's event-stream client.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::Router;
use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use chrono::Utc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::Configuration;
use crate::error::Error;
use crate::events::PlayerEvent;
use crate::export::{self, OfflineConfig, PlayerArtifact, escape_html, js_string};
use crate::model::{Kiosk, KioskStatus, LogEntry, Settings, Slide, User, UserRole};
use crate::rotation::{self, PlaylistSource, RotationOptions};
use crate::session::{SESSION_COOKIE, Sessions};
use crate::store::Store;

const SAFE_PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Accent choices offered on the settings screen.
const THEME_COLORS: &[(&str, &str)] = &[
    ("blue", "#3b82f6"),
    ("emerald", "#10b981"),
    ("purple", "#a855f7"),
    ("rose", "#f43f5e"),
    ("orange", "#f97316"),
];

#[derive(Clone)]
pub struct AppState {
    store: Store,
    sessions: Sessions,
    rotation: RotationOptions,
    retry_delay: Duration,
}

pub fn router(store: Store, sessions: Sessions, cfg: &Configuration) -> Router {
    let state = AppState {
        store,
        sessions,
        rotation: RotationOptions {
            poll_interval: cfg.poll_interval,
            fallback_dwell: cfg.advance_fallback,
        },
        retry_delay: cfg.retry_delay,
    };
    Router::new()
        .route("/", get(root))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout))
        .route("/dashboard", get(dashboard))
        .route("/kiosks", post(create_kiosk))
        .route("/kiosks/{id}/edit", get(edit_kiosk_page))
        .route("/kiosks/{id}/save", post(save_kiosk))
        .route("/kiosks/{id}/config.json", get(kiosk_config_json))
        .route("/kiosks/{id}/export/player.html", get(export_kiosk_player))
        .route(
            "/kiosks/{id}/export/sqlite-player.html",
            get(export_sqlite_player),
        )
        .route("/kiosks/{id}/export/config.json", get(export_kiosk_config))
        .route("/export/generic-player.html", get(export_generic_player))
        .route("/export/master.sqlite", get(export_master_db))
        .route("/player/{id}", get(player_page))
        .route("/player/{id}/events", get(player_events))
        .route("/users", get(users_page))
        .route("/users/save", post(save_user))
        .route("/users/{username}/delete", post(delete_user))
        .route("/logs", get(logs_page))
        .route("/settings", get(settings_page).post(save_settings))
        .fallback(get(root))
        .with_state(state)
}

// ---- session plumbing ----

fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn current_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let token = session_token(headers)?;
    let username = state.sessions.resolve(&token)?;
    state.store.find_user(&username).ok().flatten()
}

fn accent_for(state: &AppState) -> &'static str {
    let settings = state.store.settings().unwrap_or_default();
    accent_hex(&settings.theme_color)
}

fn accent_hex(name: &str) -> &'static str {
    THEME_COLORS
        .iter()
        .find(|(color, _)| *color == name)
        .map(|(_, hex)| *hex)
        .unwrap_or(THEME_COLORS[0].1)
}

fn internal_error(accent: &'static str, msg: &'static str) -> impl Fn(Error) -> Response {
    move |err| {
        error!(error = ?err, "{msg}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(layout(
                "Error",
                accent,
                None,
                "<h2>Something went wrong</h2><p>See the console log for details.</p>",
            )),
        )
            .into_response()
    }
}

// ---- auth screens ----

async fn root(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    if current_user(&state, &headers).is_some() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if current_user(&state, &headers).is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    let accent = accent_for(&state);
    Html(layout("Sign in", accent, None, &render_login(None))).into_response()
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    let accent = accent_for(&state);
    match state.store.verify_login(&form.username, &form.password) {
        Ok(Some(user)) => {
            let token = state.sessions.create(&user.username);
            if let Err(err) = state
                .store
                .add_log(&user.username, "LOGIN", "signed in to the console")
                .await
            {
                warn!(error = %err, "failed to record login");
            }
            (
                [(
                    header::SET_COOKIE,
                    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly"),
                )],
                Redirect::to("/dashboard"),
            )
                .into_response()
        }
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Html(layout(
                "Sign in",
                accent,
                None,
                &render_login(Some("Invalid username or password.")),
            )),
        )
            .into_response(),
        Err(err) => internal_error(accent, "login check failed")(err),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(&token);
    }
    (
        [(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0"),
        )],
        Redirect::to("/login"),
    )
        .into_response()
}

// ---- kiosk screens ----

async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    let accent = accent_for(&state);
    match state.store.kiosks() {
        Ok(kiosks) => Html(layout(
            "Kiosks",
            accent,
            Some(&user),
            &render_dashboard(&kiosks),
        ))
        .into_response(),
        Err(err) => internal_error(accent, "failed to list kiosks")(err),
    }
}

async fn create_kiosk(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    let accent = accent_for(&state);
    let count = match state.store.kiosks() {
        Ok(kiosks) => kiosks.len(),
        Err(err) => return internal_error(accent, "failed to list kiosks")(err),
    };
    let kiosk = Kiosk {
        id: format!("kiosk-{}", Utc::now().timestamp_millis()),
        name: format!("New kiosk {}", count + 1),
        location: "Unassigned".to_string(),
        status: KioskStatus::Offline,
        slides: Vec::new(),
    };
    let detail = format!("created kiosk {}", kiosk.name);
    let id = kiosk.id.clone();
    if let Err(err) = state.store.save_kiosk(kiosk).await {
        return internal_error(accent, "failed to create kiosk")(err);
    }
    if let Err(err) = state.store.add_log(&user.username, "CREATE_KIOSK", &detail).await {
        warn!(error = %err, "failed to record kiosk creation");
    }
    Redirect::to(&format!("/kiosks/{id}/edit")).into_response()
}

async fn edit_kiosk_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    let accent = accent_for(&state);
    let kiosk = match state.store.kiosk(&id) {
        Ok(Some(kiosk)) => kiosk,
        Ok(None) => return not_found_page(accent, &user, &id),
        Err(err) => return internal_error(accent, "failed to load kiosk")(err),
    };
    let slides_yaml = serde_yaml::to_string(&kiosk.slides).unwrap_or_default();
    Html(layout(
        &format!("Edit {}", kiosk.name),
        accent,
        Some(&user),
        &render_kiosk_edit(&kiosk, &slides_yaml, None),
    ))
    .into_response()
}

#[derive(Deserialize)]
struct KioskForm {
    name: String,
    location: String,
    status: String,
    slides: String,
}

fn parse_status(raw: &str) -> KioskStatus {
    KioskStatus::ALL
        .iter()
        .copied()
        .find(|status| status.as_str() == raw)
        .unwrap_or(KioskStatus::Offline)
}

async fn save_kiosk(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<KioskForm>,
) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    let accent = accent_for(&state);
    let mut kiosk = match state.store.kiosk(&id) {
        Ok(Some(kiosk)) => kiosk,
        Ok(None) => return not_found_page(accent, &user, &id),
        Err(err) => return internal_error(accent, "failed to load kiosk")(err),
    };
    let status = parse_status(&form.status);
    let slides: Vec<Slide> = if form.slides.trim().is_empty() {
        Vec::new()
    } else {
        match serde_yaml::from_str(&form.slides) {
            Ok(slides) => slides,
            Err(err) => {
                kiosk.name = form.name;
                kiosk.location = form.location;
                kiosk.status = status;
                let message = format!("Playlist is not valid YAML: {err}");
                return (
                    StatusCode::BAD_REQUEST,
                    Html(layout(
                        &format!("Edit {}", kiosk.name),
                        accent,
                        Some(&user),
                        &render_kiosk_edit(&kiosk, &form.slides, Some(&message)),
                    )),
                )
                    .into_response();
            }
        }
    };
    kiosk.name = form.name;
    kiosk.location = form.location;
    kiosk.status = status;
    kiosk.slides = slides;
    let detail = format!("updated kiosk {}", kiosk.name);
    if let Err(err) = state.store.save_kiosk(kiosk).await {
        return internal_error(accent, "failed to save kiosk")(err);
    }
    if let Err(err) = state.store.add_log(&user.username, "UPDATE_KIOSK", &detail).await {
        warn!(error = %err, "failed to record kiosk update");
    }
    Redirect::to("/dashboard").into_response()
}

// ---- offline feeds and exports ----

/// Public feed the exported JSON player can point at directly.
async fn kiosk_config_json(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.kiosk(&id) {
        Ok(Some(kiosk)) => {
            axum::Json(OfflineConfig::for_kiosk(&kiosk)).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!(error = %err, "failed to serve offline config");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn attachment(filename: &str, content_type: &'static str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn export_generic_player(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if current_user(&state, &headers).is_none() {
        return Redirect::to("/login").into_response();
    }
    let artifact = PlayerArtifact::generic_json(state.rotation.fallback_dwell, state.retry_delay);
    attachment(
        "generic-player.html",
        "text/html; charset=utf-8",
        artifact.render().into_bytes(),
    )
}

async fn export_kiosk_player(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    let accent = accent_for(&state);
    match state.store.kiosk(&id) {
        Ok(Some(kiosk)) => {
            let artifact =
                PlayerArtifact::kiosk_json(&kiosk, state.rotation.fallback_dwell, state.retry_delay);
            attachment(
                &format!("{id}.html"),
                "text/html; charset=utf-8",
                artifact.render().into_bytes(),
            )
        }
        Ok(None) => not_found_page(accent, &user, &id),
        Err(err) => internal_error(accent, "failed to export player")(err),
    }
}

async fn export_sqlite_player(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    let accent = accent_for(&state);
    let settings = state.store.settings().unwrap_or_default();
    match state.store.kiosk(&id) {
        Ok(Some(kiosk)) => {
            let artifact = PlayerArtifact::kiosk_sqlite(
                &kiosk,
                &settings.db_server_url,
                state.rotation.fallback_dwell,
                state.retry_delay,
            );
            attachment(
                &format!("{id}-sqlite.html"),
                "text/html; charset=utf-8",
                artifact.render().into_bytes(),
            )
        }
        Ok(None) => not_found_page(accent, &user, &id),
        Err(err) => internal_error(accent, "failed to export player")(err),
    }
}

async fn export_kiosk_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    let accent = accent_for(&state);
    match state.store.kiosk(&id) {
        Ok(Some(kiosk)) => {
            let config = OfflineConfig::for_kiosk(&kiosk);
            match serde_json::to_vec_pretty(&config) {
                Ok(bytes) => attachment(&format!("{id}.json"), "application/json", bytes),
                Err(err) => internal_error(accent, "failed to serialize offline config")(err.into()),
            }
        }
        Ok(None) => not_found_page(accent, &user, &id),
        Err(err) => internal_error(accent, "failed to export offline config")(err),
    }
}

async fn export_master_db(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if current_user(&state, &headers).is_none() {
        return Redirect::to("/login").into_response();
    }
    let accent = accent_for(&state);
    let kiosks = match state.store.kiosks() {
        Ok(kiosks) => kiosks,
        Err(err) => return internal_error(accent, "failed to list kiosks")(err),
    };
    let bytes = tokio::task::spawn_blocking(move || export::master_db_bytes(&kiosks)).await;
    match bytes {
        Ok(Ok(bytes)) => attachment("master.sqlite", "application/octet-stream", bytes),
        Ok(Err(err)) => internal_error(accent, "failed to build master bundle")(err),
        Err(err) => {
            error!(error = %err, "master bundle task panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ---- player surface ----

async fn player_page(Path(id): Path<String>) -> Html<String> {
    Html(render_player_page(&id))
}

async fn player_events(
    State(state): State<AppState>,
    Path(kiosk_id): Path<String>,
) -> impl IntoResponse {
    let (tx, mut rx) = mpsc::channel::<PlayerEvent>(16);
    let cancel = CancellationToken::new();
    let source: Arc<dyn PlaylistSource> = Arc::new(state.store.clone());
    let opts = state.rotation;
    tokio::spawn({
        let cancel = cancel.clone();
        let kiosk_id = kiosk_id.clone();
        async move {
            if let Err(err) = rotation::run(source, kiosk_id, opts, tx, cancel).await {
                error!(error = %err, "player session ended with error");
            }
        }
    });

    // Dropping the stream (client gone) cancels the engine and with it both
    // of its timers.
    let guard = cancel.drop_guard();
    let stream = stream! {
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => yield Ok::<_, Infallible>(Event::default().event("display").data(json)),
                Err(err) => error!(error = %err, "failed to serialize player event"),
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ---- user management ----

async fn users_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    if !user.is_admin() {
        return Redirect::to("/dashboard").into_response();
    }
    let accent = accent_for(&state);
    match state.store.users() {
        Ok(users) => Html(layout(
            "Users",
            accent,
            Some(&user),
            &render_users(&users, &user, None),
        ))
        .into_response(),
        Err(err) => internal_error(accent, "failed to list users")(err),
    }
}

#[derive(Deserialize)]
struct UserForm {
    username: String,
    password: String,
    full_name: String,
    role: String,
}

async fn save_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<UserForm>,
) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    if !user.is_admin() {
        return Redirect::to("/dashboard").into_response();
    }
    let accent = accent_for(&state);
    if form.username.trim().is_empty() || form.password.is_empty() {
        let users = state.store.users().unwrap_or_default();
        return (
            StatusCode::BAD_REQUEST,
            Html(layout(
                "Users",
                accent,
                Some(&user),
                &render_users(&users, &user, Some("Username and password are required.")),
            )),
        )
            .into_response();
    }
    let existing = match state.store.find_user(form.username.trim()) {
        Ok(existing) => existing.is_some(),
        Err(err) => return internal_error(accent, "failed to look up user")(err),
    };
    let role = if form.role == "admin" {
        UserRole::Admin
    } else {
        UserRole::User
    };
    let record = User {
        username: form.username.trim().to_string(),
        password: form.password,
        role,
        full_name: form.full_name,
    };
    let (action, detail) = if existing {
        ("UPDATE_USER", format!("updated account {}", record.username))
    } else {
        ("CREATE_USER", format!("created account {}", record.username))
    };
    if let Err(err) = state.store.save_user(record).await {
        return internal_error(accent, "failed to save user")(err);
    }
    if let Err(err) = state.store.add_log(&user.username, action, &detail).await {
        warn!(error = %err, "failed to record user change");
    }
    Redirect::to("/users").into_response()
}

async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    if !user.is_admin() {
        return Redirect::to("/dashboard").into_response();
    }
    let accent = accent_for(&state);
    if username == user.username {
        let users = state.store.users().unwrap_or_default();
        return (
            StatusCode::BAD_REQUEST,
            Html(layout(
                "Users",
                accent,
                Some(&user),
                &render_users(&users, &user, Some("You cannot delete your own account.")),
            )),
        )
            .into_response();
    }
    match state.store.delete_user(&username).await {
        Ok(()) => {
            let detail = format!("deleted account {username}");
            if let Err(err) = state.store.add_log(&user.username, "DELETE_USER", &detail).await {
                warn!(error = %err, "failed to record user deletion");
            }
            Redirect::to("/users").into_response()
        }
        Err(Error::UserNotFound(_)) => Redirect::to("/users").into_response(),
        Err(err) => internal_error(accent, "failed to delete user")(err),
    }
}

// ---- logs and settings ----

async fn logs_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    let accent = accent_for(&state);
    match state.store.logs() {
        Ok(entries) => Html(layout(
            "Activity log",
            accent,
            Some(&user),
            &render_logs(&entries),
        ))
        .into_response(),
        Err(err) => internal_error(accent, "failed to list log entries")(err),
    }
}

async fn settings_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    if !user.is_admin() {
        return Redirect::to("/dashboard").into_response();
    }
    let accent = accent_for(&state);
    let settings = state.store.settings().unwrap_or_default();
    Html(layout(
        "Settings",
        accent,
        Some(&user),
        &render_settings(&settings, false),
    ))
    .into_response()
}

#[derive(Deserialize)]
struct SettingsForm {
    theme_color: String,
    db_server_url: String,
}

async fn save_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SettingsForm>,
) -> Response {
    let Some(user) = current_user(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    if !user.is_admin() {
        return Redirect::to("/dashboard").into_response();
    }
    let settings = Settings {
        theme_color: form.theme_color,
        db_server_url: form.db_server_url.trim().to_string(),
    };
    let accent = accent_hex(&settings.theme_color);
    if let Err(err) = state.store.save_settings(settings.clone()).await {
        return internal_error(accent, "failed to save settings")(err);
    }
    if let Err(err) = state
        .store
        .add_log(&user.username, "UPDATE_SETTINGS", "updated theme and bundle address")
        .await
    {
        warn!(error = %err, "failed to record settings change");
    }
    Html(layout(
        "Settings",
        accent,
        Some(&user),
        &render_settings(&settings, true),
    ))
    .into_response()
}

// ---- rendering ----

fn not_found_page(accent: &'static str, user: &User, id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(layout(
            "Not found",
            accent,
            Some(user),
            &format!(
                "<h2>Unknown kiosk</h2><p>No kiosk with id <code>{}</code>.</p><p><a href=\"/dashboard\">Back to dashboard</a></p>",
                escape_html(id)
            ),
        )),
    )
        .into_response()
}

fn render_login(message: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str("<div class=\"login-card\"><h1>Kiosk Console</h1>");
    if let Some(message) = message {
        body.push_str(&format!("<p class=\"error\">{}</p>", escape_html(message)));
    }
    body.push_str("<form method=\"post\" action=\"/login\" class=\"stacked\">");
    body.push_str("<label>Username<input type=\"text\" name=\"username\" autofocus></label>");
    body.push_str("<label>Password<input type=\"password\" name=\"password\"></label>");
    body.push_str("<button type=\"submit\">Sign in</button>");
    body.push_str("</form></div>");
    body
}

fn render_dashboard(kiosks: &[Kiosk]) -> String {
    let mut body = String::new();
    body.push_str("<div class=\"page-head\"><h1>Kiosks</h1><div class=\"actions\">");
    body.push_str(
        "<a class=\"button secondary\" href=\"/export/generic-player.html\">Generic player</a>",
    );
    body.push_str(
        "<a class=\"button secondary\" href=\"/export/master.sqlite\">Master bundle</a>",
    );
    body.push_str(
        "<form method=\"post\" action=\"/kiosks\"><button type=\"submit\">Add kiosk</button></form>",
    );
    body.push_str("</div></div>");
    if kiosks.is_empty() {
        body.push_str("<p class=\"note\">No kiosks yet. Add one to get started.</p>");
        return body;
    }
    body.push_str("<div class=\"cards\">");
    for kiosk in kiosks {
        let encoded = utf8_percent_encode(&kiosk.id, SAFE_PATH_SEGMENT).to_string();
        body.push_str("<div class=\"card\">");
        body.push_str(&format!(
            "<div class=\"card-top\"><span class=\"status {}\">{}</span><span class=\"kiosk-id\">{}</span></div>",
            kiosk.status,
            kiosk.status,
            escape_html(&kiosk.id)
        ));
        body.push_str(&format!(
            "<h3>{}</h3><p class=\"muted\">{}</p><p class=\"muted\">{} slide(s)</p>",
            escape_html(&kiosk.name),
            escape_html(&kiosk.location),
            kiosk.slides.len()
        ));
        body.push_str("<div class=\"card-actions\">");
        body.push_str(&format!(
            "<a class=\"button\" href=\"/kiosks/{encoded}/edit\">Edit</a>"
        ));
        body.push_str(&format!(
            "<a class=\"button secondary\" href=\"/player/{encoded}\" target=\"_blank\">Player</a>"
        ));
        body.push_str("</div><div class=\"card-actions\">");
        body.push_str(&format!(
            "<a class=\"mini\" href=\"/kiosks/{encoded}/export/player.html\" title=\"Standalone JSON-backed player\">player.html</a>"
        ));
        body.push_str(&format!(
            "<a class=\"mini\" href=\"/kiosks/{encoded}/export/sqlite-player.html\" title=\"Standalone SQLite-backed player\">sqlite.html</a>"
        ));
        body.push_str(&format!(
            "<a class=\"mini\" href=\"/kiosks/{encoded}/export/config.json\" title=\"Offline playlist document\">config.json</a>"
        ));
        body.push_str("</div></div>");
    }
    body.push_str("</div>");
    body
}

fn render_kiosk_edit(kiosk: &Kiosk, slides_yaml: &str, message: Option<&str>) -> String {
    let encoded = utf8_percent_encode(&kiosk.id, SAFE_PATH_SEGMENT).to_string();
    let mut body = String::new();
    body.push_str(&format!("<h1>Edit {}</h1>", escape_html(&kiosk.name)));
    if let Some(message) = message {
        body.push_str(&format!("<p class=\"error\">{}</p>", escape_html(message)));
    }
    body.push_str(&format!(
        "<form method=\"post\" action=\"/kiosks/{encoded}/save\" class=\"stacked\">"
    ));
    body.push_str(&format!(
        "<label>Name<input type=\"text\" name=\"name\" value=\"{}\"></label>",
        escape_html(&kiosk.name)
    ));
    body.push_str(&format!(
        "<label>Location<input type=\"text\" name=\"location\" value=\"{}\"></label>",
        escape_html(&kiosk.location)
    ));
    body.push_str("<label>Status<select name=\"status\">");
    for status in KioskStatus::ALL {
        let selected = if *status == kiosk.status { " selected" } else { "" };
        body.push_str(&format!(
            "<option value=\"{status}\"{selected}>{status}</option>"
        ));
    }
    body.push_str("</select></label>");
    body.push_str("<label>Playlist (one entry per slide; order is rotation order)");
    body.push_str(&format!(
        "<textarea name=\"slides\" rows=\"18\" spellcheck=\"false\">{}</textarea></label>",
        escape_html(slides_yaml)
    ));
    body.push_str(
        "<p class=\"note\">Each slide needs <code>id</code>, <code>kind</code> (url or image) and <code>source</code>; <code>duration-secs</code> below 1 falls back to 10 seconds.</p>",
    );
    body.push_str("<div class=\"form-actions\"><button type=\"submit\">Save changes</button> <a class=\"secondary\" href=\"/dashboard\">Cancel</a></div>");
    body.push_str("</form>");
    body
}

fn render_users(users: &[User], current: &User, message: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str("<h1>Users</h1>");
    if let Some(message) = message {
        body.push_str(&format!("<p class=\"error\">{}</p>", escape_html(message)));
    }
    body.push_str("<table><thead><tr><th>Username</th><th>Full name</th><th>Role</th><th></th></tr></thead><tbody>");
    for user in users {
        let encoded = utf8_percent_encode(&user.username, SAFE_PATH_SEGMENT).to_string();
        body.push_str("<tr>");
        body.push_str(&format!("<td>{}</td>", escape_html(&user.username)));
        body.push_str(&format!("<td>{}</td>", escape_html(&user.full_name)));
        body.push_str(&format!("<td>{}</td>", user.role));
        body.push_str("<td class=\"actions\">");
        if user.username != current.username {
            body.push_str(&format!(
                "<form method=\"post\" action=\"/users/{encoded}/delete\" onsubmit=\"return confirm('Delete user {}?');\"><button type=\"submit\" class=\"danger\">Delete</button></form>",
                escape_html(&user.username)
            ));
        }
        body.push_str("</td></tr>");
    }
    body.push_str("</tbody></table>");
    body.push_str("<h2>Add or update a user</h2>");
    body.push_str("<form method=\"post\" action=\"/users/save\" class=\"stacked\">");
    body.push_str("<label>Username<input type=\"text\" name=\"username\"></label>");
    body.push_str("<label>Password<input type=\"password\" name=\"password\"></label>");
    body.push_str("<label>Full name<input type=\"text\" name=\"full_name\"></label>");
    body.push_str("<label>Role<select name=\"role\"><option value=\"user\">user</option><option value=\"admin\">admin</option></select></label>");
    body.push_str("<div class=\"form-actions\"><button type=\"submit\">Save user</button></div>");
    body.push_str("</form>");
    body
}

fn render_logs(entries: &[LogEntry]) -> String {
    let mut body = String::new();
    body.push_str("<h1>Activity log</h1>");
    if entries.is_empty() {
        body.push_str("<p class=\"note\">Nothing logged yet.</p>");
        return body;
    }
    body.push_str("<table><thead><tr><th>When</th><th>User</th><th>Action</th><th>Details</th></tr></thead><tbody>");
    for entry in entries {
        body.push_str("<tr>");
        body.push_str(&format!(
            "<td class=\"mono\">{}</td>",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S")
        ));
        body.push_str(&format!("<td>{}</td>", escape_html(&entry.username)));
        body.push_str(&format!("<td class=\"mono\">{}</td>", escape_html(&entry.action)));
        body.push_str(&format!("<td>{}</td>", escape_html(&entry.details)));
        body.push_str("</tr>");
    }
    body.push_str("</tbody></table>");
    body
}

fn render_settings(settings: &Settings, saved: bool) -> String {
    let mut body = String::new();
    body.push_str("<h1>Settings</h1>");
    if saved {
        body.push_str("<p class=\"ok\">Settings saved.</p>");
    }
    body.push_str("<form method=\"post\" action=\"/settings\" class=\"stacked\">");
    body.push_str("<fieldset><legend>Accent color</legend><div class=\"swatches\">");
    for (name, hex) in THEME_COLORS {
        let checked = if *name == settings.theme_color { " checked" } else { "" };
        body.push_str(&format!(
            "<label class=\"swatch\" style=\"background:{hex}\"><input type=\"radio\" name=\"theme_color\" value=\"{name}\"{checked}><span>{name}</span></label>"
        ));
    }
    body.push_str("</div></fieldset>");
    body.push_str(&format!(
        "<label>Master bundle URL<input type=\"text\" name=\"db_server_url\" value=\"{}\" placeholder=\"http://your-server/master.sqlite\"></label>",
        escape_html(&settings.db_server_url)
    ));
    body.push_str(
        "<p class=\"note\">Export the master bundle and publish it at this address; the SQLite-backed players download it from there.</p>",
    );
    body.push_str("<div class=\"form-actions\"><button type=\"submit\">Save settings</button></div>");
    body.push_str("</form>");
    body
}

fn layout(title: &str, accent: &str, user: Option<&User>, body: &str) -> String {
    let mut nav = String::new();
    if let Some(user) = user {
        nav.push_str("<nav><div class=\"nav-links\">");
        nav.push_str("<a href=\"/dashboard\">Kiosks</a>");
        if user.is_admin() {
            nav.push_str("<a href=\"/users\">Users</a>");
        }
        nav.push_str("<a href=\"/logs\">Logs</a>");
        if user.is_admin() {
            nav.push_str("<a href=\"/settings\">Settings</a>");
        }
        nav.push_str("</div><div class=\"nav-user\">");
        nav.push_str(&format!("<span>{}</span>", escape_html(&user.full_name)));
        nav.push_str(
            "<form method=\"post\" action=\"/logout\"><button type=\"submit\" class=\"secondary\">Sign out</button></form>",
        );
        nav.push_str("</div></nav>");
    }
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"><title>{} - Kiosk Console</title><style>:root {{ --accent: {accent}; }}\n{}</style></head><body>{nav}<main>{body}</main></body></html>",
        escape_html(title),
        console_styles()
    )
}

fn console_styles() -> &'static str {
    "body { font-family: sans-serif; margin: 0; padding: 0; background: #0f172a; color: #e2e8f0; }\n\
main { max-width: 1080px; margin: 0 auto; padding: 24px; }\n\
h1, h2 { margin-top: 0; }\n\
nav { display: flex; justify-content: space-between; align-items: center; padding: 12px 24px; background: #1e293b; border-bottom: 2px solid var(--accent); }\n\
nav a { color: #e2e8f0; text-decoration: none; margin-right: 16px; }\n\
nav a:hover { color: var(--accent); }\n\
.nav-user { display: flex; align-items: center; gap: 12px; color: #94a3b8; }\n\
table { width: 100%; border-collapse: collapse; margin-top: 16px; }\n\
th, td { border-bottom: 1px solid #334155; padding: 8px; text-align: left; vertical-align: middle; }\n\
tr:hover { background: #1e293b; }\n\
form { display: inline-block; margin: 0; }\n\
form.stacked { display: block; max-width: 640px; }\n\
form.stacked label { display: block; margin-top: 12px; color: #94a3b8; }\n\
input, select, textarea { width: 100%; box-sizing: border-box; margin-top: 4px; padding: 8px; border-radius: 6px; border: 1px solid #334155; background: #1e293b; color: #e2e8f0; }\n\
textarea { font-family: monospace; font-size: 0.9rem; }\n\
button, .button { display: inline-block; padding: 8px 14px; font-size: 0.95rem; border-radius: 6px; border: none; background: var(--accent); color: #fff; cursor: pointer; text-decoration: none; }\n\
button:hover, .button:hover { filter: brightness(1.1); }\n\
button.secondary, .button.secondary { background: #334155; }\n\
button.danger { background: #dc2626; }\n\
.page-head { display: flex; justify-content: space-between; align-items: center; }\n\
.page-head .actions { display: flex; gap: 8px; align-items: center; }\n\
.cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 16px; margin-top: 16px; }\n\
.card { background: #1e293b; border: 1px solid #334155; border-radius: 10px; padding: 16px; }\n\
.card h3 { margin: 8px 0 4px; }\n\
.card-top { display: flex; justify-content: space-between; align-items: center; }\n\
.card-actions { display: flex; gap: 8px; margin-top: 10px; flex-wrap: wrap; }\n\
.kiosk-id { font-family: monospace; font-size: 0.75rem; color: #64748b; }\n\
.status { font-size: 0.75rem; padding: 2px 8px; border-radius: 999px; text-transform: uppercase; }\n\
.status.online { background: #14532d; color: #4ade80; }\n\
.status.offline { background: #334155; color: #94a3b8; }\n\
.status.maintenance { background: #713f12; color: #facc15; }\n\
.mini { font-size: 0.8rem; color: #94a3b8; text-decoration: none; font-family: monospace; }\n\
.mini:hover { color: var(--accent); }\n\
.muted { color: #94a3b8; margin: 2px 0; }\n\
.mono { font-family: monospace; font-size: 0.85rem; }\n\
.note { font-size: 0.9rem; color: #64748b; }\n\
.error { background: #450a0a; color: #fca5a5; padding: 12px; border-radius: 6px; }\n\
.ok { background: #052e16; color: #86efac; padding: 12px; border-radius: 6px; }\n\
.form-actions { margin-top: 16px; }\n\
.form-actions .secondary { margin-left: 12px; color: var(--accent); text-decoration: none; }\n\
.login-card { max-width: 380px; margin: 10vh auto; background: #1e293b; border: 1px solid #334155; border-radius: 12px; padding: 32px; }\n\
fieldset { border: 1px solid #334155; border-radius: 8px; margin-top: 12px; }\n\
.swatches { display: flex; gap: 12px; }\n\
.swatch { width: 72px; text-align: center; border-radius: 8px; padding: 8px 0; color: #fff; cursor: pointer; }\n\
.swatch input { width: auto; }\n"
}

/// The live surface: a dark full-screen page that applies display states
/// pushed from its engine. The frame is swapped (not re-pointed) on slide
/// changes so the new slide always starts from a fresh document.
fn render_player_page(kiosk_id: &str) -> String {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    page.push_str(&format!(
        "<title>Player - {}</title>\n<style>{PLAYER_STYLE}</style>\n",
        escape_html(kiosk_id)
    ));
    page.push_str("</head>\n<body>\n");
    page.push_str(PLAYER_BODY);
    page.push_str("<script>\n");
    page.push_str(&format!("var KIOSK_ID = {};\n", js_string(kiosk_id)));
    page.push_str(PLAYER_JS);
    page.push_str("</script>\n</body>\n</html>\n");
    page
}

const PLAYER_BODY: &str = r#"<div id="stage"></div>
<div id="panel">
    <div id="panelTitle">Kiosk Player</div>
    <div id="statusText">Connecting...</div>
</div>
<div id="overlay">
    <h3 id="overlayName"></h3>
    <p id="overlayLocation" class="muted"></p>
    <div class="overlay-row"><span>Slide</span><span id="overlayPosition"></span></div>
    <div class="overlay-row"><span>Dwell</span><span id="overlayDwell"></span></div>
    <button onclick="toggleFullScreen()">Full screen</button>
</div>
<div id="linkBadge">link lost, retrying...</div>
"#;

const PLAYER_JS: &str = r#"
var stage = document.getElementById('stage');
var panel = document.getElementById('panel');
var statusText = document.getElementById('statusText');
var badge = document.getElementById('linkBadge');
var shownSlideId = null;

function setPanel(text, isError) {
    panel.style.display = 'block';
    statusText.innerText = text;
    statusText.className = isError ? 'error' : '';
}

function showSlide(event) {
    panel.style.display = 'none';
    document.getElementById('overlayName').innerText = event.kiosk.name;
    document.getElementById('overlayLocation').innerText = event.kiosk.location;
    document.getElementById('overlayPosition').innerText = (event.index + 1) + ' / ' + event.total;
    document.getElementById('overlayDwell').innerText = event.dwell_secs + 's';
    if (event.slide.id === shownSlideId) { return; }
    shownSlideId = event.slide.id;
    stage.innerHTML = '';
    var frame = document.createElement('iframe');
    frame.setAttribute('sandbox', 'allow-scripts allow-same-origin allow-forms');
    frame.setAttribute('allow', 'autoplay');
    frame.src = event.slide.source;
    stage.appendChild(frame);
}

function apply(event) {
    badge.style.display = 'none';
    if (event.state === 'slide') {
        showSlide(event);
    } else if (event.state === 'waiting') {
        shownSlideId = null;
        stage.innerHTML = '';
        setPanel('Waiting for content... ' + event.kiosk.name + ' has no slides yet.', false);
    } else if (event.state === 'missing') {
        shownSlideId = null;
        stage.innerHTML = '';
        setPanel('Kiosk not found: ' + event.kiosk_id, true);
    } else if (event.state === 'refresh-failed') {
        // Keep the current slide on screen; just surface the problem.
        badge.innerText = 'refresh failed, retrying: ' + event.message;
        badge.style.display = 'block';
    }
}

var es = new EventSource('/player/' + encodeURIComponent(KIOSK_ID) + '/events');
es.addEventListener('display', function (msg) { apply(JSON.parse(msg.data)); });
es.onerror = function () {
    badge.innerText = 'link lost, retrying...';
    badge.style.display = 'block';
};

function toggleFullScreen() {
    if (!document.fullscreenElement) {
        document.documentElement.requestFullscreen();
    } else {
        document.exitFullscreen();
    }
}
"#;

// Styles for the player surface only; console chrome lives in
// `console_styles`.
const PLAYER_STYLE: &str = "\
body, html { margin: 0; padding: 0; width: 100%; height: 100%; overflow: hidden; background: #000; cursor: none; }\n\
#stage, #stage iframe { position: absolute; inset: 0; width: 100%; height: 100%; border: none; }\n\
#panel { position: absolute; top: 50%; left: 50%; transform: translate(-50%, -50%); color: #888; font-family: sans-serif; text-align: center; z-index: 10; background: rgba(0,0,0,0.8); padding: 2rem; border-radius: 1rem; }\n\
#panelTitle { margin-bottom: 10px; font-size: 24px; color: white; }\n\
#statusText { font-size: 14px; color: #ccc; }\n\
#statusText.error { color: #ff6b6b; }\n\
#overlay { position: absolute; top: 16px; right: 16px; z-index: 20; background: rgba(15,23,42,0.92); color: #e2e8f0; font-family: sans-serif; padding: 16px 20px; border-radius: 12px; border: 1px solid #334155; opacity: 0; transition: opacity 0.2s; cursor: auto; }\n\
body:hover #overlay { opacity: 1; }\n\
body:hover { cursor: auto; }\n\
#overlay h3 { margin: 0 0 2px; }\n\
#overlay .muted { margin: 0 0 10px; color: #94a3b8; font-size: 0.85rem; }\n\
.overlay-row { display: flex; justify-content: space-between; gap: 24px; font-family: monospace; font-size: 0.85rem; color: #cbd5e1; }\n\
#overlay button { margin-top: 12px; width: 100%; padding: 6px; border: none; border-radius: 6px; background: #3b82f6; color: white; cursor: pointer; }\n\
#linkBadge { display: none; position: absolute; bottom: 12px; left: 12px; z-index: 30; background: rgba(69,10,10,0.9); color: #fca5a5; font-family: monospace; font-size: 12px; padding: 6px 10px; border-radius: 6px; }\n";
