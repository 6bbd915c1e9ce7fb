//! Export generators for kiosk hardware that cannot reach the console: two
//! self-contained HTML players, the per-kiosk offline JSON config, and the
//! master SQLite bundle.
//!
//! The players are rendered from one typed template ([`PlayerArtifact`])
//! so both variants share a single rotation loop and failure policy; only
//! the playlist loader differs. The generated script normalizes whatever it
//! fetched into `{ active, entries: [{url, dwellMs}] }` before rotating.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{FALLBACK_DWELL, Kiosk};

/// Wire shape of the offline JSON playlist: one shared interval for every
/// site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineConfig {
    pub interval: u64,
    pub sites: Vec<String>,
}

impl OfflineConfig {
    /// Collapses per-slide durations into the single interval the offline
    /// format carries: the first slide's effective dwell, or the fallback
    /// for an empty playlist.
    pub fn for_kiosk(kiosk: &Kiosk) -> Self {
        let interval = kiosk
            .slides
            .first()
            .map(|s| s.effective_dwell(FALLBACK_DWELL).as_secs())
            .unwrap_or(FALLBACK_DWELL.as_secs());
        Self {
            interval,
            sites: kiosk.slides.iter().map(|s| s.source.clone()).collect(),
        }
    }
}

/// Screens of the generated player. The names are emitted into the artifact
/// verbatim and double as its CSS state classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    Loading,
    Error,
    Deactivated,
    Empty,
    Playing,
}

impl ScreenState {
    pub const ALL: &'static [Self] = &[
        Self::Loading,
        Self::Error,
        Self::Deactivated,
        Self::Empty,
        Self::Playing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Error => "error",
            Self::Deactivated => "deactivated",
            Self::Empty => "empty",
            Self::Playing => "playing",
        }
    }
}

/// Where the generated player fetches its playlist from.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactSource {
    /// JSON document `{ "interval": <secs>, "sites": [<url>, ...] }`.
    /// With a kiosk id bound, `?id=` rebinds the document to `<id>.json`;
    /// otherwise `?source=` overrides the address outright.
    Json {
        default_source: String,
        kiosk_id: Option<String>,
    },
    /// Binary SQLite bundle opened with an in-page SQL engine. `?source=`
    /// overrides the bundle address, `?id=` the kiosk.
    Sqlite {
        default_source: String,
        kiosk_id: String,
    },
}

/// Template model for one exported player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerArtifact {
    pub title: String,
    pub source: ArtifactSource,
    pub fallback_dwell: Duration,
    pub retry_delay: Duration,
}

impl PlayerArtifact {
    /// The generic player: reads `config.json` next to itself unless told
    /// otherwise.
    pub fn generic_json(fallback_dwell: Duration, retry_delay: Duration) -> Self {
        Self {
            title: "Kiosk Player".to_string(),
            source: ArtifactSource::Json {
                default_source: "config.json".to_string(),
                kiosk_id: None,
            },
            fallback_dwell,
            retry_delay,
        }
    }

    /// A player pre-bound to one kiosk's JSON document.
    pub fn kiosk_json(kiosk: &Kiosk, fallback_dwell: Duration, retry_delay: Duration) -> Self {
        Self {
            title: format!("Kiosk Player - {}", kiosk.name),
            source: ArtifactSource::Json {
                default_source: format!("{}.json", kiosk.id),
                kiosk_id: Some(kiosk.id.clone()),
            },
            fallback_dwell,
            retry_delay,
        }
    }

    /// A player that downloads the master bundle and queries its own kiosk
    /// out of it. An empty `db_url` falls back to a bundle next to the file.
    pub fn kiosk_sqlite(
        kiosk: &Kiosk,
        db_url: &str,
        fallback_dwell: Duration,
        retry_delay: Duration,
    ) -> Self {
        let default_source = if db_url.is_empty() {
            "master.sqlite".to_string()
        } else {
            db_url.to_string()
        };
        Self {
            title: format!("Kiosk Player - {}", kiosk.name),
            source: ArtifactSource::Sqlite {
                default_source,
                kiosk_id: kiosk.id.clone(),
            },
            fallback_dwell,
            retry_delay,
        }
    }

    /// Renders the artifact as a standalone HTML document.
    pub fn render(&self) -> String {
        let mut page = String::new();
        page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        page.push_str("<meta charset=\"UTF-8\">\n");
        page.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        writeln!(page, "<title>{}</title>", escape_html(&self.title)).ok();
        writeln!(page, "<style>{ARTIFACT_STYLE}</style>").ok();
        if matches!(self.source, ArtifactSource::Sqlite { .. }) {
            writeln!(page, "<script src=\"{SQL_ENGINE_CDN}sql-wasm.js\"></script>").ok();
        }
        page.push_str("</head>\n<body>\n");
        writeln!(
            page,
            "<div id=\"panel\"><div id=\"panelTitle\">{}</div><div id=\"statusText\">Loading configuration...</div><div id=\"errorControls\" style=\"display:none;\"><div class=\"hint\">Update source address:</div><input type=\"text\" id=\"sourceInput\" placeholder=\"http://...\"><button onclick=\"retryWithNewSource()\">Retry</button></div></div>",
            escape_html(&self.title)
        )
        .ok();
        page.push_str(
            "<iframe id=\"contentFrame\" sandbox=\"allow-scripts allow-same-origin allow-forms\" allow=\"autoplay\"></iframe>\n",
        );
        page.push_str("<div id=\"sourceDisplay\" class=\"config-info\"></div>\n");

        page.push_str("<script>\n");
        self.push_knobs(&mut page);
        self.push_source_setup(&mut page);
        page.push_str(RUNTIME_JS);
        match &self.source {
            ArtifactSource::Json { .. } => page.push_str(JSON_LOADER_JS),
            ArtifactSource::Sqlite { .. } => page.push_str(SQLITE_LOADER_JS),
        }
        writeln!(page, "setScreen('{}');", ScreenState::Loading.as_str()).ok();
        page.push_str("refresh();\n");
        page.push_str("</script>\n</body>\n</html>\n");
        page
    }

    fn push_knobs(&self, page: &mut String) {
        writeln!(
            page,
            "var FALLBACK_DWELL_MS = {};",
            self.fallback_dwell.as_millis()
        )
        .ok();
        writeln!(page, "var RETRY_DELAY_MS = {};", self.retry_delay.as_millis()).ok();
        writeln!(page, "var FETCH_TIMEOUT_MS = {};", FETCH_TIMEOUT.as_millis()).ok();
        writeln!(page, "var EMPTY_RECHECK_MS = {};", EMPTY_RECHECK.as_millis()).ok();
    }

    fn push_source_setup(&self, page: &mut String) {
        match &self.source {
            ArtifactSource::Json {
                default_source,
                kiosk_id,
            } => {
                writeln!(page, "var currentSource = {};", js_string(default_source)).ok();
                page.push_str("var params = new URLSearchParams(window.location.search);\n");
                if let Some(id) = kiosk_id {
                    writeln!(page, "var KIOSK_ID = {};", js_string(id)).ok();
                    page.push_str(
                        "if (params.get('id')) { KIOSK_ID = params.get('id'); currentSource = KIOSK_ID + '.json'; }\n",
                    );
                }
                page.push_str(
                    "if (params.get('source')) { currentSource = params.get('source'); }\n",
                );
            }
            ArtifactSource::Sqlite {
                default_source,
                kiosk_id,
            } => {
                writeln!(page, "var currentSource = {};", js_string(default_source)).ok();
                writeln!(page, "var KIOSK_ID = {};", js_string(kiosk_id)).ok();
                page.push_str("var params = new URLSearchParams(window.location.search);\n");
                page.push_str("if (params.get('id')) { KIOSK_ID = params.get('id'); }\n");
                page.push_str(
                    "if (params.get('source')) { currentSource = params.get('source'); }\n",
                );
                writeln!(
                    page,
                    "var sqlJsReady = initSqlJs({{ locateFile: function (file) {{ return {} + file; }} }});",
                    js_string(SQL_ENGINE_CDN)
                )
                .ok();
            }
        }
    }
}

/// Writes the master bundle the SQLite-backed player consumes.
pub fn write_master_db(path: &Path, kiosks: &[Kiosk]) -> Result<(), Error> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "CREATE TABLE kiosks (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT NOT NULL,
            is_active INTEGER NOT NULL
        );
        CREATE TABLE slides (
            id TEXT PRIMARY KEY,
            kiosk_id TEXT NOT NULL REFERENCES kiosks(id),
            type TEXT NOT NULL,
            url TEXT NOT NULL,
            duration INTEGER NOT NULL,
            sort_order INTEGER NOT NULL,
            title TEXT
        );
        CREATE INDEX idx_slides_kiosk ON slides(kiosk_id, sort_order);",
    )?;

    let mut insert_kiosk =
        conn.prepare("INSERT INTO kiosks (id, name, location, is_active) VALUES (?1, ?2, ?3, ?4)")?;
    let mut insert_slide = conn.prepare(
        "INSERT INTO slides (id, kiosk_id, type, url, duration, sort_order, title)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for kiosk in kiosks {
        insert_kiosk.execute(params![
            kiosk.id,
            kiosk.name,
            kiosk.location,
            kiosk.is_active()
        ])?;
        for (order, slide) in kiosk.slides.iter().enumerate() {
            let duration = slide.effective_dwell(FALLBACK_DWELL).as_secs() as i64;
            insert_slide.execute(params![
                slide.id,
                kiosk.id,
                slide.kind.as_db_str(),
                slide.source,
                duration,
                order as i64,
                slide.title
            ])?;
        }
    }
    Ok(())
}

/// Builds the master bundle in a scratch directory and returns its bytes.
pub fn master_db_bytes(kiosks: &[Kiosk]) -> Result<Vec<u8>, Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("master.sqlite");
    write_master_db(&path, kiosks)?;
    Ok(std::fs::read(&path)?)
}

/// Artifact fetch timeout; a hung endpoint counts as a failed cycle.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// How soon an empty (but valid) playlist is re-checked.
const EMPTY_RECHECK: Duration = Duration::from_secs(5);

const SQL_ENGINE_CDN: &str = "https://cdnjs.cloudflare.com/ajax/libs/sql.js/1.10.2/";

const ARTIFACT_STYLE: &str = "\
body, html { margin: 0; padding: 0; width: 100%; height: 100%; overflow: hidden; background-color: #000; }\n\
iframe { width: 100%; height: 100%; border: none; display: block; }\n\
#panel { position: absolute; top: 50%; left: 50%; transform: translate(-50%, -50%); color: #888; font-family: sans-serif; text-align: center; z-index: 10; background: rgba(0,0,0,0.8); padding: 2rem; border-radius: 1rem; }\n\
#panelTitle { margin-bottom: 10px; font-size: 24px; color: white; }\n\
#statusText { font-size: 14px; color: #ccc; }\n\
#statusText.error { color: #ff6b6b; }\n\
.hint { font-size: 12px; color: #aaa; margin: 20px 0 5px; }\n\
.config-info { position: absolute; bottom: 10px; right: 10px; color: rgba(255,255,255,0.3); font-family: monospace; font-size: 10px; pointer-events: none; z-index: 20; }\n\
input { background: #333; border: 1px solid #555; color: white; padding: 5px; border-radius: 4px; width: 300px; margin-top: 10px; }\n\
button { background: #3b82f6; border: none; color: white; padding: 5px 15px; border-radius: 4px; cursor: pointer; margin-left: 5px; }\n\
button:hover { background: #2563eb; }\n";

/// Shared runtime: screen handling, timed fetch, and the rotation loop.
/// Loaders feed it `{ active, entries: [{url, dwellMs}] }`.
const RUNTIME_JS: &str = r#"
var frame = document.getElementById('contentFrame');
var panel = document.getElementById('panel');
var statusText = document.getElementById('statusText');
var errorControls = document.getElementById('errorControls');
var sourceInput = document.getElementById('sourceInput');

sourceInput.value = currentSource;
updateSourceDisplay();

function updateSourceDisplay() {
    document.getElementById('sourceDisplay').innerText = 'Source: ' + currentSource;
}

function setScreen(state, message) {
    if (state === 'playing') { panel.style.display = 'none'; return; }
    panel.style.display = 'block';
    errorControls.style.display = state === 'error' ? 'block' : 'none';
    statusText.className = state === 'error' ? 'error' : '';
    if (state === 'loading') { statusText.innerText = 'Loading configuration...'; }
    else if (state === 'empty') { statusText.innerText = 'Playlist loaded but contains no slides.'; }
    else if (state === 'deactivated') { statusText.innerText = 'This kiosk is deactivated.'; }
    else if (state === 'error') { statusText.innerText = 'Connection failed: ' + message + ' (source: ' + currentSource + ')'; }
}

window.retryWithNewSource = function () {
    if (sourceInput.value) {
        currentSource = sourceInput.value;
        updateSourceDisplay();
        setScreen('loading');
        refresh();
    }
};

function sleep(ms) {
    return new Promise(function (resolve) { setTimeout(resolve, ms); });
}

async function fetchFresh(url, kind) {
    var sep = url.indexOf('?') >= 0 ? '&' : '?';
    var busted = url + sep + 't=' + Date.now();
    var ctl = new AbortController();
    var timer = setTimeout(function () { ctl.abort(); }, FETCH_TIMEOUT_MS);
    try {
        var response = await fetch(busted, { cache: 'no-store', signal: ctl.signal });
        if (!response.ok) { throw new Error('HTTP status ' + response.status); }
        return kind === 'binary' ? await response.arrayBuffer() : await response.text();
    } finally {
        clearTimeout(timer);
    }
}

async function playLoop(playlist) {
    if (!playlist.active) {
        setScreen('deactivated');
        setTimeout(refresh, RETRY_DELAY_MS);
        return;
    }
    if (!playlist.entries.length) {
        setScreen('empty');
        setTimeout(refresh, EMPTY_RECHECK_MS);
        return;
    }
    setScreen('playing');
    for (var i = 0; i < playlist.entries.length; i++) {
        frame.src = playlist.entries[i].url;
        await sleep(playlist.entries[i].dwellMs);
    }
    refresh();
}

async function refresh() {
    try {
        var playlist = await fetchPlaylist();
        playLoop(playlist);
    } catch (err) {
        setScreen('error', err.message);
        setTimeout(refresh, RETRY_DELAY_MS);
    }
}
"#;

const JSON_LOADER_JS: &str = r#"
async function fetchPlaylist() {
    var text = await fetchFresh(currentSource, 'text');
    var config;
    try { config = JSON.parse(text); } catch (e) { throw new Error('invalid JSON payload'); }
    if (!config || !Array.isArray(config.sites)) { throw new Error('payload has no "sites" list'); }
    var dwellMs = config.interval > 0 ? config.interval * 1000 : FALLBACK_DWELL_MS;
    return {
        active: true,
        entries: config.sites.map(function (site) { return { url: site, dwellMs: dwellMs }; })
    };
}
"#;

const SQLITE_LOADER_JS: &str = r#"
async function fetchPlaylist() {
    var SQL = await sqlJsReady;
    var buffer = await fetchFresh(currentSource, 'binary');
    var db = new SQL.Database(new Uint8Array(buffer));
    try {
        var kioskStmt = db.prepare('SELECT is_active FROM kiosks WHERE id = :id');
        kioskStmt.bind({ ':id': KIOSK_ID });
        if (!kioskStmt.step()) {
            kioskStmt.free();
            throw new Error('kiosk ' + KIOSK_ID + ' is not in the bundle');
        }
        var active = kioskStmt.get()[0] === 1;
        kioskStmt.free();

        var entries = [];
        var slideStmt = db.prepare('SELECT url, duration FROM slides WHERE kiosk_id = :id ORDER BY sort_order');
        slideStmt.bind({ ':id': KIOSK_ID });
        while (slideStmt.step()) {
            var row = slideStmt.get();
            entries.push({ url: row[0], dwellMs: row[1] > 0 ? row[1] * 1000 : FALLBACK_DWELL_MS });
        }
        slideStmt.free();
        return { active: active, entries: entries };
    } finally {
        db.close();
    }
}
"#;

/// Emits a JS string literal, escaping closing tags so the payload can sit
/// inside an inline script element.
pub(crate) fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\u003c"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
