//! HTTP routes for the web form.

use crate::page::{render, PageView};
use crate::session::{run_generation, SessionState, SessionStore};
use axum::{
    extract::{DefaultBodyLimit, Form, Multipart, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use pptscript_core::{ChatModel, Config, DocumentLoader, Error};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "pptscript_session";

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<dyn DocumentLoader + Send + Sync>,
    pub model: Arc<dyn ChatModel + Send + Sync>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Create state with a fresh session store seeded from `defaults`.
    pub fn new(
        defaults: Config,
        loader: Arc<dyn DocumentLoader + Send + Sync>,
        model: Arc<dyn ChatModel + Send + Sync>,
    ) -> Self {
        Self {
            loader,
            model,
            sessions: Arc::new(SessionStore::new(defaults)),
        }
    }

    fn session(&self, headers: &HeaderMap) -> (Uuid, Arc<Mutex<SessionState>>, bool) {
        self.sessions.get_or_create(session_id(headers))
    }
}

/// Create the router with all form routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/upload", post(upload_handler))
        .route("/settings", post(settings_handler))
        .route("/generate", post(generate_handler))
        .route("/download", get(download_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Read the session id from the `Cookie` header.
fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// Attach `Set-Cookie` when the session was just created.
fn with_session(mut response: Response, id: Uuid, created: bool) -> Response {
    if created {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

fn back_to_form(id: Uuid, created: bool) -> Response {
    with_session(Redirect::to("/").into_response(), id, created)
}

/// Render the page from cached session state only.
async fn index_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session, created) = state.session(&headers);
    let html = {
        let mut session = session.lock();
        let banner = session.take_banner();
        render(&PageView::from_session(&session, banner))
    };
    with_session(Html(html).into_response(), id, created)
}

/// Store the uploaded deck in the session.
async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let (id, session, created) = state.session(&headers);

    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let filename = field.file_name().unwrap_or("upload.pptx").to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, bytes)),
                    Err(e) => {
                        session.lock().set_error(&Error::InvalidInput(e.to_string()));
                        return back_to_form(id, created);
                    }
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => {
                session.lock().set_error(&Error::InvalidInput(e.to_string()));
                return back_to_form(id, created);
            }
        }
    }

    let Some((filename, bytes)) = upload else {
        session
            .lock()
            .set_error(&Error::InvalidInput("no file was uploaded".to_string()));
        return back_to_form(id, created);
    };

    let result = tokio::task::spawn_blocking({
        let session = Arc::clone(&session);
        move || {
            let mut session = session.lock();
            if let Err(e) = session.store_upload(&filename, &bytes) {
                session.set_error(&e);
            }
        }
    })
    .await;
    if let Err(e) = result {
        log::error!("Upload task failed: {}", e);
    }

    back_to_form(id, created)
}

#[derive(Debug, Deserialize)]
struct SettingsForm {
    model: String,
    /// Kept as text so a bad value lands in the banner instead of a 422.
    temperature: String,
}

/// Apply the sidebar model settings to this session only.
async fn settings_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SettingsForm>,
) -> Response {
    let (id, session, created) = state.session(&headers);
    let result = form
        .temperature
        .trim()
        .parse::<f32>()
        .map_err(|_| {
            Error::InvalidConfig(format!(
                "temperature must be a number, got '{}'",
                form.temperature
            ))
        })
        .and_then(|temperature| session.lock().update_settings(&form.model, temperature));
    if let Err(e) = result {
        session.lock().set_error(&e);
    }
    back_to_form(id, created)
}

/// Extract, then generate once, caching both in the session.
async fn generate_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session, created) = state.session(&headers);

    let loader = Arc::clone(&state.loader);
    let model = Arc::clone(&state.model);
    let result = tokio::task::spawn_blocking(move || {
        if let Err(e) = run_generation(&session, loader.as_ref(), model.as_ref()) {
            session.lock().set_error(&e);
        }
    })
    .await;
    if let Err(e) = result {
        log::error!("Generation task failed: {}", e);
    }

    back_to_form(id, created)
}

/// Serve the cached script as a text file.
async fn download_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session, created) = state.session(&headers);
    let script = session.lock().script().map(str::to_string);

    let response = match script {
        Some(script) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"generated_script.txt\"",
                ),
            ],
            script,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "No script has been generated yet.").into_response(),
    };
    with_session(response, id, created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{CountingModel, StubLoader};
    use axum::body::Body;
    use axum::http::Request;
    use pptscript_core::{ChatMessage, ModelSettings, Role};
    use std::sync::atomic::Ordering;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    const BOUNDARY: &str = "pptscript-test-boundary";

    /// Model that reports when it starts, then waits to be released.
    struct GatedModel {
        started: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl ChatModel for GatedModel {
        fn generate(
            &self,
            _messages: &[ChatMessage],
            _settings: &ModelSettings,
        ) -> pptscript_core::Result<ChatMessage> {
            let _ = self.started.lock().send(());
            let _ = self.release.lock().recv_timeout(Duration::from_secs(5));
            Ok(ChatMessage {
                role: Role::Assistant,
                content: "Narration after wait".to_string(),
            })
        }
    }

    fn test_state(model: Arc<CountingModel>) -> AppState {
        AppState::new(Config::default(), Arc::new(StubLoader), model)
    }

    fn cookie_from(response: &Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn upload_request(cookie: &str, filename: &str) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(b"PK\x03\x04 stub deck");
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn post(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_visit_sets_cookie_and_warns() {
        let app = create_router(test_state(Arc::new(CountingModel::default())));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(cookie_from(&response).starts_with("pptscript_session="));
        let html = body_text(response).await;
        assert!(html.contains("Please upload a PowerPoint file to start!"));
    }

    #[tokio::test]
    async fn test_upload_generate_rerender_download() {
        let model = Arc::new(CountingModel::default());
        let app = create_router(test_state(Arc::clone(&model)));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = cookie_from(&response);

        let response = app.clone().oneshot(upload_request(&cookie, "ml_course.pptx")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let response = app.clone().oneshot(post("/generate", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let html = body_text(app.clone().oneshot(get("/", &cookie)).await.unwrap()).await;
        assert!(html.contains("Extracted Slide Content"));
        assert!(html.contains("### Page-1\nWelcome"));
        assert!(html.contains("Narration take 1"));

        // Further renders come from the session cache.
        app.clone().oneshot(get("/", &cookie)).await.unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let response = app.clone().oneshot(get("/download", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert!(response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("generated_script.txt"));
        assert_eq!(body_text(response).await, "Narration take 1");
    }

    #[tokio::test]
    async fn test_download_without_script_is_not_found() {
        let app = create_router(test_state(Arc::new(CountingModel::default())));
        let response = app
            .oneshot(Request::builder().uri("/download").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generation_error_shows_banner_once() {
        let model = Arc::new(CountingModel {
            fail: true,
            ..Default::default()
        });
        let app = create_router(test_state(model));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = cookie_from(&response);

        app.clone().oneshot(upload_request(&cookie, "deck.pptx")).await.unwrap();
        app.clone().oneshot(post("/generate", &cookie)).await.unwrap();

        let html = body_text(app.clone().oneshot(get("/", &cookie)).await.unwrap()).await;
        assert!(html.contains("An error occurred: Script generation failed."));
        assert!(html.contains("Extracted Slide Content"));

        let html = body_text(app.clone().oneshot(get("/", &cookie)).await.unwrap()).await;
        assert!(!html.contains("An error occurred"));
        assert!(html.contains("Generate Script"));
    }

    #[tokio::test]
    async fn test_rejects_non_pptx_upload() {
        let app = create_router(test_state(Arc::new(CountingModel::default())));
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = cookie_from(&response);

        app.clone().oneshot(upload_request(&cookie, "notes.pdf")).await.unwrap();
        let html = body_text(app.clone().oneshot(get("/", &cookie)).await.unwrap()).await;
        assert!(html.contains("is not a .pptx file"));
        assert!(html.contains("Please upload a PowerPoint file to start!"));
    }

    #[tokio::test]
    async fn test_settings_are_per_session() {
        let app = create_router(test_state(Arc::new(CountingModel::default())));
        let first = cookie_from(
            &app.clone()
                .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        );
        let second = cookie_from(
            &app.clone()
                .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        );

        let request = Request::builder()
            .method("POST")
            .uri("/settings")
            .header(header::COOKIE, &first)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("model=gpt-4o&temperature=0.3"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = body_text(app.clone().oneshot(get("/", &first)).await.unwrap()).await;
        assert!(html.contains(r#"<option value="gpt-4o" selected>"#));
        let html = body_text(app.clone().oneshot(get("/", &second)).await.unwrap()).await;
        assert!(html.contains(r#"<option value="gpt-4o-mini" selected>"#));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_render_not_blocked_by_running_generation() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let model = Arc::new(GatedModel {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        });
        let app = create_router(AppState::new(Config::default(), Arc::new(StubLoader), model));

        let cookie = cookie_from(
            &app.clone()
                .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        );
        app.clone().oneshot(upload_request(&cookie, "deck.pptx")).await.unwrap();

        let generating = tokio::spawn(app.clone().oneshot(post("/generate", &cookie)));
        tokio::task::spawn_blocking(move || started_rx.recv_timeout(Duration::from_secs(5)))
            .await
            .unwrap()
            .unwrap();

        let started = Instant::now();
        let html = body_text(app.clone().oneshot(get("/", &cookie)).await.unwrap()).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(html.contains("Generating script..."));
        assert!(html.contains("### Page-1\nWelcome"));

        release_tx.send(()).unwrap();
        let response = generating.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = body_text(app.clone().oneshot(get("/", &cookie)).await.unwrap()).await;
        assert!(html.contains("Narration after wait"));
        assert!(!html.contains("Generating script..."));
    }

    #[tokio::test]
    async fn test_non_numeric_temperature_shows_banner() {
        let app = create_router(test_state(Arc::new(CountingModel::default())));
        let cookie = cookie_from(
            &app.clone()
                .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        );

        let request = Request::builder()
            .method("POST")
            .uri("/settings")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("model=gpt-4o&temperature=warm"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = body_text(app.clone().oneshot(get("/", &cookie)).await.unwrap()).await;
        assert!(html.contains("An error occurred: Invalid configuration: temperature must be a number"));
        assert!(html.contains(r#"<option value="gpt-4o-mini" selected>"#));
    }

    #[test]
    fn test_session_id_parsing() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", SESSION_COOKIE, id)).unwrap(),
        );
        assert_eq!(session_id(&headers), Some(id));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("pptscript_session=garbage"));
        assert_eq!(session_id(&headers), None);
    }
}
