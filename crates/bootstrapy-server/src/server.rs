//! Development server: static files from the output root plus live reload.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::LazyLock;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use regex::Regex;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::ServeDir;

use crate::websocket::{
    livereload_client_script, LiveReloadHub, ReloadMessage, LIVERELOAD_PATH,
    LIVERELOAD_SCRIPT_PATH,
};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory served at `/`
    pub root: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on; 0 picks a free one
    pub port: u16,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Pipeline(#[from] bootstrapy_pipeline::PipelineError),

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    hub: LiveReloadHub,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self {
            config,
            hub: LiveReloadHub::new(),
        }
    }

    /// Hub whose `reload` messages reach every connected browser.
    pub fn hub(&self) -> LiveReloadHub {
        self.hub.clone()
    }

    pub fn config(&self) -> &DevServerConfig {
        &self.config
    }

    /// Bind the listening socket.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(BoundServer {
            listener,
            local_addr,
            app: router(self.config.root, self.hub),
            open: self.config.open,
        })
    }
}

/// A server whose socket is bound but which is not yet accepting.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    app: Router,
    open: bool,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let url = format!("http://{}", self.local_addr);
        tracing::info!("Serving at {}", url);

        if self.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Could not open browser: {}", e);
            }
        }

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)
    }
}

fn router(root: PathBuf, hub: LiveReloadHub) -> Router {
    Router::new()
        .route(LIVERELOAD_PATH, get(ws_handler))
        .route(LIVERELOAD_SCRIPT_PATH, get(script_handler))
        .fallback_service(ServeDir::new(root))
        .layer(middleware::from_fn(inject_livereload))
        .with_state(hub)
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<LiveReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

/// One browser session: subscribed while the socket is open.
async fn handle_ws(mut socket: WebSocket, hub: LiveReloadHub) {
    let mut rx = hub.subscribe();
    tracing::debug!("livereload client connected ({} open)", hub.subscriber_count());

    if send(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(msg) => {
                    if send(&mut socket, &msg).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("livereload client disconnected");
}

async fn send(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        livereload_client_script(),
    )
}

/// Add the client script to successful HTML responses.
///
/// HEAD responses and bodies that are not UTF-8 pass through untouched.
async fn inject_livereload(request: Request, next: Next) -> Response {
    let is_head = request.method() == Method::HEAD;
    let response = next.run(request).await;

    let is_html = response.status() == StatusCode::OK
        && response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));

    if is_head || !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to buffer HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let Ok(html) = std::str::from_utf8(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };

    let html = inject_script(html);
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, Body::from(html))
}

/// Insert the script tag before the last `</body>`, or append it.
fn inject_script(html: &str) -> String {
    static BODY_CLOSE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("Invalid body regex"));

    let tag = format!(r#"<script src="{}"></script>"#, LIVERELOAD_SCRIPT_PATH);

    match BODY_CLOSE.find_iter(html).last() {
        Some(m) => format!("{}{}\n{}", &html[..m.start()], tag, &html[m.start()..]),
        None => format!("{}{}\n", html, tag),
    }
}
