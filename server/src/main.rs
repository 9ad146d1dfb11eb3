use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod handlers;
mod state;

use crate::handlers::{ping_handler, root_handler};
use crate::state::AppState;

const DEFAULT_PORT: u16 = 3000;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding index.html, pad.html and the wasm bundle.
    #[arg(long)]
    public_dir: Option<PathBuf>,
    /// Overrides the PORT environment variable.
    #[arg(long)]
    port: Option<u16>,
}

fn resolve_port(flag: Option<u16>, env: Option<String>) -> u16 {
    flag.or_else(|| env.and_then(|value| value.trim().parse().ok()))
        .unwrap_or(DEFAULT_PORT)
}

fn build_router(state: AppState) -> Router {
    // Static assets are revalidated on every load.
    Router::new()
        .route("/", get(root_handler))
        .route("/ping", get(ping_handler))
        .fallback_service(ServeDir::new(&state.public_dir).append_index_html_on_directories(true))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signflow_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let public_dir = args
        .public_dir
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../public"));
    if !public_dir.join("index.html").is_file() {
        tracing::warn!(path = %public_dir.display(), "No index.html in public dir");
    }
    let app = build_router(AppState::new(public_dir));

    let port = resolve_port(args.port, std::env::var("PORT").ok());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("SignFlow running at http://localhost:{port}");
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn public_fixture(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("signflow-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<div id=\"pdf-wrapper\"></div>").unwrap();
        std::fs::write(dir.join("pad.html"), "<canvas id=\"signature-pad\"></canvas>").unwrap();
        dir
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn port_flag_wins_over_env() {
        assert_eq!(resolve_port(Some(8080), Some("4000".into())), 8080);
        assert_eq!(resolve_port(None, Some(" 4000 ".into())), 4000);
        assert_eq!(resolve_port(None, Some("nope".into())), DEFAULT_PORT);
        assert_eq!(resolve_port(None, None), DEFAULT_PORT);
    }

    #[test]
    fn parses_cli_flags() {
        let args = Args::try_parse_from([
            "signflow_server",
            "--port",
            "5000",
            "--public-dir",
            "/srv/www",
        ])
        .unwrap();
        assert_eq!(args.port, Some(5000));
        assert_eq!(args.public_dir, Some(PathBuf::from("/srv/www")));
        assert!(Args::try_parse_from(["signflow_server", "--port", "huge"]).is_err());
    }

    #[tokio::test]
    async fn serves_index_at_root() {
        let app = build_router(AppState::new(public_fixture("root")));
        let response = get(app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("pdf-wrapper"));
    }

    #[tokio::test]
    async fn serves_pad_page_and_rejects_unknown_paths() {
        let dir = public_fixture("static");
        let response = get(build_router(AppState::new(dir.clone())), "/pad.html").await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = get(build_router(AppState::new(dir)), "/missing.js").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_index_is_a_server_error() {
        let dir = std::env::temp_dir().join(format!("signflow-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let response = get(build_router(AppState::new(dir)), "/").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn ping_is_empty() {
        let app = build_router(AppState::new(public_fixture("ping")));
        assert_eq!(get(app, "/ping").await.status(), StatusCode::NO_CONTENT);
    }
}
