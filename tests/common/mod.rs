//! Minimal mock HTTP server for fetcher-level integration tests, modeled on
//! the teacher's `solvers::tests::mock::http` harness: a small set of
//! per-path expectations served from an in-memory table, bound to an
//! ephemeral local port.

use axum::extract::{Path as AxumPath, State};
use axum::routing::post;
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub enum Response {
    Json(Value),
    Status(u16),
    StatusBody(u16, String),
}

type Table = Arc<Mutex<HashMap<String, Response>>>;

pub struct MockServer {
    pub addr: SocketAddr,
}

impl MockServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url_for(&self, path: &str) -> url::Url {
        url::Url::parse(&format!("{}/{}", self.base_url(), path)).unwrap()
    }
}

pub async fn start(routes: HashMap<&'static str, Response>) -> MockServer {
    let table: Table = Arc::new(Mutex::new(
        routes.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    ));

    let app = Router::new()
        .route("/{path}", post(handler))
        .with_state(table);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer { addr }
}

async fn handler(
    State(table): State<Table>,
    AxumPath(path): AxumPath<String>,
) -> axum::response::Response {
    use axum::response::IntoResponse;
    let table = table.lock().await;
    match table.get(&path) {
        Some(Response::Json(value)) => axum::Json(value.clone()).into_response(),
        Some(Response::Status(code)) => {
            axum::http::StatusCode::from_u16(*code).unwrap().into_response()
        }
        Some(Response::StatusBody(code, body)) => (
            axum::http::StatusCode::from_u16(*code).unwrap(),
            body.clone(),
        )
            .into_response(),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}
