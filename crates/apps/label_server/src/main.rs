use std::env;
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use labels::{AppendRequest, AppendResponse, FileLabelStore, LabelRecord};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    store: Arc<FileLabelStore>,
}

#[derive(Debug, Deserialize)]
struct WorldQuery {
    #[serde(default)]
    world: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let root = env_var_string("LABELS_ROOT", "data");
    let addr: SocketAddr = env_var_string("LABELS_ADDR", "127.0.0.1:9200").parse()?;

    let state = AppState {
        store: Arc::new(FileLabelStore::new(PathBuf::from(root))),
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "label server listening on http://{addr} (store {})",
        state.store.root().display()
    );
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/labels", get(list_labels).post(append_label))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

async fn list_labels(
    State(state): State<AppState>,
    Query(query): Query<WorldQuery>,
) -> Result<Json<Vec<LabelRecord>>, (StatusCode, Json<Value>)> {
    let labels = state.store.list(&query.world).await.map_err(|e| {
        error!("label read failed: {e}");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read labels: {e}"),
        )
    })?;
    Ok(Json(labels))
}

async fn append_label(
    State(state): State<AppState>,
    Json(req): Json<AppendRequest>,
) -> Result<Json<AppendResponse>, (StatusCode, Json<Value>)> {
    let ts = chrono::Utc::now().timestamp();
    let count = state
        .store
        .append(&req.world, req.label, ts)
        .await
        .map_err(|e| {
            error!("label write failed: {e}");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to write labels: {e}"),
            )
        })?;
    Ok(Json(AppendResponse { ok: true, count }))
}

fn env_var_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use labels::{LabelClient, NewLabel};

    async fn spawn(root: PathBuf) -> LabelClient {
        let state = AppState {
            store: Arc::new(FileLabelStore::new(root)),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(state)).await.unwrap();
        });
        LabelClient::new(format!("http://{addr}"))
    }

    #[tokio::test]
    async fn append_then_list_round_trips_through_http() {
        let dir = tempfile::tempdir().unwrap();
        let client = spawn(dir.path().to_path_buf()).await;

        assert!(client.fetch_all("mars").await.unwrap().is_empty());
        let count = client
            .append("Mars", NewLabel::new(-4.6, 137.4, "Gale").with_desc("MSL"))
            .await
            .unwrap();
        assert_eq!(count, 1);
        let count = client.append("mars", NewLabel::default()).await.unwrap();
        assert_eq!(count, 2);

        let labels = client.fetch_all("mars").await.unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].title, "Gale");
        assert_eq!(labels[0].desc, "MSL");
        assert_eq!(labels[1].title, "Label");
        assert!(labels[0].ts > 0);
        assert!(client.fetch_all("earth").await.unwrap().is_empty());
        assert!(dir.path().join("labels-mars.json").exists());
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let dir = tempfile::tempdir().unwrap();
        let client = spawn(dir.path().to_path_buf()).await;
        let url = client.labels_url().replace("/api/labels", "/healthz");
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(resp.text().await.unwrap(), "ok");
    }
}
