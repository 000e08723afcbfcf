//! Media server for remote generation.
//!
//! Serves the public media directory over HTTP so a hosted lip-sync backend
//! can fetch the audio and face it was given. Point
//! `remote.public_base_url` at wherever this server is reachable.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::ArtifactStore;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Shared application state.
struct AppState {
    root: PathBuf,
}

/// Run the media server.
pub async fn run_serve(host: &str, port: u16, settings: &Settings) -> anyhow::Result<()> {
    let root = settings.public_root();
    ArtifactStore::ensure_directory(&root)?;

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Parla Media Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Serving", &root.display().to_string());
    match &settings.remote.public_base_url {
        Some(base) => Output::kv("Public base URL", base),
        None => Output::warning(
            "remote.public_base_url is not set; remote jobs cannot reference local files",
        ),
    }
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("List Files", "GET  /files");
    Output::kv("Media", "GET  /{file}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(root))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

fn router(root: PathBuf) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = Arc::new(AppState { root: root.clone() });

    Router::new()
        .route("/health", get(health))
        .route("/files", get(list_files))
        .with_state(state)
        .fallback_service(ServeDir::new(root))
        .layer(cors)
}

// === Response Types ===

#[derive(Serialize)]
struct FileListResponse {
    files: Vec<FileInfo>,
}

#[derive(Serialize)]
struct FileInfo {
    name: String,
    size_bytes: u64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn list_files(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut entries = match tokio::fs::read_dir(&state.root).await {
        Ok(entries) => entries,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    };

    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if meta.is_file() {
            files.push(FileInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                size_bytes: meta.len(),
            });
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));

    Json(FileListResponse { files }).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn(root: PathBuf) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(root)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_serves_media_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("speech.wav"), b"RIFF").unwrap();
        let base = spawn(dir.path().to_path_buf()).await;

        let body = reqwest::get(format!("{}/speech.wav", base))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&body[..], b"RIFF");

        let missing = reqwest::get(format!("{}/nope.wav", base)).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_lists_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"12345").unwrap();
        std::fs::write(dir.path().join("a.wav"), b"1").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let base = spawn(dir.path().to_path_buf()).await;

        let json: serde_json::Value = reqwest::get(format!("{}/files", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let files = json["files"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0]["name"], "a.wav");
        assert_eq!(files[1]["size_bytes"], 5);
    }
}
