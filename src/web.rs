//! Web interface for the initializer

use crate::archive::{self, ArchiveOptions};
use crate::cloud::{CapellaClient, Cluster};
use crate::error::{InitializerError, Result};
use crate::scope::{build_scope, package_path};
use crate::templates::{leaf_name, validate_template_path, TemplateStore};
use crate::Config;
use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, Method},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::io::{ReaderStream, SyncIoBridge};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Capacity of the pipe between the archive builder and the response body.
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Template directories
    pub store: Arc<TemplateStore>,
    /// Manifest document, served as-is
    pub manifest: Arc<str>,
    /// Classification keys of files that get placeholder substitution
    pub process_extensions: Arc<HashSet<String>>,
    /// Package path in template file names to rewrite
    pub placeholder_package_path: Arc<str>,
    /// Cloud metadata client, if credentials are configured
    pub cloud: Option<Arc<CapellaClient>>,
}

#[cfg(test)]
static_assertions::assert_impl_all!(AppState: Send, Sync);

impl AppState {
    /// Build the state from configuration, reading the manifest once.
    pub fn from_config(config: &Config) -> Result<Self> {
        let manifest = std::fs::read_to_string(&config.manifest_path)?;
        let cloud = CapellaClient::from_config(&config.capella)?.map(Arc::new);
        if cloud.is_none() {
            info!("no cloud credentials configured, cluster lookups disabled");
        }

        Ok(AppState {
            store: Arc::new(TemplateStore::new(&config.templates_path)),
            manifest: Arc::from(manifest),
            process_extensions: Arc::new(config.process_extension_set()),
            placeholder_package_path: Arc::from(config.placeholder_package_path.as_str()),
            cloud,
        })
    }
}

/// Create the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/manifest.json", get(manifest))
        .route("/project/{*path}", get(project))
        .route("/download/{*path}", get(download).post(download))
        .route("/clusters", get(list_clusters))
        .route(
            "/clusters/{id}/connection-string",
            get(cluster_connection_string),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn manifest(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.manifest.to_string(),
    )
        .into_response()
}

/// Parameters accepted by a template
async fn project(State(state): State<AppState>, Path(path): Path<String>) -> Result<Json<Value>> {
    Ok(Json(state.store.parameters(&path)?))
}

/// Render a template into a streamed ZIP download.
///
/// Everything that can be rejected is checked before the first byte goes out.
/// A failure after that point aborts the response body, leaving the client
/// with a truncated archive.
async fn download(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    Query(mut params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let template = validate_template_path(&path)?;

    if method == Method::POST && !body.is_empty() {
        let form: HashMap<String, String> = serde_urlencoded::from_bytes(&body)
            .map_err(|e| InitializerError::invalid_parameter("body", e.to_string()))?;
        params.extend(form);
    }

    // An unknown template is a 404 whatever the parameters say.
    let dirs = {
        let store = state.store.clone();
        let template = template.clone();
        tokio::task::spawn_blocking(move || store.directory_set(&template)).await??
    };

    let scope = build_scope(&params);
    let options = ArchiveOptions {
        placeholder: state.placeholder_package_path.to_string(),
        package_path: package_path(&scope)?,
        process_extensions: state.process_extensions.as_ref().clone(),
    };

    let entries = {
        let options = options.clone();
        tokio::task::spawn_blocking(move || archive::plan(&dirs, &options)).await??
    };

    info!(template = %template, entries = entries.len(), "streaming archive");

    let (reader, writer) = tokio::io::duplex(STREAM_BUFFER_SIZE);
    let build = tokio::task::spawn_blocking(move || {
        let writer = SyncIoBridge::new(writer);
        archive::write_archive(&entries, &options, &scope, writer)
    });

    let failed_template = template.clone();
    let failure = futures_util::stream::once(async move {
        let e = match build.await {
            Ok(Ok(())) => return None,
            Ok(Err(e)) => std::io::Error::other(e.to_string()),
            Err(e) => std::io::Error::other(e),
        };
        error!(template = %failed_template, error = %e, "archive build failed mid-stream");
        Some(Err::<Bytes, _>(e))
    })
    .filter_map(futures_util::future::ready);

    let filename = format!("{}.zip", leaf_name(&template));
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from_stream(ReaderStream::new(reader).chain(failure)),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    100
}

fn cloud_client(state: &AppState) -> Result<&CapellaClient> {
    state
        .cloud
        .as_deref()
        .ok_or(InitializerError::CloudNotConfigured)
}

/// List clusters from the cloud metadata API
async fn list_clusters(
    State(state): State<AppState>,
    Query(query): Query<ClusterQuery>,
) -> Result<Json<Vec<Cluster>>> {
    let clusters = cloud_client(&state)?
        .clusters(query.page, query.per_page)
        .await?;
    Ok(Json(clusters))
}

/// Resolve the connection string of a cluster
async fn cluster_connection_string(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let connection_string = cloud_client(&state)?.connection_string(&id).await?;
    Ok(Json(serde_json::json!({ "connectionString": connection_string })))
}
