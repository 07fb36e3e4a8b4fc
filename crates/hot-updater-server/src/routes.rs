// crates/hot-updater-server/src/routes.rs
// ============================================================================
// Module: HTTP Routes
// Description: axum handlers for check-update, bundle management, and files.
// Purpose: Translate HTTP requests into repository calls and JSON replies.
// Dependencies: axum, hot-updater-core, hot-updater-signing, serde_json
// ============================================================================

//! ## Overview
//! Routes below the configured base path:
//!
//! - `GET /version`
//! - `GET /check-update` (legacy headers)
//! - `GET /fingerprint/{platform}/{fingerprintHash}/{channel}/{minBundleId}/{bundleId}[/{deviceId}]`
//! - `GET /app-version/{platform}/{appVersion}/{channel}/{minBundleId}/{bundleId}[/{deviceId}]`
//! - `GET|POST /bundles`, `GET /bundles/channels`, `GET|DELETE /bundles/{id}`
//!
//! `GET /files/{*key}?token=` is mounted at the root when delivery is enabled.
//! Repository and object store calls run on the blocking pool. Error bodies
//! are `{ "error": <message> }`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::rejection::QueryRejection;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use hot_updater_core::Bundle;
use hot_updater_core::BundleId;
use hot_updater_core::BundlePage;
use hot_updater_core::BundleQuery;
use hot_updater_core::Channel;
use hot_updater_core::DEFAULT_PAGE_LIMIT;
use hot_updater_core::ObjectStoreError;
use hot_updater_core::Platform;
use hot_updater_core::RepositoryError;
use hot_updater_core::RequestParts;
use hot_updater_core::ResolutionRequest;
use hot_updater_core::StoredObject;
use hot_updater_core::UpdateInfo;
use hot_updater_signing::TokenError;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::audit::CheckUpdateAuditEvent;
use crate::audit::DeliveryAuditEvent;
use crate::auth::authorize_admin;
use crate::files::content_type_for;
use crate::server::FileDelivery;
use crate::server::ServerState;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Shared handler state.
type SharedState = Arc<ServerState>;

/// Builds the application router.
///
/// `base_path` prefixes every API route; `/` mounts them at the root.
pub fn router(base_path: &str, state: SharedState) -> Router {
    let api: Router<SharedState> = Router::new()
        .route("/version", get(version))
        .route("/check-update", get(check_update_headers))
        .route(
            "/fingerprint/{platform}/{fingerprint_hash}/{channel}/{min_bundle_id}/{bundle_id}",
            get(fingerprint_update),
        )
        .route(
            "/fingerprint/{platform}/{fingerprint_hash}/{channel}/{min_bundle_id}/{bundle_id}/{device_id}",
            get(fingerprint_update),
        )
        .route(
            "/app-version/{platform}/{app_version}/{channel}/{min_bundle_id}/{bundle_id}",
            get(app_version_update),
        )
        .route(
            "/app-version/{platform}/{app_version}/{channel}/{min_bundle_id}/{bundle_id}/{device_id}",
            get(app_version_update),
        )
        .route("/bundles", get(list_bundles).post(create_bundles))
        .route("/bundles/channels", get(list_channels))
        .route("/bundles/{id}", get(get_bundle).delete(delete_bundle));
    let base = base_path.trim_end_matches('/');
    let mut app = if base.is_empty() { Router::new().merge(api) } else { Router::new().nest(base, api) };
    if state.delivery.is_some() {
        app = app.route("/files/{*key}", get(serve_file));
    }
    let limit = state.max_body_bytes;
    app.fallback(not_found).layer(DefaultBodyLimit::max(limit)).with_state(state)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// JSON error reply.
#[derive(Debug)]
struct ApiError {
    /// HTTP status.
    status: StatusCode,
    /// Client-facing message.
    message: String,
}

impl ApiError {
    /// Creates an error reply.
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 reply.
    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404 reply.
    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 reply.
    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Invalid(_) => Self::bad_request(error.to_string()),
            RepositoryError::VersionMismatch(_) | RepositoryError::Store(_) => {
                tracing::warn!(error = %error, "bundle repository failure");
                Self::internal(error.to_string())
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, error.to_string())
    }
}

/// Runs a blocking closure on the blocking pool.
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::internal(format!("blocking task failed: {err}")))?
}

/// Rejects management calls without the admin token.
fn require_admin(state: &ServerState, headers: &HeaderMap) -> Result<(), ApiError> {
    let auth_header = header_value(headers, header::AUTHORIZATION.as_str());
    authorize_admin(state.admin_token.as_deref(), auth_header).map_err(|err| {
        tracing::warn!(error = %err, "admin authorization failed");
        ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    })
}

/// Returns a trimmed, non-empty header value.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Unknown route reply.
async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

// ============================================================================
// SECTION: Check Update
// ============================================================================

/// Check-update reply body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    /// Resolution result.
    #[serde(flatten)]
    info: UpdateInfo,
    /// Client download URL for the chosen bundle.
    file_url: Option<String>,
}

/// Path parameters for fingerprint checks.
#[derive(Debug, Deserialize)]
struct FingerprintPath {
    /// Platform label.
    platform: String,
    /// Native build fingerprint.
    fingerprint_hash: String,
    /// Channel name.
    channel: String,
    /// Native build floor.
    min_bundle_id: String,
    /// Installed bundle id.
    bundle_id: String,
    /// Device identifier.
    device_id: Option<String>,
}

/// Path parameters for app-version checks.
#[derive(Debug, Deserialize)]
struct AppVersionPath {
    /// Platform label.
    platform: String,
    /// Installed app version.
    app_version: String,
    /// Channel name.
    channel: String,
    /// Native build floor.
    min_bundle_id: String,
    /// Installed bundle id.
    bundle_id: String,
    /// Device identifier.
    device_id: Option<String>,
}

/// `GET /version`.
async fn version() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

/// Fingerprint strategy check.
async fn fingerprint_update(
    State(state): State<SharedState>,
    Path(path): Path<FingerprintPath>,
) -> Result<Json<Option<UpdateResponse>>, ApiError> {
    let request = ResolutionRequest::from_parts(&RequestParts {
        platform: Some(&path.platform),
        bundle_id: Some(&path.bundle_id),
        min_bundle_id: Some(&path.min_bundle_id),
        channel: Some(&path.channel),
        app_version: None,
        fingerprint_hash: Some(&path.fingerprint_hash),
        device_id: path.device_id.as_deref(),
    })
    .map_err(|err| ApiError::bad_request(err.to_string()))?;
    check_update(&state, request).await
}

/// App-version strategy check.
async fn app_version_update(
    State(state): State<SharedState>,
    Path(path): Path<AppVersionPath>,
) -> Result<Json<Option<UpdateResponse>>, ApiError> {
    let request = ResolutionRequest::from_parts(&RequestParts {
        platform: Some(&path.platform),
        bundle_id: Some(&path.bundle_id),
        min_bundle_id: Some(&path.min_bundle_id),
        channel: Some(&path.channel),
        app_version: Some(&path.app_version),
        fingerprint_hash: None,
        device_id: path.device_id.as_deref(),
    })
    .map_err(|err| ApiError::bad_request(err.to_string()))?;
    check_update(&state, request).await
}

/// Legacy header-driven check.
async fn check_update_headers(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Option<UpdateResponse>>, ApiError> {
    let app_version = header_value(&headers, "x-app-version");
    let fingerprint_hash = header_value(&headers, "x-fingerprint-hash");
    if app_version.is_none() && fingerprint_hash.is_none() {
        return Err(ApiError::bad_request(
            "Missing required headers (x-app-version or x-fingerprint-hash).",
        ));
    }
    let platform = header_value(&headers, "x-app-platform");
    let bundle_id = header_value(&headers, "x-bundle-id");
    if platform.is_none() || bundle_id.is_none() {
        return Err(ApiError::bad_request("Missing required headers (x-app-platform, x-bundle-id)."));
    }
    let request = ResolutionRequest::from_parts(&RequestParts {
        platform,
        bundle_id,
        min_bundle_id: header_value(&headers, "x-min-bundle-id"),
        channel: header_value(&headers, "x-channel"),
        app_version,
        fingerprint_hash,
        device_id: header_value(&headers, "x-device-id"),
    })
    .map_err(|err| ApiError::bad_request(err.to_string()))?;
    check_update(&state, request).await
}

/// Resolves a request, attaches the download URL, and audits the decision.
async fn check_update(
    state: &SharedState,
    request: ResolutionRequest,
) -> Result<Json<Option<UpdateResponse>>, ApiError> {
    let repository = Arc::clone(&state.repository);
    let lookup = request.clone();
    let resolved =
        run_blocking(move || repository.get_update_info(&lookup).map_err(ApiError::from)).await;
    let response = resolved.and_then(|info| {
        info.map(|info| -> Result<UpdateResponse, ApiError> {
            let file_url = state
                .storage
                .resolve_file_url(&info.id, info.storage_uri.as_deref())
                .map_err(|err| ApiError::internal(err.to_string()))?;
            Ok(UpdateResponse {
                info,
                file_url,
            })
        })
        .transpose()
    });
    let event = match &response {
        Ok(reply) => {
            CheckUpdateAuditEvent::new(&request, Ok(reply.as_ref().map(|reply| &reply.info)))
        }
        Err(err) => CheckUpdateAuditEvent::new(&request, Err(err.message.as_str())),
    };
    state.audit.record_check_update(&event);
    tracing::debug!(
        platform = %request.platform,
        channel = %request.channel,
        bundle_id = %request.bundle_id,
        strategy = request.strategy.label(),
        outcome = event.outcome,
        "check-update resolved"
    );
    response.map(Json)
}

// ============================================================================
// SECTION: Bundle Management
// ============================================================================

/// Query parameters for bundle listings.
#[derive(Debug, Deserialize)]
struct ListParams {
    /// Channel filter.
    channel: Option<String>,
    /// Platform filter.
    platform: Option<String>,
    /// Page size.
    limit: Option<u32>,
    /// Rows to skip.
    offset: Option<u32>,
}

/// `GET /bundles`.
async fn list_bundles(
    State(state): State<SharedState>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<BundlePage>, ApiError> {
    require_admin(&state, &headers)?;
    let Query(params) = params.map_err(|err| ApiError::bad_request(err.body_text()))?;
    let platform = params
        .platform
        .as_deref()
        .map(str::parse::<Platform>)
        .transpose()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let query = BundleQuery {
        channel: params.channel.map(Channel::new),
        platform,
        limit: params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        offset: params.offset.unwrap_or(0),
    };
    let repository = Arc::clone(&state.repository);
    run_blocking(move || repository.list_bundles(&query).map_err(ApiError::from)).await.map(Json)
}

/// `POST /bundles` with one bundle or an array of bundles.
async fn create_bundles(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_admin(&state, &headers)?;
    let value: Value = serde_json::from_slice(&body)
        .map_err(|err| ApiError::bad_request(format!("invalid json body: {err}")))?;
    let bundles = match value {
        Value::Array(_) => serde_json::from_value::<Vec<Bundle>>(value),
        other => serde_json::from_value::<Bundle>(other).map(|bundle| vec![bundle]),
    }
    .map_err(|err| ApiError::bad_request(format!("invalid bundle: {err}")))?;
    if bundles.is_empty() {
        return Err(ApiError::bad_request("no bundles provided"));
    }
    for bundle in &bundles {
        if let Some(reason) = state.signature.check(&bundle.file_hash) {
            tracing::warn!(bundle_id = %bundle.id, reason, "bundle rejected by signature policy");
            return Err(ApiError::bad_request(format!("{reason}: {}", bundle.id)));
        }
    }
    let count = bundles.len();
    let repository = Arc::clone(&state.repository);
    run_blocking(move || repository.upsert_bundles(&bundles).map_err(ApiError::from)).await?;
    tracing::info!(count, "bundles published");
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

/// `GET /bundles/channels`.
async fn list_channels(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let repository = Arc::clone(&state.repository);
    let channels = run_blocking(move || repository.channels().map_err(ApiError::from)).await?;
    Ok(Json(json!({ "channels": channels })))
}

/// `GET /bundles/{id}`.
async fn get_bundle(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Bundle>, ApiError> {
    require_admin(&state, &headers)?;
    let repository = Arc::clone(&state.repository);
    let id = BundleId::new(id);
    run_blocking(move || repository.get_bundle(&id).map_err(ApiError::from))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Bundle not found"))
}

/// `DELETE /bundles/{id}`.
async fn delete_bundle(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let repository = Arc::clone(&state.repository);
    let bundle_id = BundleId::new(id);
    let lookup = bundle_id.clone();
    let existed =
        run_blocking(move || repository.delete_bundle(&lookup).map_err(ApiError::from)).await?;
    if !existed {
        return Err(ApiError::not_found("Bundle not found"));
    }
    tracing::info!(bundle_id = %bundle_id, "bundle deleted");
    Ok(Json(json!({ "success": true })))
}

// ============================================================================
// SECTION: File Delivery
// ============================================================================

/// Query parameters for file downloads.
#[derive(Debug, Deserialize)]
struct FileParams {
    /// Delivery token.
    token: Option<String>,
}

/// `GET /files/{*key}?token=`.
async fn serve_file(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    params: Result<Query<FileParams>, QueryRejection>,
) -> Response {
    let token = params.ok().and_then(|Query(params)| params.token);
    let result = match state.delivery.clone() {
        Some(delivery) => deliver(delivery, &key, token.as_deref()).await,
        None => Err(ApiError::from(TokenError::NotFound)),
    };
    match result {
        Ok((object_key, object)) => {
            state.audit.record_delivery(&DeliveryAuditEvent::new(&object_key, 200, object.bytes.len()));
            file_response(&object_key, object)
        }
        Err(err) => {
            state.audit.record_delivery(&DeliveryAuditEvent::new(&key, err.status.as_u16(), 0));
            tracing::debug!(key = %key, status = err.status.as_u16(), "file delivery rejected");
            err.into_response()
        }
    }
}

/// Verifies the token and loads the bound object.
async fn deliver(
    delivery: FileDelivery,
    key: &str,
    token: Option<&str>,
) -> Result<(String, StoredObject), ApiError> {
    let object_key = delivery.signer.verify(token, key)?;
    let objects = Arc::clone(&delivery.objects);
    let lookup = object_key.clone();
    let object = run_blocking(move || {
        objects.get(&lookup).map_err(|err| match err {
            ObjectStoreError::Invalid(_) => ApiError::from(TokenError::NotFound),
            ObjectStoreError::Io(message) => ApiError::internal(message),
        })
    })
    .await?
    .ok_or_else(|| ApiError::from(TokenError::NotFound))?;
    Ok((object_key, object))
}

/// Builds the download reply with content headers.
fn file_response(key: &str, object: StoredObject) -> Response {
    let content_type =
        object.content_type.unwrap_or_else(|| content_type_for(key).to_string());
    let file_name = key.rsplit('/').next().unwrap_or(key).replace('"', "_");
    let mut response = (StatusCode::OK, object.bytes).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
