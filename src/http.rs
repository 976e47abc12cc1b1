//! HTTP JSON surface.

use crate::advisor::{AdviceRequest, Advisor, RemixRequest, RequestError};
use crate::backends::BackendId;
use crate::saved_messages::{
    ChangeEvent, EmptyContent, NewSavedMessage, SavedMessageStore, SortDirection,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const INVALID_BODY: &str = "Invalid request body";

#[derive(Clone)]
pub struct AppState {
    pub advisor: Advisor,
    pub store: SavedMessageStore,
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/remix", post(remix))
        .route("/api/advise", post(advise))
        .route("/api/aspects", get(list_aspects))
        .route("/api/models", get(list_models))
        .route(
            "/api/saved-messages",
            post(insert_message).get(list_messages),
        )
        .route("/api/saved-messages/changes", get(message_changes))
        .route("/api/saved-messages/:id", delete(delete_message))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        warn!("rejected request: {err}");
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

fn parse_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    match body {
        Ok(Json(v)) if v.is_object() => Ok(v),
        Ok(_) => {
            warn!("rejected request: body is not a JSON object");
            Err(ApiError::bad_request(INVALID_BODY))
        }
        Err(rejection) => {
            warn!("rejected request: {rejection}");
            Err(ApiError::bad_request(INVALID_BODY))
        }
    }
}

fn from_body<T: serde::de::DeserializeOwned>(v: Value) -> Result<T, ApiError> {
    serde_json::from_value(v).map_err(|err| {
        warn!("rejected request: {err}");
        ApiError::bad_request(INVALID_BODY)
    })
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Serves both shapes: a body carrying `aspects` is an advisor request,
/// anything else is a legacy remix.
async fn remix(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let v = parse_body(body)?;
    if v.get("aspects").is_some() {
        return run_advice(&state, from_body(v)?).await;
    }

    let remix = from_body::<RemixRequest>(v)?.validate()?;
    let envelope = state.advisor.remix(&remix).await.envelope();
    let status = if envelope.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(envelope)).into_response())
}

async fn advise(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let v = parse_body(body)?;
    run_advice(&state, from_body(v)?).await
}

async fn run_advice(state: &AppState, req: AdviceRequest) -> Result<Response, ApiError> {
    let advice = req.validate()?;
    let envelope = state.advisor.advise(&advice).await.envelope();
    let status = if envelope.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(envelope)).into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectSummary {
    pub id: &'static str,
    pub trait_name: &'static str,
    pub description: &'static str,
}

async fn list_aspects(State(state): State<AppState>) -> impl IntoResponse {
    let data: Vec<AspectSummary> = state
        .advisor
        .registry()
        .persona()
        .aspects
        .iter()
        .map(|a| AspectSummary {
            id: a.id,
            trait_name: a.trait_name,
            description: a.description,
        })
        .collect();
    Json(data)
}

#[derive(Debug, Serialize)]
pub struct ModelSummary {
    pub id: BackendId,
    pub configured: bool,
    pub default: bool,
}

async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    let router = state.advisor.router();
    let data: Vec<ModelSummary> = BackendId::ALL
        .iter()
        .map(|&id| ModelSummary {
            id,
            configured: router.is_configured(id),
            default: id == BackendId::Gemini,
        })
        .collect();
    Json(data)
}

async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(err)) if err.downcast_ref::<EmptyContent>().is_some() => {
            warn!("rejected saved message: {err}");
            Err(ApiError::bad_request(err.to_string()))
        }
        Ok(Err(err)) => {
            error!("saved message store failed: {err:#}");
            Err(ApiError::internal("Saved message store failed"))
        }
        Err(err) => {
            error!("saved message task failed: {err}");
            Err(ApiError::internal("Saved message store failed"))
        }
    }
}

async fn insert_message(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let msg: NewSavedMessage = from_body(parse_body(body)?)?;
    let store = state.store.clone();
    let saved = blocking(move || store.insert(msg)).await?;
    Ok((StatusCode::CREATED, Json(saved)).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(default)]
    direction: Option<SortDirection>,
}

async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let store = state.store.clone();
    let direction = params.direction.unwrap_or_default();
    let messages = blocking(move || store.query(direction)).await?;
    Ok(Json(messages).into_response())
}

async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let store = state.store.clone();
    let lookup = id.clone();
    if blocking(move || store.delete(&lookup)).await? {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(ApiError::not_found(format!("No saved message with id {id}")))
    }
}

async fn message_changes(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.store.subscribe()).filter_map(|item| {
        // Lagged receivers skip what they missed.
        let change = item.ok()?;
        let name = match &change {
            ChangeEvent::Inserted(_) => "inserted",
            ChangeEvent::Deleted { .. } => "deleted",
        };
        Event::default()
            .event(name)
            .json_data(&change)
            .ok()
            .map(Ok::<Event, Infallible>)
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
