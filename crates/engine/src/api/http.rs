//! HTTP routes.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use resistencia_domain::{DomainError, PaintSessionId, PlaySessionId, StoryId, UserId};
use resistencia_shared::{
    ActivateHotspotRequest, AdvanceRequest, BrushRequest, CreatePaintSessionRequest,
    CreatePlaySessionRequest, GeometryRequest, HealthResponse, PaintSessionResponse,
    PlaySessionResponse, PointerRequest, ProgressionResponse, SceneTickRequest, StoryListQuery,
    StorySummary, TimerRequest,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::views::{paint_response, play_response, progression_response, story_summary};
use crate::app::App;
use crate::infrastructure::ports::RepoError;
use crate::use_cases::{PaintError, PlayError, ProgressionError, StartPaint};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/stories", get(list_stories))
        .route("/api/players/{user_id}/progression", get(get_progression))
        // Story playback
        .route("/api/sessions", post(open_session))
        .route(
            "/api/sessions/{id}",
            get(get_session).delete(close_session),
        )
        .route("/api/sessions/{id}/geometry", post(geometry_loaded))
        .route("/api/sessions/{id}/tick", post(scene_tick))
        .route("/api/sessions/{id}/activate", post(activate_hotspot))
        .route("/api/sessions/{id}/media-ended", post(media_ended))
        .route("/api/sessions/{id}/advance", post(advance))
        .route("/api/sessions/{id}/app-result", post(app_result))
        // Paint minigame
        .route("/api/paint", post(start_paint))
        .route("/api/paint/{id}", get(get_paint).delete(close_paint))
        .route("/api/paint/{id}/pointer", post(paint_pointer))
        .route("/api/paint/{id}/brush", post(paint_brush))
        .route("/api/paint/{id}/buy", post(buy_paint))
        .route("/api/paint/{id}/timer", post(paint_timer))
        .route("/api/paint/{id}/snapshot", get(paint_snapshot))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// =============================================================================
// Catalog and progression
// =============================================================================

async fn list_stories(
    State(app): State<Arc<App>>,
    Query(query): Query<StoryListQuery>,
) -> Result<Json<Vec<StorySummary>>, ApiError> {
    let entries = app
        .use_cases
        .catalog
        .list_for(UserId::from_uuid(query.user_id))
        .await?;
    Ok(Json(entries.into_iter().map(story_summary).collect()))
}

async fn get_progression(
    State(app): State<Arc<App>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProgressionResponse>, ApiError> {
    let progression = app
        .use_cases
        .progression
        .get(UserId::from_uuid(user_id))
        .await?;
    Ok(Json(progression_response(progression)))
}

// =============================================================================
// Play sessions
// =============================================================================

async fn open_session(
    State(app): State<Arc<App>>,
    Json(request): Json<CreatePlaySessionRequest>,
) -> Result<(StatusCode, Json<PlaySessionResponse>), ApiError> {
    let view = app
        .use_cases
        .play
        .open(
            UserId::from_uuid(request.user_id),
            StoryId::new(request.story_id),
            &request.language,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(play_response(view))))
}

async fn get_session(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlaySessionResponse>, ApiError> {
    let view = app.use_cases.play.get(PlaySessionId::from_uuid(id)).await?;
    Ok(Json(play_response(view)))
}

async fn close_session(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app.use_cases.play.close(PlaySessionId::from_uuid(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn geometry_loaded(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(request): Json<GeometryRequest>,
) -> Result<Json<PlaySessionResponse>, ApiError> {
    let view = app
        .use_cases
        .play
        .geometry_loaded(PlaySessionId::from_uuid(id), &request.parts)
        .await?;
    Ok(Json(play_response(view)))
}

async fn scene_tick(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SceneTickRequest>,
) -> Result<Json<PlaySessionResponse>, ApiError> {
    let view = app
        .use_cases
        .play
        .scene_tick(
            PlaySessionId::from_uuid(id),
            &request.parts,
            request.top_hit.as_deref(),
        )
        .await?;
    Ok(Json(play_response(view)))
}

async fn activate_hotspot(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActivateHotspotRequest>,
) -> Result<Json<PlaySessionResponse>, ApiError> {
    let view = app
        .use_cases
        .play
        .activate_hotspot(PlaySessionId::from_uuid(id), &request.mesh_name)
        .await?;
    Ok(Json(play_response(view)))
}

async fn media_ended(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlaySessionResponse>, ApiError> {
    let view = app
        .use_cases
        .play
        .media_ended(PlaySessionId::from_uuid(id))
        .await?;
    Ok(Json(play_response(view)))
}

async fn advance(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<PlaySessionResponse>, ApiError> {
    let view = app
        .use_cases
        .play
        .advance(PlaySessionId::from_uuid(id), &request.choice)
        .await?;
    Ok(Json(play_response(view)))
}

/// Takes the app's message verbatim so the protocol checks run in one place.
async fn app_result(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(message): Json<Value>,
) -> Result<Json<PlaySessionResponse>, ApiError> {
    let view = app
        .use_cases
        .play
        .app_result(PlaySessionId::from_uuid(id), message)
        .await?;
    Ok(Json(play_response(view)))
}

// =============================================================================
// Paint sessions
// =============================================================================

async fn start_paint(
    State(app): State<Arc<App>>,
    Json(request): Json<CreatePaintSessionRequest>,
) -> Result<(StatusCode, Json<PaintSessionResponse>), ApiError> {
    let view = app
        .use_cases
        .paint
        .start(StartPaint {
            user_id: UserId::from_uuid(request.user_id),
            app_data: request.app_data,
            language: request.language,
            success_reward: request.success_reward_id,
            failure_reward: request.failure_reward_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(paint_response(view))))
}

async fn get_paint(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaintSessionResponse>, ApiError> {
    let view = app
        .use_cases
        .paint
        .get(PaintSessionId::from_uuid(id))
        .await?;
    Ok(Json(paint_response(view)))
}

async fn close_paint(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app.use_cases.paint.close(PaintSessionId::from_uuid(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn paint_pointer(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(request): Json<PointerRequest>,
) -> Result<Json<PaintSessionResponse>, ApiError> {
    let view = app
        .use_cases
        .paint
        .pointer(PaintSessionId::from_uuid(id), request.phase, request.hit)
        .await?;
    Ok(Json(paint_response(view)))
}

async fn paint_brush(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(request): Json<BrushRequest>,
) -> Result<Json<PaintSessionResponse>, ApiError> {
    let view = app
        .use_cases
        .paint
        .set_tools(
            PaintSessionId::from_uuid(id),
            request.size,
            request.color.as_deref(),
        )
        .await?;
    Ok(Json(paint_response(view)))
}

async fn buy_paint(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaintSessionResponse>, ApiError> {
    let view = app
        .use_cases
        .paint
        .buy_paint(PaintSessionId::from_uuid(id))
        .await?;
    Ok(Json(paint_response(view)))
}

async fn paint_timer(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(request): Json<TimerRequest>,
) -> Result<Json<PaintSessionResponse>, ApiError> {
    let view = app
        .use_cases
        .paint
        .tick_timer(PaintSessionId::from_uuid(id), request.elapsed_secs)
        .await?;
    Ok(Json(paint_response(view)))
}

async fn paint_snapshot(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let png = app
        .use_cases
        .paint
        .snapshot(PaintSessionId::from_uuid(id))
        .await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { .. } => ApiError::NotFound,
            DomainError::Validation(_) | DomainError::Parse(_) => {
                ApiError::BadRequest(e.to_string())
            }
            DomainError::Constraint(_)
            | DomainError::InvalidStateTransition(_)
            | DomainError::Insufficient { .. } => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<ProgressionError> for ApiError {
    fn from(e: ProgressionError) -> Self {
        match e {
            ProgressionError::Domain(e) => e.into(),
            ProgressionError::Repo(e) => e.into(),
        }
    }
}

impl From<PlayError> for ApiError {
    fn from(e: PlayError) -> Self {
        match e {
            PlayError::SessionNotFound(_) | PlayError::StoryNotFound(_) => ApiError::NotFound,
            PlayError::StoryLocked(_) | PlayError::DuplicateAppResult => {
                ApiError::Conflict(e.to_string())
            }
            PlayError::InvalidAppResult(_) => ApiError::BadRequest(e.to_string()),
            PlayError::Domain(e) => e.into(),
            PlayError::Progression(e) => e.into(),
            PlayError::Repo(e) => e.into(),
        }
    }
}

impl From<PaintError> for ApiError {
    fn from(e: PaintError) -> Self {
        match e {
            PaintError::SessionNotFound(_) => ApiError::NotFound,
            PaintError::Domain(e) => e.into(),
            PaintError::Progression(e) => e.into(),
            PaintError::Sdk(_) => ApiError::Conflict(e.to_string()),
            PaintError::Snapshot(_) => ApiError::Internal(e.to_string()),
        }
    }
}
