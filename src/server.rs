//! Web server for the workout dashboard.
//!
//! Provides a JSON API for leaderboards, growth rankings and progress
//! series, accepts new submissions, serves the CSV backup, and falls back to
//! static file serving for the frontend.
//!
//! Every analytics request reads the store afresh and recomputes; nothing
//! derived is kept between requests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::services::ServeDir;

use crate::config::AppConfig;
use crate::domain::{Exercise, Month, RawRecord, Record};
use crate::error::{StoreError, SubmissionError};
use crate::export::{backup_file_name, export_csv};
use crate::normalize::normalize;
use crate::ranking::{GrowthEntry, LeaderboardEntry, available_months, growth_ranking, leaderboard, users};
use crate::store::{RecordStore, append_with_retry, load_records};
use crate::submission::Submission;
use crate::tracker::{ProgressFilter, ProgressPoint, progress_series};

/// Shared application state.
///
/// Holds no records: handlers load a snapshot from the store per request.
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: AppConfig,
    /// Serializes appends so concurrent submissions don't interleave.
    pub append_lock: Mutex<()>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: AppConfig) -> Self {
        Self {
            store,
            config,
            append_lock: Mutex::new(()),
        }
    }

    async fn raw_records(&self) -> Result<Vec<RawRecord>, ApiError> {
        Ok(load_records(self.store.clone()).await?)
    }

    async fn records(&self) -> Result<Vec<Record>, ApiError> {
        Ok(normalize(&self.raw_records().await?))
    }
}

// === Errors ===

/// Errors returned to API clients.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// The store could not be reached; the client may retry.
    Unavailable(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Unavailable(e)
    }
}

impl From<SubmissionError> for ApiError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::Store(e) => ApiError::Unavailable(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    retryable: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, retryable) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, false),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, false),
            ApiError::Unavailable(e) => {
                log::warn!("Store unavailable: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string(), true)
            }
        };
        (status, Json(ErrorBody { error, retryable })).into_response()
    }
}

// === JSON Response Types ===

#[derive(Serialize)]
pub struct ExerciseSummary {
    pub id: &'static str,
    pub name: &'static str,
    pub reps_only: bool,
}

#[derive(Serialize)]
pub struct LeaderboardResponse {
    pub exercise: &'static str,
    pub entries: Vec<LeaderboardEntry>,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct GrowthResponse {
    pub exercise: &'static str,
    pub month: Option<Month>,
    pub entries: Vec<GrowthEntry>,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ProgressResponse {
    pub exercise: &'static str,
    pub points: Vec<ProgressPoint>,
}

#[derive(Serialize)]
pub struct SubmissionResponse {
    pub name: String,
    pub recorded_on: String,
}

#[derive(Deserialize)]
pub struct GrowthQuery {
    pub month: Option<String>,
}

#[derive(Deserialize)]
pub struct ProgressQuery {
    /// Comma-separated user names; absent or empty means everyone.
    pub users: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// === Router Setup ===

/// Creates the application router.
pub fn create_router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let router = Router::new()
        .route("/api/exercises", get(get_exercises))
        .route("/api/users", get(get_users))
        .route("/api/months", get(get_months))
        .route("/api/leaderboard/{exercise}", get(get_leaderboard))
        .route("/api/growth/{exercise}", get(get_growth))
        .route("/api/progress/{exercise}", get(get_progress))
        .route("/api/records", post(post_record))
        .route("/api/export.csv", get(get_export));

    let router = match static_dir {
        Some(dir) => {
            router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        None => router,
    };

    router.with_state(state)
}

/// Runs the web server.
pub async fn run_server(
    state: Arc<AppState>,
    port: u16,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let app = create_router(state, static_dir);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("Server running at http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// === API Handlers ===

/// GET /api/exercises - The fixed exercise list.
async fn get_exercises() -> Json<Vec<ExerciseSummary>> {
    Json(
        Exercise::all()
            .iter()
            .map(|e| ExerciseSummary {
                id: e.id(),
                name: e.display_name(),
                reps_only: e.is_reps_only(),
            })
            .collect(),
    )
}

/// GET /api/users - Known submitter names.
async fn get_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let records = state.records().await?;
    Ok(Json(users(&records)))
}

/// GET /api/months - Months with records, newest first.
async fn get_months(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Month>>, ApiError> {
    let records = state.records().await?;
    Ok(Json(available_months(&records)))
}

/// GET /api/leaderboard/{exercise} - All-time best estimated 1RM.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let exercise = parse_exercise(&name)?;
    let records = state.records().await?;
    let entries = leaderboard(&records, exercise, state.config.epley_divisor);

    let message = if exercise.is_reps_only() {
        Some(format!("{} is logged as reps only and has no estimated 1RM.", exercise))
    } else if entries.is_empty() {
        Some(format!("No {} records yet.", exercise))
    } else {
        None
    };

    Ok(Json(LeaderboardResponse {
        exercise: exercise.id(),
        entries,
        message,
    }))
}

/// GET /api/growth/{exercise}?month=YYYY-MM - Monthly growth ranking.
///
/// Without `month`, the newest month that has records is used.
async fn get_growth(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<GrowthQuery>,
) -> Result<Json<GrowthResponse>, ApiError> {
    let exercise = parse_exercise(&name)?;
    let requested = query
        .month
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(Month::from_str)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let records = state.records().await?;
    let month = requested.or_else(|| available_months(&records).first().copied());

    let Some(month) = month else {
        return Ok(Json(GrowthResponse {
            exercise: exercise.id(),
            month: None,
            entries: Vec::new(),
            message: Some("No records yet.".to_string()),
        }));
    };

    let entries = growth_ranking(&records, exercise, month, state.config.epley_divisor);
    let message = if exercise.is_reps_only() {
        Some(format!("{} is logged as reps only and has no estimated 1RM.", exercise))
    } else if entries.is_empty() {
        Some(format!("No member improved their {} in {}.", exercise, month))
    } else {
        None
    };

    Ok(Json(GrowthResponse {
        exercise: exercise.id(),
        month: Some(month),
        entries,
        message,
    }))
}

/// GET /api/progress/{exercise} - Logged sets for charting.
async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let exercise = parse_exercise(&name)?;
    let filter = ProgressFilter {
        users: query
            .users
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect(),
        from: query.from,
        to: query.to,
    };

    let records = state.records().await?;
    Ok(Json(ProgressResponse {
        exercise: exercise.id(),
        points: progress_series(&records, exercise, &filter, state.config.epley_divisor),
    }))
}

/// POST /api/records - Append a new submission.
async fn post_record(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<Submission>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let raw = submit(&state, submission).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            name: raw.submitted_by,
            recorded_on: raw.recorded_on,
        }),
    ))
}

/// Validates a submission and appends it with retries.
async fn submit(state: &AppState, submission: Submission) -> Result<RawRecord, SubmissionError> {
    let raw = submission.into_raw_record(Local::now().naive_local())?;

    let _guard = state.append_lock.lock().await;
    append_with_retry(state.store.clone(), raw.clone(), &state.config.retry).await?;

    log::info!("Recorded workout for {} on {}", raw.submitted_by, raw.recorded_on);
    Ok(raw)
}

/// GET /api/export.csv - Download every stored row as CSV.
async fn get_export(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let raw = state.raw_records().await?;
    let body = export_csv(&raw).map_err(|e| ApiError::Unavailable(e.into()))?;
    let file_name = backup_file_name(Local::now().date_naive());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response())
}

// === Helper Functions ===

fn parse_exercise(id: &str) -> Result<Exercise, ApiError> {
    Exercise::from_str(id).map_err(ApiError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::csv_store::CsvStore;

    const SCENARIO: &str = "\
記入者名,記録日,ベンチプレス(kg × 回数),懸垂(回数)
Alice,2025-05-01,80-10,
Alice,2025-06-01,90-10,12
Bob,2025-05-15,70-12,
";

    fn test_app(dir: &tempfile::TempDir, contents: &str) -> Router {
        let path = dir.path().join("log.csv");
        fs::write(&path, contents).unwrap();
        let state = AppState::new(Arc::new(CsvStore::new(path)), AppConfig::default());
        create_router(Arc::new(state), None)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    #[tokio::test]
    async fn test_leaderboard_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = get(test_app(&dir, SCENARIO), "/api/leaderboard/bench_press").await;

        assert_eq!(status, StatusCode::OK);
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["rank"], 1);
        assert_eq!(entries[0]["user"], "Alice");
        assert_eq!(entries[0]["estimated_1rm"], 112.5);
        assert!(json["message"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_exercise_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = get(test_app(&dir, SCENARIO), "/api/leaderboard/curl").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_growth_endpoint_for_month() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = get(
            test_app(&dir, SCENARIO),
            "/api/growth/bench_press?month=2025-06",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["month"], "2025-06");
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["user"], "Alice");
        assert_eq!(entries[0]["growth_pct"], 12.5);
    }

    #[tokio::test]
    async fn test_growth_defaults_to_newest_month() {
        let dir = tempfile::tempdir().unwrap();
        let (_, json) = get(test_app(&dir, SCENARIO), "/api/growth/bench_press").await;
        assert_eq!(json["month"], "2025-06");
    }

    #[tokio::test]
    async fn test_growth_bad_month_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = get(
            test_app(&dir, SCENARIO),
            "/api/growth/bench_press?month=June",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["retryable"], false);
    }

    #[tokio::test]
    async fn test_empty_growth_has_message() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = get(
            test_app(&dir, SCENARIO),
            "/api/growth/squat?month=2025-06",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["entries"].as_array().unwrap().is_empty());
        assert!(json["message"].is_string());
    }

    #[tokio::test]
    async fn test_progress_endpoint_filters_users() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = get(
            test_app(&dir, SCENARIO),
            "/api/progress/bench_press?users=Bob",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let points = json["points"].as_array().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0]["user"], "Bob");
        assert_eq!(points[0]["date"], "2025-05-15");
    }

    #[tokio::test]
    async fn test_users_and_months() {
        let dir = tempfile::tempdir().unwrap();
        let (_, users) = get(test_app(&dir, SCENARIO), "/api/users").await;
        assert_eq!(users, serde_json::json!(["Alice", "Bob"]));

        let (_, months) = get(test_app(&dir, SCENARIO), "/api/months").await;
        assert_eq!(months, serde_json::json!(["2025-06", "2025-05"]));
    }

    #[tokio::test]
    async fn test_post_record_appends() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, SCENARIO);

        let request = Request::post("/api/records")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"name": "Carol", "date": "2025-06-10", "fields": {"bench_press": "150-5"}}"#,
            ))
            .unwrap();
        let (status, json) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["name"], "Carol");

        let (_, board) = get(app, "/api/leaderboard/bench_press").await;
        assert_eq!(board["entries"][0]["user"], "Carol");
        assert_eq!(board["entries"][0]["estimated_1rm"], 168.75);
    }

    #[tokio::test]
    async fn test_post_record_empty_name_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::post("/api/records")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name": " ", "date": "2025-06-10"}"#))
            .unwrap();
        let (status, _) = send(test_app(&dir, SCENARIO), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_store_not_created_yet_serves_empty_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.csv");
        let state = AppState::new(Arc::new(CsvStore::new(&path)), AppConfig::default());
        let app = create_router(Arc::new(state), None);

        let (status, json) = get(app, "/api/leaderboard/bench_press").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["entries"], serde_json::json!([]));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unreadable_store_is_503() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        fs::create_dir(&path).unwrap();
        let state = AppState::new(Arc::new(CsvStore::new(path)), AppConfig::default());
        let app = create_router(Arc::new(state), None);
        let (status, json) = get(app, "/api/leaderboard/bench_press").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["retryable"], true);
    }

    #[tokio::test]
    async fn test_export_has_bom_and_attachment_header() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir, SCENARIO)
            .oneshot(Request::get("/api/export.csv").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("training_log_backup_"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(text.lines().count(), 4);
    }
}
