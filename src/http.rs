//! HTTP job API
//!
//! Thin framing over the job executor: submit a resume or a job
//! description, poll the job id for progress and results. Validation
//! failures surface as 400s; everything else is asynchronous.

use crate::db::get_app_data_dir;
use crate::errors::ValidationError;
use crate::jobs::{JobExecutor, JobRepository, JobType};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const MIN_JOB_DESCRIPTION_CHARS: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub executor: JobExecutor,
    pub repo: JobRepository,
}

#[derive(Debug, Deserialize)]
pub struct EmployerJobRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct JobSubmitResponse {
    pub job_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/jobs/candidate", post(submit_candidate_job))
        .route("/jobs/employer", post(submit_employer_job))
        .route("/jobs/:job_id", get(get_job_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "TalentMatch API",
        "status": "running",
        "endpoints": {
            "candidate_job": "POST /jobs/candidate",
            "employer_job": "POST /jobs/employer",
            "job_status": "GET /jobs/{job_id}"
        }
    }))
}

fn bad_request(error: ValidationError) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"detail": error.to_string()}))).into_response()
}

fn internal_error(detail: String) -> Response {
    log::error!("[http] {}", detail);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": detail}))).into_response()
}

/// Submit a candidate resume processing job. Accepts a multipart PDF
/// upload; anything that is not a PDF is rejected with 400.
async fn submit_candidate_job(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut saved: Option<(String, std::path::PathBuf)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let filename = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if !filename.to_lowercase().ends_with(".pdf") {
            return bad_request(ValidationError::UnsupportedFileType(filename));
        }

        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => return internal_error(format!("Failed to read upload: {}", e)),
        };

        let temp_dir = get_app_data_dir().join("uploads");
        if let Err(e) = std::fs::create_dir_all(&temp_dir) {
            return internal_error(format!("Failed to create upload directory: {}", e));
        }

        let file_path = temp_dir.join(format!("{}-{}", uuid::Uuid::new_v4(), filename));
        if let Err(e) = std::fs::write(&file_path, &bytes) {
            return internal_error(format!("Failed to save file: {}", e));
        }

        saved = Some((filename, file_path));
        break;
    }

    let (filename, file_path) = match saved {
        Some(s) => s,
        None => return bad_request(ValidationError::MissingField("file".to_string())),
    };

    let input = json!({"file_path": file_path.to_string_lossy(), "filename": filename});
    let job_id = match state.repo.create_job(JobType::Candidate, &input) {
        Ok(id) => id,
        Err(e) => return internal_error(format!("Failed to create job: {}", e)),
    };

    if !state.executor.submit_candidate_job(job_id.clone(), file_path).await {
        return internal_error("Worker pool is not accepting jobs".to_string());
    }

    Json(JobSubmitResponse { job_id }).into_response()
}

/// Submit an employer matching job for a plain-text job description.
async fn submit_employer_job(
    State(state): State<AppState>,
    Json(request): Json<EmployerJobRequest>,
) -> Response {
    let trimmed = request.job_description.trim();
    if trimmed.len() < MIN_JOB_DESCRIPTION_CHARS {
        return bad_request(ValidationError::JobDescriptionTooShort(trimmed.len()));
    }

    let input = json!({"job_description": request.job_description});
    let job_id = match state.repo.create_job(JobType::Employer, &input) {
        Ok(id) => id,
        Err(e) => return internal_error(format!("Failed to create job: {}", e)),
    };

    if !state
        .executor
        .submit_employer_job(job_id.clone(), request.job_description)
        .await
    {
        return internal_error("Worker pool is not accepting jobs".to_string());
    }

    Json(JobSubmitResponse { job_id }).into_response()
}

/// Current status, progress, and (when completed) results of a job.
async fn get_job_status(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match state.repo.get_job(&job_id) {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => {
            (StatusCode::NOT_FOUND, Json(json!({"detail": "Job not found"}))).into_response()
        }
        Err(e) => internal_error(format!("Failed to load job: {}", e)),
    }
}
