//! Background job records and the fixed-size worker pool
//!
//! Jobs are persisted rows; the executor is a small pool (default 2) of
//! worker tasks draining one queue. Each job runs on a single worker and
//! reports progress through the repository, so a crash leaves the row in
//! its last recorded state.

use crate::ai::extractor;
use crate::document;
use crate::engine::MatchingEngine;
use crate::errors::DatabaseError;
use crate::profile::build_candidate_roles;
use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Candidate,
    Employer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Job row as returned to the HTTP caller.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub status: String,
    pub progress: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: String,
}

/// CRUD over the jobs table. A fresh connection per operation keeps the
/// repository safe to clone across worker tasks.
#[derive(Clone)]
pub struct JobRepository;

impl JobRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn create_job(
        &self,
        job_type: JobType,
        input_data: &serde_json::Value,
    ) -> Result<String, DatabaseError> {
        let job_id = uuid::Uuid::new_v4().to_string();
        let conn = crate::db::get_connection()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        let type_str = match job_type {
            JobType::Candidate => "candidate",
            JobType::Employer => "employer",
        };

        conn.execute(
            "INSERT INTO jobs (job_id, job_type, status, progress, message, input_data, created_at, updated_at)
             VALUES (?, ?, 'queued', 0, 'Job queued', ?, ?, ?)",
            params![job_id, type_str, input_data.to_string(), now, now],
        )?;

        Ok(job_id)
    }

    pub fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, DatabaseError> {
        let conn = crate::db::get_connection()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let record = conn
            .query_row(
                "SELECT job_id, job_type, status, progress, message, result, error_message, created_at
                 FROM jobs WHERE job_id = ?",
                params![job_id],
                |row| {
                    let result_raw: Option<String> = row.get(5)?;
                    Ok(JobRecord {
                        id: row.get(0)?,
                        job_type: row.get(1)?,
                        status: row.get(2)?,
                        progress: row.get(3)?,
                        message: row.get(4)?,
                        result: result_raw.and_then(|r| serde_json::from_str(&r).ok()),
                        error_message: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .ok();

        Ok(record)
    }

    pub fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        progress: i64,
        message: &str,
        result: Option<&serde_json::Value>,
        error_message: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let conn = crate::db::get_connection()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        let result_json = result.map(|r| r.to_string());

        match status {
            JobStatus::Completed => {
                conn.execute(
                    "UPDATE jobs
                     SET status = ?, progress = ?, message = ?, result = ?,
                         updated_at = ?, completed_at = ?
                     WHERE job_id = ?",
                    params![status.as_str(), progress, message, result_json, now, now, job_id],
                )?;
            }
            JobStatus::Failed => {
                conn.execute(
                    "UPDATE jobs
                     SET status = ?, progress = ?, message = ?, error_message = ?,
                         updated_at = ?, completed_at = ?
                     WHERE job_id = ?",
                    params![status.as_str(), progress, message, error_message, now, now, job_id],
                )?;
            }
            _ => {
                conn.execute(
                    "UPDATE jobs
                     SET status = ?, progress = ?, message = ?, updated_at = ?
                     WHERE job_id = ?",
                    params![status.as_str(), progress, message, now, job_id],
                )?;
            }
        }

        Ok(())
    }
}

impl Default for JobRepository {
    fn default() -> Self {
        Self::new()
    }
}

enum JobTask {
    Candidate { job_id: String, pdf_path: PathBuf },
    Employer { job_id: String, job_description: String },
}

/// Handle for submitting jobs to the worker pool.
#[derive(Clone)]
pub struct JobExecutor {
    sender: mpsc::Sender<JobTask>,
}

impl JobExecutor {
    /// Spawn `max_workers` worker tasks draining a shared queue.
    pub fn start(engine: Arc<MatchingEngine>, repo: JobRepository, max_workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<JobTask>(64);
        let receiver = Arc::new(Mutex::new(receiver));

        for worker_id in 0..max_workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let engine = Arc::clone(&engine);
            let repo = repo.clone();

            tokio::spawn(async move {
                loop {
                    // Hold the lock only while receiving, so workers drain
                    // the queue concurrently.
                    let task = { receiver.lock().await.recv().await };
                    let task = match task {
                        Some(t) => t,
                        None => break,
                    };

                    match task {
                        JobTask::Candidate { job_id, pdf_path } => {
                            log::info!("[JobExecutor:{}] Candidate job {}", worker_id, job_id);
                            process_candidate_job(&engine, &repo, &job_id, &pdf_path).await;
                        }
                        JobTask::Employer { job_id, job_description } => {
                            log::info!("[JobExecutor:{}] Employer job {}", worker_id, job_id);
                            process_employer_job(&engine, &repo, &job_id, &job_description).await;
                        }
                    }
                }
                log::info!("[JobExecutor:{}] Worker shutting down", worker_id);
            });
        }

        Self { sender }
    }

    pub async fn submit_candidate_job(&self, job_id: String, pdf_path: PathBuf) -> bool {
        self.sender.send(JobTask::Candidate { job_id, pdf_path }).await.is_ok()
    }

    pub async fn submit_employer_job(&self, job_id: String, job_description: String) -> bool {
        self.sender.send(JobTask::Employer { job_id, job_description }).await.is_ok()
    }
}

fn update(
    repo: &JobRepository,
    job_id: &str,
    status: JobStatus,
    progress: i64,
    message: &str,
    result: Option<&serde_json::Value>,
    error: Option<&str>,
) {
    if let Err(e) = repo.update_job_status(job_id, status, progress, message, result, error) {
        log::error!("[JobExecutor] Failed to update job {}: {}", job_id, e);
    }
}

async fn process_candidate_job(
    engine: &MatchingEngine,
    repo: &JobRepository,
    job_id: &str,
    pdf_path: &std::path::Path,
) {
    update(repo, job_id, JobStatus::Processing, 20, "Extracting text from resume", None, None);

    let result: Result<serde_json::Value, crate::errors::TalentMatchError> = async {
        let text = document::extract_text_from_pdf(pdf_path)?;
        let sections = document::bucket_sections(&text);

        update(repo, job_id, JobStatus::Processing, 40, "Recovering candidate identity", None, None);
        let contact_text = format!("{}\n{}", sections.contact_info, sections.other);
        let identity = extractor::recover_identity(engine.provider(), &contact_text).await?;

        update(repo, job_id, JobStatus::Processing, 60, "Extracting work experience", None, None);
        let experience_text = format!("{}\n{}", sections.experience, sections.skills);
        let raw_experience =
            extractor::extract_raw_experience(engine.provider(), &experience_text).await?;

        update(repo, job_id, JobStatus::Processing, 80, "Building professional profile", None, None);
        let report = engine.ingest_resume(&identity, &raw_experience).await?;

        let roles = build_candidate_roles(&raw_experience, engine.config().reference_date);
        let candidate_roles: Vec<serde_json::Value> = roles
            .iter()
            .map(|r| {
                json!({
                    "title": r.title,
                    "verified_duration": r.verified_duration_months,
                    "raw_technologies": r.raw_technologies,
                    "domains": r.domains,
                })
            })
            .collect();

        Ok(json!({
            "profile": {
                "identity": identity,
                "candidate_id": report.candidate_id,
                "candidate_roles": candidate_roles,
                "skill_count": report.skill_count,
            }
        }))
    }
    .await;

    match result {
        Ok(profile) => {
            update(
                repo,
                job_id,
                JobStatus::Completed,
                100,
                "Resume processed successfully",
                Some(&profile),
                None,
            );
        }
        Err(e) => {
            crate::logging::log_error_chain(&format!("JobExecutor candidate {}", job_id), &e);
            update(
                repo,
                job_id,
                JobStatus::Failed,
                0,
                &format!("Processing failed: {}", e),
                None,
                Some(&e.to_string()),
            );
        }
    }
}

async fn process_employer_job(
    engine: &MatchingEngine,
    repo: &JobRepository,
    job_id: &str,
    job_description: &str,
) {
    update(repo, job_id, JobStatus::Processing, 20, "Analyzing job description", None, None);

    let limit = engine.config().result_limit;
    match engine.rank_candidates(job_description, limit).await {
        Ok(report) => {
            let result = json!({
                "matches": report.results,
                "role_context": report.role_context,
            });
            let message = format!("Found {} matching candidates", report.results.len());
            update(repo, job_id, JobStatus::Completed, 100, &message, Some(&result), None);
        }
        Err(e) => {
            crate::logging::log_error_chain(&format!("JobExecutor employer {}", job_id), &e);
            update(
                repo,
                job_id,
                JobStatus::Failed,
                0,
                &format!("Matching failed: {}", e),
                None,
                Some(&e.to_string()),
            );
        }
    }
}
