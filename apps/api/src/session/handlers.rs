//! Axum route handlers for the session API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents::extract::DocumentKind;
use crate::documents::package::ARCHIVE_NAME;
use crate::documents::UploadedFile;
use crate::errors::AppError;
use crate::matching::models::{MatchedSkill, ResumeFailure};
use crate::matching::scoring::{skill_coverage, SkillCoverage};
use crate::session::models::{resolve_top_n, Phase, Progress, Session};
use crate::session::orchestrator::{start_assessment, start_processing};
use crate::state::AppState;
use crate::taxonomy;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session_id: Uuid,
    pub expires_after_idle_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct UploadSummary {
    pub job_description: Option<String>,
    pub taxonomy: Option<String>,
    pub resumes: Vec<String>,
}

/// Upload result: the session after the upload plus any resumes left out.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub rejected: Vec<ResumeFailure>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentSummary {
    pub candidate_count: usize,
    pub question_count: usize,
    pub file_names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub busy: bool,
    pub progress: Progress,
    pub last_error: Option<String>,
    pub uploads: UploadSummary,
    pub job_skill_count: usize,
    pub candidate_count: usize,
    pub failure_count: usize,
    pub assessment: Option<AssessmentSummary>,
    pub created_at: DateTime<Utc>,
}

impl SessionSnapshot {
    fn of(session: &Session) -> Self {
        let uploads = session.uploads();
        Self {
            session_id: session.id,
            phase: session.phase(),
            busy: session.is_busy(),
            progress: session.progress().clone(),
            last_error: session.last_error().map(str::to_string),
            uploads: UploadSummary {
                job_description: uploads.job_description.as_ref().map(|f| f.file_name.clone()),
                taxonomy: uploads.taxonomy.as_ref().map(|f| f.file_name.clone()),
                resumes: uploads.resumes.iter().map(|f| f.file_name.clone()).collect(),
            },
            job_skill_count: session.job_skills().len(),
            candidate_count: session.candidates().len(),
            failure_count: session.failures().len(),
            assessment: session.assessment().map(|a| AssessmentSummary {
                candidate_count: a.candidate_ids.len(),
                question_count: a.items.len(),
                file_names: a.file_names.clone(),
            }),
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunAccepted {
    pub session_id: Uuid,
    pub run_id: u64,
    pub phase: Phase,
}

#[derive(Debug, Serialize)]
pub struct JobSkillsResponse {
    pub job_skills: Vec<MatchedSkill>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatesQuery {
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub candidate_id: Uuid,
    pub name: String,
    pub qualification: String,
    pub source_file: String,
    pub score: f64,
    pub skills: Vec<MatchedSkill>,
    pub coverage: Vec<SkillCoverage>,
}

#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub total_scored: usize,
    pub top_n: usize,
    pub candidates: Vec<RankedCandidate>,
    pub failures: Vec<ResumeFailure>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssessmentRequest {
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentAccepted {
    pub session_id: Uuid,
    pub run_id: u64,
    pub selected_candidates: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/auth/login
///
/// Checks the shared password and opens a session.
pub async fn handle_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    if !password_matches(&request.password, &state.config.app_password) {
        warn!("Rejected login attempt");
        return Err(AppError::Unauthorized);
    }

    let (session_id, _) = state.sessions.create();
    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            session_id,
            expires_after_idle_minutes: state.config.session_ttl_minutes,
        }),
    ))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(session_id)?;
    let snapshot = SessionSnapshot::of(&session.lock());
    Ok(Json(snapshot))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {session_id} not found")))
    }
}

/// POST /api/v1/sessions/:id/files
///
/// Multipart upload. Fields: `job_description` (one), `taxonomy` (one),
/// `resumes` (repeated). Any field may be sent on its own; new files replace
/// the old ones and invalidate earlier results.
///
/// A bad job description or taxonomy fails the request. A bad resume is
/// left out and reported in `rejected`; the other resumes are kept.
pub async fn handle_upload_files(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let session = state.sessions.get(session_id)?;

    let mut job_description = None;
    let mut taxonomy_file = None;
    let mut resumes = Vec::new();
    let mut rejected = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().unwrap_or("").trim().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read '{field_name}': {e}")))?;

        match field_name.as_str() {
            "job_description" | "taxonomy" | "resumes" => {}
            other => {
                return Err(AppError::Validation(format!(
                    "unexpected field '{other}'"
                )))
            }
        }
        if file_name.is_empty() {
            return Err(AppError::Validation(format!(
                "field '{field_name}' must be a file"
            )));
        }

        let file = UploadedFile::new(file_name, bytes);
        match field_name.as_str() {
            "job_description" => {
                check_document(&file).map_err(AppError::Validation)?;
                job_description = Some(file);
            }
            "taxonomy" => {
                check_taxonomy(&file).map_err(AppError::Validation)?;
                taxonomy_file = Some(file);
            }
            _ => match check_document(&file) {
                Ok(()) => resumes.push(file),
                Err(reason) => {
                    warn!("Session {session_id}: resume '{}' rejected: {reason}", file.file_name);
                    rejected.push(ResumeFailure {
                        file_name: file.file_name,
                        reason,
                    });
                }
            },
        }
    }

    if job_description.is_none() && taxonomy_file.is_none() && resumes.is_empty() {
        let message = match rejected.as_slice() {
            [] => "no files were uploaded".to_string(),
            _ => format!(
                "no usable files were uploaded: {}",
                rejected
                    .iter()
                    .map(|r| r.reason.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
        };
        return Err(AppError::Validation(message));
    }

    let mut session = session.lock();
    session.replace_uploads(job_description, taxonomy_file, resumes)?;
    info!(
        "Session {session_id}: uploads updated ({} resumes, {} rejected, phase {:?})",
        session.uploads().resumes.len(),
        rejected.len(),
        session.phase()
    );
    Ok(Json(UploadResponse {
        session: SessionSnapshot::of(&session),
        rejected,
    }))
}

/// POST /api/v1/sessions/:id/process
///
/// Starts processing, or recomputes from scratch if results already exist.
pub async fn handle_process(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<(StatusCode, Json<RunAccepted>), AppError> {
    let session = state.sessions.get(session_id)?;
    let run_id = start_processing(&state, &session)?;
    info!("Session {session_id}: processing run {run_id} started");

    Ok((
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            session_id,
            run_id,
            phase: Phase::Processing,
        }),
    ))
}

/// GET /api/v1/sessions/:id/job-skills
pub async fn handle_job_skills(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<JobSkillsResponse>, AppError> {
    let session = state.sessions.get(session_id)?;
    let session = session.lock();
    if session.job_skills().is_empty() {
        return Err(AppError::Conflict(
            "job skills are not available; process the uploads first".to_string(),
        ));
    }
    Ok(Json(JobSkillsResponse {
        job_skills: session.job_skills().to_vec(),
    }))
}

/// GET /api/v1/sessions/:id/candidates?top_n=N
///
/// Ranked candidates with their extracted skills and per-skill coverage,
/// plus every resume that could not be processed.
pub async fn handle_candidates(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<CandidatesQuery>,
) -> Result<Json<CandidatesResponse>, AppError> {
    let session = state.sessions.get(session_id)?;
    let session = session.lock();
    if !session.phase().has_scores() {
        return Err(AppError::Conflict(
            "candidates have not been scored yet".to_string(),
        ));
    }

    let scores = session.scores();
    let top_n = resolve_top_n(query.top_n, scores.len())?;
    let candidates = scores[..top_n]
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let candidate = session.candidate(entry.candidate_id)?;
            Some(RankedCandidate {
                rank: i + 1,
                candidate_id: candidate.id,
                name: candidate.name.clone(),
                qualification: candidate.qualification.clone(),
                source_file: candidate.source_file.clone(),
                score: entry.score,
                skills: candidate.skills.clone(),
                coverage: skill_coverage(&candidate.skills, session.job_skills()),
            })
        })
        .collect();

    Ok(Json(CandidatesResponse {
        total_scored: scores.len(),
        top_n,
        candidates,
        failures: session.failures().to_vec(),
    }))
}

/// POST /api/v1/sessions/:id/assessments
///
/// Generates assessments for the top `top_n` candidates (all if omitted).
pub async fn handle_generate_assessments(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    request: Option<Json<AssessmentRequest>>,
) -> Result<(StatusCode, Json<AssessmentAccepted>), AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let session = state.sessions.get(session_id)?;
    let (run_id, selected_candidates) = start_assessment(&state, &session, request.top_n)?;
    info!("Session {session_id}: assessment run {run_id} started for {selected_candidates} candidates");

    Ok((
        StatusCode::ACCEPTED,
        Json(AssessmentAccepted {
            session_id,
            run_id,
            selected_candidates,
        }),
    ))
}

/// GET /api/v1/sessions/:id/assessments/download
pub async fn handle_download_assessments(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(session_id)?;
    let archive = session
        .lock()
        .assessment()
        .map(|a| a.archive.clone())
        .ok_or_else(|| AppError::NotFound("no assessments have been generated".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{ARCHIVE_NAME}\""),
            ),
        ],
        archive,
    ))
}

/// Upload-time check for a job description or resume. Errors are the reason
/// shown to the recruiter.
fn check_document(file: &UploadedFile) -> Result<(), String> {
    if DocumentKind::from_file_name(&file.file_name).is_none() {
        return Err(format!(
            "'{}' is not a supported document (.pdf, .docx or .txt)",
            file.file_name
        ));
    }
    if file.bytes.is_empty() {
        return Err(format!("'{}' is empty", file.file_name));
    }
    Ok(())
}

fn check_taxonomy(file: &UploadedFile) -> Result<(), String> {
    if !taxonomy::is_supported_file(&file.file_name) {
        return Err(format!(
            "'{}' is not a supported taxonomy file (.xlsx, .xls, .ods or .csv)",
            file.file_name
        ));
    }
    if file.bytes.is_empty() {
        return Err(format!("'{}' is empty", file.file_name));
    }
    Ok(())
}

/// Compares without short-circuiting on the first differing byte.
fn password_matches(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
