//! Session state for one authenticated user working through the pipeline.
//!
//! All mutation goes through `Session` methods; the orchestrator and handlers
//! never poke at fields that carry invariants (`busy`, `run_id`, `phase`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::assessment::AssessmentItem;
use crate::documents::UploadedFile;
use crate::errors::AppError;
use crate::matching::models::{Candidate, MatchedSkill, ResumeFailure};
use crate::matching::scoring::ScoreEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    FilesUploaded,
    Processing,
    Scored,
    GeneratingAssessment,
    AssessmentReady,
}

impl Phase {
    /// Phases in which ranked candidates are available.
    pub fn has_scores(self) -> bool {
        matches!(
            self,
            Phase::Scored | Phase::GeneratingAssessment | Phase::AssessmentReady
        )
    }
}

/// The three inputs of a run.
#[derive(Debug, Clone, Default)]
pub struct SessionUploads {
    pub job_description: Option<UploadedFile>,
    pub taxonomy: Option<UploadedFile>,
    pub resumes: Vec<UploadedFile>,
}

impl SessionUploads {
    pub fn is_complete(&self) -> bool {
        self.job_description.is_some() && self.taxonomy.is_some() && !self.resumes.is_empty()
    }
}

/// What the user sees while a long operation runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Progress {
    pub stage: String,
    pub current: usize,
    pub total: usize,
    pub message: String,
    pub percent: u8,
}

impl Progress {
    pub fn new(stage: &str, current: usize, total: usize, message: impl Into<String>) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((current.min(total) * 100) / total) as u8
        };
        Self {
            stage: stage.to_string(),
            current,
            total,
            message: message.into(),
            percent,
        }
    }
}

/// Generated assessment for the selected candidates, ready for download.
#[derive(Debug, Clone)]
pub struct AssessmentBundle {
    pub items: Vec<AssessmentItem>,
    pub candidate_ids: Vec<Uuid>,
    pub file_names: Vec<String>,
    pub archive: Vec<u8>,
}

/// Inputs captured when an assessment run starts.
#[derive(Debug, Clone)]
pub struct AssessmentPlan {
    pub run_id: u64,
    pub job_skills: Vec<MatchedSkill>,
    pub selected: Vec<Candidate>,
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    phase: Phase,
    uploads: SessionUploads,
    job_skills: Vec<MatchedSkill>,
    candidates: Vec<Candidate>,
    scores: Vec<ScoreEntry>,
    failures: Vec<ResumeFailure>,
    assessment: Option<AssessmentBundle>,
    progress: Progress,
    last_error: Option<String>,
    busy: bool,
    run_id: u64,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_seen: now,
            phase: Phase::Idle,
            uploads: SessionUploads::default(),
            job_skills: Vec::new(),
            candidates: Vec::new(),
            scores: Vec::new(),
            failures: Vec::new(),
            assessment: None,
            progress: Progress::default(),
            last_error: None,
            busy: false,
            run_id: 0,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn uploads(&self) -> &SessionUploads {
        &self.uploads
    }

    pub fn job_skills(&self) -> &[MatchedSkill] {
        &self.job_skills
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Ranked best first.
    pub fn scores(&self) -> &[ScoreEntry] {
        &self.scores
    }

    pub fn failures(&self) -> &[ResumeFailure] {
        &self.failures
    }

    pub fn assessment(&self) -> Option<&AssessmentBundle> {
        self.assessment.as_ref()
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn candidate(&self, id: Uuid) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    fn ensure_idle(&self) -> Result<(), AppError> {
        if self.busy {
            return Err(AppError::Conflict(
                "another operation is still running for this session".to_string(),
            ));
        }
        Ok(())
    }

    /// Drops everything computed from the uploads.
    fn clear_derived(&mut self) {
        self.job_skills.clear();
        self.candidates.clear();
        self.scores.clear();
        self.failures.clear();
        self.assessment = None;
        self.last_error = None;
        self.progress = Progress::default();
    }

    /// Merges newly uploaded files. Provided resumes replace the previous set.
    /// Any new input invalidates earlier results.
    pub fn replace_uploads(
        &mut self,
        job_description: Option<UploadedFile>,
        taxonomy: Option<UploadedFile>,
        resumes: Vec<UploadedFile>,
    ) -> Result<(), AppError> {
        self.ensure_idle()?;

        if job_description.is_some() {
            self.uploads.job_description = job_description;
        }
        if taxonomy.is_some() {
            self.uploads.taxonomy = taxonomy;
        }
        if !resumes.is_empty() {
            self.uploads.resumes = resumes;
        }

        self.run_id += 1;
        self.clear_derived();
        self.phase = if self.uploads.is_complete() {
            Phase::FilesUploaded
        } else {
            Phase::Idle
        };
        Ok(())
    }

    /// Enters `Processing`. Previous results are cleared before anything
    /// new can be stored. Returns the run id the pipeline must commit under.
    pub fn begin_processing(&mut self) -> Result<u64, AppError> {
        self.ensure_idle()?;
        if !self.uploads.is_complete() {
            return Err(AppError::Validation(
                "upload a job description, a taxonomy and at least one resume first".to_string(),
            ));
        }

        self.run_id += 1;
        self.clear_derived();
        self.busy = true;
        self.phase = Phase::Processing;
        self.progress = Progress::new("starting", 0, self.uploads.resumes.len(), "Starting");
        Ok(self.run_id)
    }

    /// Enters `GeneratingAssessment` for the top `top_n` ranked candidates.
    pub fn begin_assessment(&mut self, top_n: Option<usize>) -> Result<AssessmentPlan, AppError> {
        self.ensure_idle()?;
        if !self.phase.has_scores() {
            return Err(AppError::Conflict(
                "candidates have not been scored yet".to_string(),
            ));
        }
        let top_n = resolve_top_n(top_n, self.scores.len())?;
        if top_n == 0 {
            return Err(AppError::Validation(
                "no scored candidates to assess".to_string(),
            ));
        }

        let selected: Vec<Candidate> = self.scores[..top_n]
            .iter()
            .filter_map(|entry| self.candidate(entry.candidate_id).cloned())
            .collect();

        self.run_id += 1;
        self.assessment = None;
        self.last_error = None;
        self.busy = true;
        self.phase = Phase::GeneratingAssessment;
        self.progress = Progress::new("questions", 0, selected.len(), "Writing questions");

        Ok(AssessmentPlan {
            run_id: self.run_id,
            job_skills: self.job_skills.clone(),
            selected,
        })
    }

    fn is_current(&self, run_id: u64) -> bool {
        self.run_id == run_id
    }

    pub fn set_progress(&mut self, run_id: u64, progress: Progress) {
        if self.is_current(run_id) {
            self.progress = progress;
        }
    }

    pub fn store_job_skills(&mut self, run_id: u64, skills: Vec<MatchedSkill>) {
        if self.is_current(run_id) {
            self.job_skills = skills;
        }
    }

    /// Stores the scored batch and moves to `Scored`. Stale runs are ignored.
    pub fn complete_processing(
        &mut self,
        run_id: u64,
        candidates: Vec<Candidate>,
        failures: Vec<ResumeFailure>,
        scores: Vec<ScoreEntry>,
    ) -> bool {
        if !self.is_current(run_id) {
            return false;
        }
        let total = candidates.len() + failures.len();
        self.candidates = candidates;
        self.failures = failures;
        self.scores = scores;
        self.phase = Phase::Scored;
        self.progress = Progress::new(
            "scored",
            total,
            total,
            format!("Scored {} of {} resumes", self.scores.len(), total),
        );
        true
    }

    pub fn complete_assessment(&mut self, run_id: u64, bundle: AssessmentBundle) -> bool {
        if !self.is_current(run_id) {
            return false;
        }
        let n = bundle.candidate_ids.len();
        self.assessment = Some(bundle);
        self.phase = Phase::AssessmentReady;
        self.progress = Progress::new("ready", n, n, format!("Assessments ready for {n} candidates"));
        true
    }

    /// Records a failed run and steps back to the phase the user can retry from.
    pub fn fail(&mut self, run_id: u64, message: impl Into<String>) {
        if !self.is_current(run_id) {
            return;
        }
        let message = message.into();
        self.phase = match self.phase {
            Phase::Processing => {
                self.clear_derived();
                Phase::FilesUploaded
            }
            Phase::GeneratingAssessment => Phase::Scored,
            other => other,
        };
        self.progress = Progress::new("failed", 0, 0, message.clone());
        self.last_error = Some(message);
    }

    /// Clears the busy flag for `run_id`. A run that ends without committing
    /// or failing (task panic) is recorded as interrupted.
    pub fn finish(&mut self, run_id: u64) {
        if !self.is_current(run_id) {
            return;
        }
        if matches!(self.phase, Phase::Processing | Phase::GeneratingAssessment) {
            self.fail(run_id, "operation was interrupted");
        }
        self.busy = false;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates a requested top-N against the number of ranked candidates.
/// `None` means all; `0` is rejected; anything larger is clamped.
pub fn resolve_top_n(requested: Option<usize>, available: usize) -> Result<usize, AppError> {
    match requested {
        None => Ok(available),
        Some(0) => Err(AppError::Validation("top_n must be at least 1".to_string())),
        Some(n) => Ok(n.min(available)),
    }
}
