//! Orchestrator: drives a session through its phases.
//!
//! Long operations run as background tasks so the triggering request returns
//! immediately. Each run carries the run id it was started under; results
//! from a run that is no longer current are discarded.

use std::sync::Arc;

use anyhow::anyhow;
use tracing::{error, info, warn};

use crate::assessment::generate_assessment_with_answers;
use crate::documents::extract::extract_text_blocking;
use crate::documents::package::package_documents;
use crate::documents::render::{
    render_answer_key, render_candidate_assessment, unique_assessment_file_names,
};
use crate::errors::AppError;
use crate::matching::jd_matcher::match_job_skills;
use crate::matching::resume_processor::process_resumes;
use crate::session::models::{AssessmentBundle, AssessmentPlan, Progress};
use crate::session::store::SharedSession;
use crate::state::AppState;
use crate::taxonomy::load_taxonomy;

/// Clears the session's busy flag when the run ends, however it ends.
struct BusyGuard {
    session: SharedSession,
    run_id: u64,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.session.lock().finish(self.run_id);
    }
}

/// Starts (or restarts) processing in the background. Rejected while the
/// session is busy or its uploads are incomplete.
pub fn start_processing(state: &AppState, session: &SharedSession) -> Result<u64, AppError> {
    let run_id = session.lock().begin_processing()?;
    let guard = BusyGuard {
        session: Arc::clone(session),
        run_id,
    };

    let state = state.clone();
    let session = Arc::clone(session);
    tokio::spawn(async move {
        let _guard = guard;
        run_processing(&state, &session, run_id).await;
    });
    Ok(run_id)
}

/// Starts assessment generation for the top `top_n` candidates in the background.
/// Returns the run id and how many candidates were selected.
pub fn start_assessment(
    state: &AppState,
    session: &SharedSession,
    top_n: Option<usize>,
) -> Result<(u64, usize), AppError> {
    let plan = session.lock().begin_assessment(top_n)?;
    let run_id = plan.run_id;
    let selected = plan.selected.len();
    let guard = BusyGuard {
        session: Arc::clone(session),
        run_id,
    };

    let state = state.clone();
    let session = Arc::clone(session);
    tokio::spawn(async move {
        let _guard = guard;
        run_assessment(&state, &session, plan).await;
    });
    Ok((run_id, selected))
}

/// Taxonomy → job skills → resumes → scores. The session must already be in
/// `Processing` under `run_id`.
pub async fn run_processing(state: &AppState, session: &SharedSession, run_id: u64) {
    if let Err(e) = process(state, session, run_id).await {
        error!("Processing run {run_id} failed: {e}");
        session.lock().fail(run_id, e.to_string());
    }
}

async fn process(state: &AppState, session: &SharedSession, run_id: u64) -> Result<(), AppError> {
    let uploads = session.lock().uploads().clone();
    let (Some(jd_file), Some(taxonomy_file)) = (uploads.job_description, uploads.taxonomy) else {
        return Err(AppError::Validation("uploads are incomplete".to_string()));
    };
    let total = uploads.resumes.len();
    let report = |progress: Progress| session.lock().set_progress(run_id, progress);

    report(Progress::new(
        "taxonomy",
        0,
        total,
        format!("Loading {}", taxonomy_file.file_name),
    ));
    let taxonomy = tokio::task::spawn_blocking(move || {
        load_taxonomy(&taxonomy_file.file_name, &taxonomy_file.bytes)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("taxonomy loading aborted: {e}")))??;

    report(Progress::new(
        "job_skills",
        0,
        total,
        "Matching job description to the framework",
    ));
    let jd_text = extract_text_blocking(jd_file.file_name, jd_file.bytes).await?;
    let job_skills = match_job_skills(&jd_text, &taxonomy, state.llm.as_ref()).await?;
    session.lock().store_job_skills(run_id, job_skills.clone());

    report(Progress::new("resumes", 0, total, "Processing resumes"));
    let progress_session = Arc::clone(session);
    let batch = process_resumes(
        uploads.resumes,
        Arc::new(taxonomy),
        Arc::clone(&state.llm),
        state.config.resume_concurrency,
        move |done, total, file_name| {
            progress_session.lock().set_progress(
                run_id,
                Progress::new("resumes", done, total, format!("Processed {file_name}")),
            );
        },
    )
    .await;

    let scores = state.scorer.score(&batch.candidates, &job_skills).await?;
    info!(
        "Run {run_id}: scored {} candidates, {} resumes failed",
        scores.len(),
        batch.failures.len()
    );

    let committed = session
        .lock()
        .complete_processing(run_id, batch.candidates, batch.failures, scores);
    if !committed {
        warn!("Run {run_id} superseded; results discarded");
    }
    Ok(())
}

/// Questions → one document per candidate plus the answer key → zip.
pub async fn run_assessment(state: &AppState, session: &SharedSession, plan: AssessmentPlan) {
    let run_id = plan.run_id;
    match assess(state, session, plan).await {
        Ok(bundle) => {
            let n = bundle.candidate_ids.len();
            if session.lock().complete_assessment(run_id, bundle) {
                info!("Run {run_id}: assessments ready for {n} candidates");
            } else {
                warn!("Run {run_id} superseded; assessment discarded");
            }
        }
        Err(e) => {
            error!("Assessment run {run_id} failed: {e}");
            session.lock().fail(run_id, e.to_string());
        }
    }
}

async fn assess(
    state: &AppState,
    session: &SharedSession,
    plan: AssessmentPlan,
) -> Result<AssessmentBundle, AppError> {
    let run_id = plan.run_id;
    let items = generate_assessment_with_answers(
        &plan.job_skills,
        state.config.assessment_max_skills,
        state.llm.as_ref(),
    )
    .await?;

    let candidate_ids = plan.selected.iter().map(|c| c.id).collect();
    let names: Vec<String> = plan.selected.iter().map(|c| c.name.clone()).collect();
    let file_names = unique_assessment_file_names(&names);

    let progress_session = Arc::clone(session);
    let render_items = items.clone();
    let render_file_names = file_names.clone();
    let archive = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, AppError> {
        let total = names.len();
        let mut documents = Vec::with_capacity(total + 1);
        for (i, (name, file_name)) in names.iter().zip(&render_file_names).enumerate() {
            documents.push(render_candidate_assessment(file_name, name, &render_items)?);
            progress_session.lock().set_progress(
                run_id,
                Progress::new("documents", i + 1, total, format!("Rendered {file_name}")),
            );
        }
        documents.push(render_answer_key(&render_items)?);
        package_documents(&documents, total + 1)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("assessment rendering aborted: {e}")))??;

    Ok(AssessmentBundle {
        items,
        candidate_ids,
        file_names,
        archive,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use zip::ZipArchive;

    use super::*;
    use crate::config::Config;
    use crate::documents::render::ANSWER_KEY_FILE;
    use crate::documents::UploadedFile;
    use crate::llm_client::testing::ScriptedModel;
    use crate::llm_client::LanguageModel;
    use crate::matching::scoring::ProficiencyScorer;
    use crate::session::models::{Phase, Session};

    const TAXONOMY_CSV: &str = "Sector,Track,Skill\nICT,Data,Data Engineering\nICT,Cloud,Cloud Computing\n";

    const JOB_SKILLS: &str = r#"[
        {"skill": "Data Engineering", "proficiency_level": 3, "explanation": "Builds pipelines"},
        {"skill": "Cloud Computing", "proficiency_level": 2, "explanation": "Runs on AWS"}
    ]"#;

    const ASSESSMENT: &str = r#"[
        {"skill": "Data Engineering", "question": "Design a pipeline", "answer": "Idempotent loads"},
        {"skill": "Cloud Computing", "question": "Pick a region", "answer": "Latency and cost"}
    ]"#;

    /// Answers by prompt type; resumes are recognised by the name in their text.
    fn recruiter_model() -> ScriptedModel {
        ScriptedModel::new(|prompt| {
            let reply = if prompt.contains("Write one assessment question") {
                ASSESSMENT
            } else if let Some((_, resume)) = prompt.split_once("RESUME:\n") {
                if resume.contains("Alex") {
                    r#"{"name": "Alex Tan", "qualification": "BSc Computing", "skills": [
                        {"skill": "Data Engineering", "proficiency_level": 4, "explanation": "Led ETL"},
                        {"skill": "Cloud Computing", "proficiency_level": 2, "explanation": "AWS"}]}"#
                } else {
                    r#"{"name": "Jane Lim", "qualification": "", "skills": [
                        {"skill": "Data Engineering", "proficiency_level": 2, "explanation": "SQL"}]}"#
                }
            } else {
                JOB_SKILLS
            };
            Ok(reply.to_string())
        })
    }

    fn app_state(model: impl LanguageModel + 'static) -> AppState {
        AppState::new(Config::for_tests(), Arc::new(model), Arc::new(ProficiencyScorer))
    }

    fn session_with(resumes: Vec<UploadedFile>) -> SharedSession {
        let mut session = Session::new();
        session
            .replace_uploads(
                Some(UploadedFile::new("jd.txt", "Data engineer for our AWS platform")),
                Some(UploadedFile::new("framework.csv", TAXONOMY_CSV)),
                resumes,
            )
            .unwrap();
        Arc::new(parking_lot::Mutex::new(session))
    }

    fn default_resumes() -> Vec<UploadedFile> {
        vec![
            UploadedFile::new("jane.txt", "Jane Lim. Analyst writing SQL reports."),
            UploadedFile::new("alex.txt", "Alex Tan. Data engineer, five years of ETL on AWS."),
        ]
    }

    async fn process_now(state: &AppState, session: &SharedSession) {
        let run_id = session.lock().begin_processing().unwrap();
        run_processing(state, session, run_id).await;
        session.lock().finish(run_id);
    }

    #[tokio::test]
    async fn test_end_to_end_scores_and_ranking() {
        let state = app_state(recruiter_model());
        let session = session_with(default_resumes());
        process_now(&state, &session).await;

        let s = session.lock();
        assert_eq!(s.phase(), Phase::Scored);
        assert_eq!(s.job_skills().len(), 2);
        assert_eq!(s.scores().len(), 2);
        assert_eq!(s.scores()[0].candidate_name, "Alex Tan");
        assert_eq!(s.scores()[0].score, 100.0);
        assert_eq!(s.scores()[1].candidate_name, "Jane Lim");
        assert!(s.scores()[1].score > 0.0 && s.scores()[1].score < 100.0);
        // upload order is kept for candidates
        assert_eq!(s.candidates()[0].name, "Jane Lim");
        assert_eq!(s.candidates()[0].qualification, "N/A");
        assert!(!s.is_busy());
    }

    #[tokio::test]
    async fn test_unreadable_resume_reported_and_batch_continues() {
        let state = app_state(recruiter_model());
        let mut resumes = default_resumes();
        resumes.push(UploadedFile::new("blank.txt", "   "));
        resumes.push(UploadedFile::new("photo.png", vec![0u8, 1, 2]));
        let session = session_with(resumes);
        process_now(&state, &session).await;

        let s = session.lock();
        assert_eq!(s.phase(), Phase::Scored);
        assert_eq!(s.scores().len(), 2);
        let failed: Vec<&str> = s.failures().iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(failed, vec!["blank.txt", "photo.png"]);
    }

    #[tokio::test]
    async fn test_job_matching_failure_returns_to_uploaded() {
        let state = app_state(ScriptedModel::fixed("I could not find any skills."));
        let session = session_with(default_resumes());
        process_now(&state, &session).await;

        let s = session.lock();
        assert_eq!(s.phase(), Phase::FilesUploaded);
        assert!(s.last_error().is_some());
        assert!(s.scores().is_empty());
    }

    #[tokio::test]
    async fn test_bad_taxonomy_fails_run() {
        let state = app_state(recruiter_model());
        let mut session = Session::new();
        session
            .replace_uploads(
                Some(UploadedFile::new("jd.txt", "Data engineer")),
                Some(UploadedFile::new("framework.csv", "Name,Owner\nfoo,bar\n")),
                default_resumes(),
            )
            .unwrap();
        let session = Arc::new(parking_lot::Mutex::new(session));
        process_now(&state, &session).await;

        let s = session.lock();
        assert_eq!(s.phase(), Phase::FilesUploaded);
        assert!(s.last_error().unwrap().contains("skill column"));
    }

    #[tokio::test]
    async fn test_recompute_replaces_previous_results() {
        let state = app_state(recruiter_model());
        let session = session_with(default_resumes());
        process_now(&state, &session).await;
        let first_ids: Vec<_> = session.lock().scores().iter().map(|e| e.candidate_id).collect();

        let run_id = session.lock().begin_processing().unwrap();
        assert!(session.lock().scores().is_empty());
        run_processing(&state, &session, run_id).await;
        session.lock().finish(run_id);

        let s = session.lock();
        assert_eq!(s.scores().len(), 2);
        assert!(s.scores().iter().all(|e| !first_ids.contains(&e.candidate_id)));
    }

    #[tokio::test]
    async fn test_assessment_archive_has_one_document_per_candidate_plus_key() {
        let state = app_state(recruiter_model());
        let session = session_with(default_resumes());
        process_now(&state, &session).await;

        let plan = session.lock().begin_assessment(Some(2)).unwrap();
        let run_id = plan.run_id;
        run_assessment(&state, &session, plan).await;
        session.lock().finish(run_id);

        let s = session.lock();
        assert_eq!(s.phase(), Phase::AssessmentReady);
        let bundle = s.assessment().unwrap();
        assert_eq!(bundle.items.len(), 2);

        let archive = ZipArchive::new(Cursor::new(bundle.archive.clone())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "Alex_Tan_Assessment.docx",
                ANSWER_KEY_FILE,
                "Jane_Lim_Assessment.docx"
            ]
        );
    }

    #[tokio::test]
    async fn test_assessment_failure_keeps_scores() {
        let state = app_state(recruiter_model());
        let session = session_with(default_resumes());
        process_now(&state, &session).await;

        let broken = app_state(ScriptedModel::fixed("no questions today"));
        let plan = session.lock().begin_assessment(Some(1)).unwrap();
        let run_id = plan.run_id;
        run_assessment(&broken, &session, plan).await;
        session.lock().finish(run_id);

        let s = session.lock();
        assert_eq!(s.phase(), Phase::Scored);
        assert_eq!(s.scores().len(), 2);
        assert!(s.assessment().is_none());
        assert!(s.last_error().is_some());
    }

    #[tokio::test]
    async fn test_background_run_rejects_second_trigger_then_clears_busy() {
        let state = app_state(recruiter_model());
        let session = session_with(default_resumes());

        start_processing(&state, &session).unwrap();
        assert!(matches!(
            start_processing(&state, &session),
            Err(AppError::Conflict(_))
        ));

        tokio::time::timeout(Duration::from_secs(10), async {
            while session.lock().is_busy() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(session.lock().phase(), Phase::Scored);
    }
}
