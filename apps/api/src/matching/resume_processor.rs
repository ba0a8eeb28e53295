//! Resume Processor: turns one resume into a `Candidate`, and runs a batch of
//! resumes through a bounded queue without letting one bad file sink the rest.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::documents::extract::extract_text_blocking;
use crate::documents::UploadedFile;
use crate::llm_client::prompts::{json_system, PROFICIENCY_SCALE, VOCABULARY_INSTRUCTION};
use crate::llm_client::{call_json, LanguageModel};
use crate::matching::jd_matcher::{canonicalise_skills, remove_duplicate_skills};
use crate::matching::models::{Candidate, MatchedSkill, ResumeFailure};
use crate::matching::prompts::{RESUME_PROMPT_TEMPLATE, RESUME_ROLE};
use crate::taxonomy::Taxonomy;

#[derive(Debug, Deserialize)]
struct ResumeExtraction {
    #[serde(default, alias = "Name", alias = "candidate_name")]
    name: String,
    #[serde(default, alias = "Qualification")]
    qualification: String,
    #[serde(default, alias = "Skills")]
    skills: Vec<MatchedSkill>,
}

/// Result of a batch run, in upload order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub candidates: Vec<Candidate>,
    pub failures: Vec<ResumeFailure>,
}

/// Extracts identity, qualification and skills from one resume.
pub async fn process_resume(
    file: &UploadedFile,
    taxonomy: &Taxonomy,
    llm: &dyn LanguageModel,
) -> Result<Candidate, ResumeFailure> {
    let fail = |reason: String| ResumeFailure {
        file_name: file.file_name.clone(),
        reason,
    };

    let text = extract_text_blocking(file.file_name.clone(), file.bytes.clone())
        .await
        .map_err(|e| fail(e.to_string()))?;

    let prompt = RESUME_PROMPT_TEMPLATE
        .replace("{vocabulary_instruction}", VOCABULARY_INSTRUCTION)
        .replace("{proficiency_scale}", PROFICIENCY_SCALE)
        .replace("{framework}", &taxonomy.prompt_listing())
        .replace("{resume_text}", &text);

    let extraction: ResumeExtraction = call_json(llm, &prompt, &json_system(RESUME_ROLE))
        .await
        .map_err(|e| fail(format!("resume analysis failed: {e}")))?;

    let name = match extraction.name.trim() {
        "" => file.stem().replace('_', " "),
        name => name.to_string(),
    };
    let qualification = match extraction.qualification.trim() {
        "" => "N/A".to_string(),
        q => q.to_string(),
    };

    Ok(Candidate {
        id: Uuid::new_v4(),
        name,
        qualification,
        source_file: file.file_name.clone(),
        skills: remove_duplicate_skills(canonicalise_skills(extraction.skills, taxonomy)),
    })
}

/// Processes resumes with at most `concurrency` in flight. `on_progress` is
/// called after each file finishes with `(completed, total, file_name)`.
pub async fn process_resumes<F>(
    files: Vec<UploadedFile>,
    taxonomy: Arc<Taxonomy>,
    llm: Arc<dyn LanguageModel>,
    concurrency: usize,
    mut on_progress: F,
) -> BatchOutcome
where
    F: FnMut(usize, usize, &str),
{
    let total = files.len();
    let names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, file) in files.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let taxonomy = Arc::clone(&taxonomy);
        let llm = Arc::clone(&llm);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let outcome = process_resume(&file, &taxonomy, llm.as_ref()).await;
            (index, outcome)
        });
    }

    let mut slots: Vec<Option<Result<Candidate, ResumeFailure>>> =
        (0..total).map(|_| None).collect();
    let mut completed = 0;

    while let Some(joined) = tasks.join_next().await {
        completed += 1;
        match joined {
            Ok((index, outcome)) => {
                match &outcome {
                    Ok(c) => info!(
                        "Processed resume {}/{}: '{}' → {} ({} skills)",
                        completed,
                        total,
                        names[index],
                        c.name,
                        c.skills.len()
                    ),
                    Err(f) => warn!("Resume '{}' failed: {}", f.file_name, f.reason),
                }
                on_progress(completed, total, &names[index]);
                slots[index] = Some(outcome);
            }
            Err(e) => error!("Resume task aborted: {e}"),
        }
    }

    let mut batch = BatchOutcome::default();
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(Ok(candidate)) => batch.candidates.push(candidate),
            Some(Err(failure)) => batch.failures.push(failure),
            None => batch.failures.push(ResumeFailure {
                file_name: names[index].clone(),
                reason: "processing aborted unexpectedly".to_string(),
            }),
        }
    }
    batch
}
