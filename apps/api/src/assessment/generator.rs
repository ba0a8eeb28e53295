//! Assessment Generator: one question and model answer per job skill.
//!
//! The same question set is shared by every selected candidate; only the
//! document header is personalised (see documents::render).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::assessment::prompts::{ASSESSMENT_PROMPT_TEMPLATE, ASSESSMENT_ROLE};
use crate::errors::AppError;
use crate::llm_client::prompts::json_system;
use crate::llm_client::{call_json, LanguageModel};
use crate::matching::models::MatchedSkill;
use crate::taxonomy::skill_key;

/// One question with its model answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentItem {
    #[serde(alias = "Skill")]
    pub skill: String,
    #[serde(alias = "Question")]
    pub question: String,
    #[serde(alias = "Answer", alias = "model_answer")]
    pub answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AssessmentResponse {
    List(Vec<AssessmentItem>),
    Wrapped {
        #[serde(alias = "questions", alias = "assessment")]
        items: Vec<AssessmentItem>,
    },
}

/// Picks the skills to assess: all of them, or the `max` with the highest
/// required level (job order breaks ties).
pub fn select_assessed_skills(job_skills: &[MatchedSkill], max: Option<usize>) -> Vec<&MatchedSkill> {
    let mut selected: Vec<&MatchedSkill> = job_skills.iter().collect();
    if let Some(max) = max {
        selected.sort_by(|a, b| b.proficiency_level.cmp(&a.proficiency_level));
        selected.truncate(max);
        let chosen: HashSet<String> = selected.iter().map(|s| skill_key(&s.skill)).collect();
        selected = job_skills
            .iter()
            .filter(|s| chosen.contains(&skill_key(&s.skill)))
            .collect();
    }
    selected
}

/// Generates the shared question set for the job's skills.
pub async fn generate_assessment_with_answers(
    job_skills: &[MatchedSkill],
    max_skills: Option<usize>,
    llm: &dyn LanguageModel,
) -> Result<Vec<AssessmentItem>, AppError> {
    let selected = select_assessed_skills(job_skills, max_skills);
    if selected.is_empty() {
        return Err(AppError::Validation(
            "no job skills available to build an assessment".to_string(),
        ));
    }

    let skills_json: Vec<_> = selected
        .iter()
        .map(|s| {
            json!({
                "skill": s.skill,
                "required_level": s.proficiency_level,
                "context": s.explanation,
            })
        })
        .collect();
    let skills_json = serde_json::to_string_pretty(&skills_json)
        .map_err(|e| AppError::Internal(e.into()))?;
    let prompt = ASSESSMENT_PROMPT_TEMPLATE.replace("{skills_json}", &skills_json);

    let response: AssessmentResponse = call_json(llm, &prompt, &json_system(ASSESSMENT_ROLE))
        .await
        .map_err(|e| AppError::Llm(format!("Assessment generation failed: {e}")))?;
    let raw = match response {
        AssessmentResponse::List(items) | AssessmentResponse::Wrapped { items } => items,
    };

    let items = align_items(raw, &selected);
    if items.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "the model returned no usable assessment questions".to_string(),
        ));
    }
    if items.len() < selected.len() {
        warn!(
            "Assessment covers {} of {} selected skills",
            items.len(),
            selected.len()
        );
    }

    info!("Generated {} assessment questions", items.len());
    Ok(items)
}

/// Keeps one non-empty item per selected skill, in skill order, with the
/// skill's canonical spelling.
fn align_items(raw: Vec<AssessmentItem>, selected: &[&MatchedSkill]) -> Vec<AssessmentItem> {
    let mut by_key: HashMap<String, AssessmentItem> = HashMap::new();
    for item in raw {
        if item.question.trim().is_empty() {
            continue;
        }
        by_key.entry(skill_key(&item.skill)).or_insert(item);
    }

    selected
        .iter()
        .filter_map(|s| {
            by_key.remove(&skill_key(&s.skill)).map(|mut item| {
                item.skill = s.skill.clone();
                item
            })
        })
        .collect()
}
