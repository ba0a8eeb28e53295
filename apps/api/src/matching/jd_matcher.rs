//! Job-Skill Matcher: maps a job description onto the taxonomy with required levels.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::{json_system, PROFICIENCY_SCALE, VOCABULARY_INSTRUCTION};
use crate::llm_client::{call_json, LanguageModel};
use crate::matching::models::MatchedSkill;
use crate::matching::prompts::{JD_MATCH_PROMPT_TEMPLATE, JD_MATCH_ROLE};
use crate::taxonomy::{skill_key, Taxonomy};

/// Models sometimes wrap the array in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SkillListResponse {
    List(Vec<MatchedSkill>),
    Wrapped {
        #[serde(alias = "Skills", alias = "matched_skills")]
        skills: Vec<MatchedSkill>,
    },
}

impl SkillListResponse {
    fn into_skills(self) -> Vec<MatchedSkill> {
        match self {
            SkillListResponse::List(skills) | SkillListResponse::Wrapped { skills } => skills,
        }
    }
}

/// Extracts the job's required skills. Fails loudly on model errors,
/// malformed output, or an empty result.
pub async fn match_job_skills(
    jd_text: &str,
    taxonomy: &Taxonomy,
    llm: &dyn LanguageModel,
) -> Result<Vec<MatchedSkill>, AppError> {
    if jd_text.trim().is_empty() {
        return Err(AppError::Validation(
            "job description contains no text".to_string(),
        ));
    }

    let prompt = JD_MATCH_PROMPT_TEMPLATE
        .replace("{vocabulary_instruction}", VOCABULARY_INSTRUCTION)
        .replace("{proficiency_scale}", PROFICIENCY_SCALE)
        .replace("{framework}", &taxonomy.prompt_listing())
        .replace("{jd_text}", jd_text);

    let response: SkillListResponse = call_json(llm, &prompt, &json_system(JD_MATCH_ROLE))
        .await
        .map_err(|e| AppError::Llm(format!("Job skill matching failed: {e}")))?;

    let raw = response.into_skills();
    let raw_count = raw.len();
    let skills = remove_duplicate_skills(canonicalise_skills(raw, taxonomy));

    if skills.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "no framework skills could be matched to the job description".to_string(),
        ));
    }

    info!(
        "Matched {} job skills ({} returned by model)",
        skills.len(),
        raw_count
    );
    Ok(skills)
}

/// Rewrites skill names to their canonical taxonomy spelling and drops
/// anything outside the vocabulary.
pub fn canonicalise_skills(skills: Vec<MatchedSkill>, taxonomy: &Taxonomy) -> Vec<MatchedSkill> {
    skills
        .into_iter()
        .filter_map(|mut s| match taxonomy.canonical_name(&s.skill) {
            Some(name) => {
                s.skill = name.to_string();
                Some(s)
            }
            None => {
                warn!("Dropping skill '{}' not present in taxonomy", s.skill);
                None
            }
        })
        .collect()
}

/// Collapses repeated skill names: the highest level wins and distinct
/// explanations are joined. Output keeps first-occurrence order.
pub fn remove_duplicate_skills(skills: Vec<MatchedSkill>) -> Vec<MatchedSkill> {
    let mut merged: Vec<MatchedSkill> = Vec::with_capacity(skills.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for skill in skills {
        let key = skill_key(&skill.skill);
        match positions.get(&key) {
            Some(&i) => {
                let existing = &mut merged[i];
                existing.proficiency_level =
                    existing.proficiency_level.max(skill.proficiency_level);
                let explanation = skill.explanation.trim();
                if !explanation.is_empty()
                    && !existing.explanation.split(" | ").any(|e| e == explanation)
                {
                    if existing.explanation.is_empty() {
                        existing.explanation = explanation.to_string();
                    } else {
                        existing.explanation.push_str(" | ");
                        existing.explanation.push_str(explanation);
                    }
                }
            }
            None => {
                positions.insert(key, merged.len());
                merged.push(skill);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;
    use crate::llm_client::testing::ScriptedModel;
    use crate::llm_client::LlmError;
    use crate::matching::models::ProficiencyLevel;
    use crate::taxonomy::SkillRecord;

    const JD_TEXT: &str = r#"
        Data Engineer — Government Technology Agency
        You will design and operate batch and streaming data pipelines on cloud platforms.
        Requirements: strong data engineering, working knowledge of cloud computing.
    "#;

    fn taxonomy() -> Taxonomy {
        let record = |skill: &str| SkillRecord {
            sector: "ICT".to_string(),
            track: "Data".to_string(),
            skill: skill.to_string(),
            description: None,
            descriptors: BTreeMap::new(),
        };
        Taxonomy::from_records(vec![
            record("Data Engineering"),
            record("Cloud Computing"),
            record("Software Testing"),
        ])
    }

    fn skill(name: &str, level: u8, explanation: &str) -> MatchedSkill {
        MatchedSkill {
            skill: name.to_string(),
            proficiency_level: ProficiencyLevel::new(level).unwrap(),
            explanation: explanation.to_string(),
        }
    }

    #[test]
    fn test_duplicates_keep_max_level_and_join_explanations() {
        let merged = remove_duplicate_skills(vec![
            skill("Data Engineering", 3, "Pipelines"),
            skill("Cloud Computing", 2, "AWS"),
            skill("data engineering", 5, "Streaming"),
            skill("Data Engineering", 4, "Pipelines"),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].skill, "Data Engineering");
        assert_eq!(merged[0].proficiency_level.get(), 5);
        assert_eq!(merged[0].explanation, "Pipelines | Streaming");
        assert_eq!(merged[1].skill, "Cloud Computing");
    }

    #[test]
    fn test_dedup_output_has_unique_keys() {
        let input: Vec<MatchedSkill> = (0..20)
            .map(|i| skill(["A", "b", " a ", "B", "c"][i % 5], (i % 6 + 1) as u8, ""))
            .collect();
        let merged = remove_duplicate_skills(input);
        let keys: HashSet<String> = merged.iter().map(|s| skill_key(&s.skill)).collect();
        assert_eq!(keys.len(), merged.len());
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_canonicalise_drops_unknown_and_fixes_case() {
        let skills = canonicalise_skills(
            vec![skill("cloud computing", 3, ""), skill("Underwater Welding", 6, "")],
            &taxonomy(),
        );
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].skill, "Cloud Computing");
    }

    #[tokio::test]
    async fn test_match_job_skills_parses_and_dedups() {
        let model = ScriptedModel::fixed(
            r#"[
                {"skill": "Data Engineering", "proficiency_level": 3, "explanation": "design pipelines"},
                {"skill": "Cloud Computing", "proficiency_level": "Level 2", "explanation": "cloud platforms"},
                {"skill": "data engineering", "proficiency_level": 4, "explanation": "streaming"}
            ]"#,
        );
        let skills = match_job_skills(JD_TEXT, &taxonomy(), &model).await.unwrap();

        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0].proficiency_level.get(), 4);
        assert_eq!(skills[1].proficiency_level.get(), 2);
    }

    #[tokio::test]
    async fn test_match_job_skills_accepts_wrapped_object() {
        let model = ScriptedModel::fixed(
            r#"{"skills": [{"Skill": "Software Testing", "Proficiency Level": 2, "Explanation": "QA"}]}"#,
        );
        let skills = match_job_skills(JD_TEXT, &taxonomy(), &model).await.unwrap();
        assert_eq!(skills[0].skill, "Software Testing");
    }

    #[tokio::test]
    async fn test_prompt_carries_framework_and_jd() {
        let model = ScriptedModel::new(|prompt| {
            assert!(prompt.contains("- Data Engineering (ICT / Data)"));
            assert!(prompt.contains("streaming data pipelines"));
            Ok(r#"[{"skill": "Data Engineering", "proficiency_level": 3}]"#.to_string())
        });
        match_job_skills(JD_TEXT, &taxonomy(), &model).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_output_fails_visibly() {
        let model = ScriptedModel::fixed("Here are the skills: Data Engineering (3)");
        let result = match_job_skills(JD_TEXT, &taxonomy(), &model).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }

    #[tokio::test]
    async fn test_model_failure_fails_visibly() {
        let model = ScriptedModel::new(|_| {
            Err(LlmError::Api {
                status: 500,
                message: "overloaded".to_string(),
            })
        });
        let result = match_job_skills(JD_TEXT, &taxonomy(), &model).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }

    #[tokio::test]
    async fn test_empty_match_is_not_silently_accepted() {
        let model = ScriptedModel::fixed(r#"[{"skill": "Astrophysics", "proficiency_level": 3}]"#);
        let result = match_job_skills(JD_TEXT, &taxonomy(), &model).await;
        assert!(matches!(result, Err(AppError::UnprocessableEntity(_))));
    }

    #[tokio::test]
    async fn test_blank_jd_rejected_without_model_call() {
        let model = ScriptedModel::fixed("[]");
        let result = match_job_skills("   ", &taxonomy(), &model).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(model.calls(), 0);
    }
}
