//! Candidate Scoring: pluggable, trait-based scorer that measures each candidate's
//! extracted skills against the job's required skills.
//!
//! Default: `ProficiencyScorer` (pure-Rust, deterministic, fully testable).
//!
//! `AppState` holds an `Arc<dyn CandidateScorer>`, chosen at startup.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::models::{Candidate, MatchedSkill, ProficiencyLevel};
use crate::taxonomy::skill_key;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

/// One candidate's overall match percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub score: f64, // 0 – 100
}

/// How a candidate covers a single required skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCoverage {
    pub skill: String,
    pub required_level: ProficiencyLevel,
    pub candidate_level: Option<ProficiencyLevel>,
    pub credit: f64, // 0.0 – 1.0
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The scorer trait. Implement this to swap scoring backends without touching
/// the orchestrator or handlers.
#[async_trait]
pub trait CandidateScorer: Send + Sync {
    /// Returns one entry per candidate, ranked best first.
    async fn score(
        &self,
        candidates: &[Candidate],
        job_skills: &[MatchedSkill],
    ) -> Result<Vec<ScoreEntry>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// ProficiencyScorer (default implementation)
// ────────────────────────────────────────────────────────────────────────────

/// Level-ratio scorer.
///
/// Algorithm:
/// 1. For each required skill at level r, look up the candidate's level c (0 if absent)
/// 2. credit = min(c, r) / r, so meeting or exceeding the requirement earns full credit
/// 3. score = mean(credit) × 100, rounded to 2 decimals
///
/// Monotonic in the candidate's levels; all requirements met → 100, none → 0.
pub struct ProficiencyScorer;

#[async_trait]
impl CandidateScorer for ProficiencyScorer {
    async fn score(
        &self,
        candidates: &[Candidate],
        job_skills: &[MatchedSkill],
    ) -> Result<Vec<ScoreEntry>, AppError> {
        Ok(score_all_candidates(candidates, job_skills))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core scoring algorithm
// ────────────────────────────────────────────────────────────────────────────

/// Per-skill breakdown for one candidate, in job-skill order.
pub fn skill_coverage(
    candidate_skills: &[MatchedSkill],
    job_skills: &[MatchedSkill],
) -> Vec<SkillCoverage> {
    let mut attained: HashMap<String, ProficiencyLevel> = HashMap::new();
    for s in candidate_skills {
        attained
            .entry(skill_key(&s.skill))
            .and_modify(|l| *l = (*l).max(s.proficiency_level))
            .or_insert(s.proficiency_level);
    }

    job_skills
        .iter()
        .map(|required| {
            let candidate_level = attained.get(&skill_key(&required.skill)).copied();
            let r = f64::from(required.proficiency_level.get());
            let c = candidate_level.map(|l| f64::from(l.get())).unwrap_or(0.0);
            SkillCoverage {
                skill: required.skill.clone(),
                required_level: required.proficiency_level,
                candidate_level,
                credit: (c.min(r) / r).clamp(0.0, 1.0),
            }
        })
        .collect()
}

/// Percentage of the job's requirements a candidate covers.
/// An empty requirement set scores 0.
pub fn score_candidate(candidate_skills: &[MatchedSkill], job_skills: &[MatchedSkill]) -> f64 {
    if job_skills.is_empty() {
        return 0.0;
    }
    let coverage = skill_coverage(candidate_skills, job_skills);
    let mean = coverage.iter().map(|c| c.credit).sum::<f64>() / coverage.len() as f64;
    (mean * 10_000.0).round() / 100.0
}

/// Scores every candidate and ranks them: score desc, then name, then id.
pub fn score_all_candidates(candidates: &[Candidate], job_skills: &[MatchedSkill]) -> Vec<ScoreEntry> {
    let mut entries: Vec<ScoreEntry> = candidates
        .iter()
        .map(|c| ScoreEntry {
            candidate_id: c.id,
            candidate_name: c.name.clone(),
            score: score_candidate(&c.skills, job_skills),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.candidate_name.cmp(&b.candidate_name))
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
    entries
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
