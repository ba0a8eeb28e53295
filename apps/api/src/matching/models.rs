use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 6;

static LEVEL_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("level digits regex is valid"));

/// Ordinal rating of skill depth (1–6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProficiencyLevel(u8);

impl ProficiencyLevel {
    pub fn new(level: u8) -> Option<Self> {
        (MIN_LEVEL..=MAX_LEVEL)
            .contains(&level)
            .then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts `3`, `3.0`, `"3"` and `"Level 3"`; models are not consistent.
impl<'de> Deserialize<'de> for ProficiencyLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Float(f64),
            Text(String),
        }

        let level = match Raw::deserialize(deserializer)? {
            Raw::Int(n) => u8::try_from(n).ok(),
            Raw::Float(f) if f.fract() == 0.0 && f >= 0.0 => u8::try_from(f as u64).ok(),
            Raw::Float(_) => None,
            Raw::Text(s) => LEVEL_DIGITS
                .find(&s)
                .and_then(|m| m.as_str().parse::<u8>().ok()),
        };

        level
            .and_then(ProficiencyLevel::new)
            .ok_or_else(|| de::Error::custom(format!("proficiency level must be {MIN_LEVEL}-{MAX_LEVEL}")))
    }
}

/// A taxonomy skill annotated with an assigned level and a justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSkill {
    #[serde(alias = "Skill", alias = "skill_name")]
    pub skill: String,
    #[serde(alias = "Proficiency Level", alias = "level")]
    pub proficiency_level: ProficiencyLevel,
    #[serde(default, alias = "Explanation", alias = "justification")]
    pub explanation: String,
}

/// One processed resume. Keyed by `id`; `name` is display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub qualification: String,
    pub source_file: String,
    pub skills: Vec<MatchedSkill>,
}

/// A resume that could not be turned into a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeFailure {
    pub file_name: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_accepts_number_and_text_forms() {
        for raw in ["3", "3.0", "\"3\"", "\"Level 3\"", "\"level-3 (applies)\""] {
            let level: ProficiencyLevel = serde_json::from_str(raw).unwrap();
            assert_eq!(level.get(), 3, "input {raw}");
        }
    }

    #[test]
    fn test_level_out_of_range_rejected() {
        for raw in ["0", "7", "\"Level 9\"", "\"expert\"", "2.5", "-1"] {
            assert!(
                serde_json::from_str::<ProficiencyLevel>(raw).is_err(),
                "input {raw} should fail"
            );
        }
    }

    #[test]
    fn test_matched_skill_accepts_title_case_keys() {
        let json = r#"{"Skill": "Data Engineering", "Proficiency Level": "4", "Explanation": "Built ETL"}"#;
        let skill: MatchedSkill = serde_json::from_str(json).unwrap();
        assert_eq!(skill.skill, "Data Engineering");
        assert_eq!(skill.proficiency_level.get(), 4);
        assert_eq!(skill.explanation, "Built ETL");
    }

    #[test]
    fn test_matched_skill_explanation_optional() {
        let json = r#"{"skill": "Testing", "proficiency_level": 2}"#;
        let skill: MatchedSkill = serde_json::from_str(json).unwrap();
        assert!(skill.explanation.is_empty());
    }

    #[test]
    fn test_level_serializes_as_plain_number() {
        let level = ProficiencyLevel::new(5).unwrap();
        assert_eq!(serde_json::to_string(&level).unwrap(), "5");
    }
}
