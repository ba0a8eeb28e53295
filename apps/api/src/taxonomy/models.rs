use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Max characters of a single level descriptor carried into prompts.
const DESCRIPTOR_PROMPT_CHARS: usize = 200;

/// One canonical skill from the framework spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub sector: String,
    pub track: String,
    pub skill: String,
    pub description: Option<String>,
    /// Proficiency descriptors keyed by level (1–6).
    pub descriptors: BTreeMap<u8, String>,
}

/// Normalised lookup key for a skill name: trimmed, lowercased, inner
/// whitespace collapsed. Skill names are compared through this key only.
pub fn skill_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The loaded, de-duplicated skills vocabulary.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    records: Vec<SkillRecord>,
    index: HashMap<String, usize>,
    duplicates_dropped: usize,
}

impl Taxonomy {
    /// Builds a taxonomy, keeping the first record for each skill key.
    pub fn from_records(records: Vec<SkillRecord>) -> Self {
        let mut kept = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        let mut duplicates_dropped = 0;

        for record in records {
            let key = skill_key(&record.skill);
            if key.is_empty() {
                continue;
            }
            if index.contains_key(&key) {
                debug!("Dropping duplicate taxonomy skill '{}'", record.skill);
                duplicates_dropped += 1;
                continue;
            }
            index.insert(key, kept.len());
            kept.push(record);
        }

        Self {
            records: kept,
            index,
            duplicates_dropped,
        }
    }

    pub fn records(&self) -> &[SkillRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn get(&self, name: &str) -> Option<&SkillRecord> {
        self.index.get(&skill_key(name)).map(|&i| &self.records[i])
    }

    /// Maps any spelling of a known skill to its canonical name.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.get(name).map(|r| r.skill.as_str())
    }

    /// Renders the vocabulary as the SKILLS FRAMEWORK block used in prompts.
    pub fn prompt_listing(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str("- ");
            out.push_str(&record.skill);
            let scope: Vec<&str> = [record.sector.as_str(), record.track.as_str()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();
            if !scope.is_empty() {
                out.push_str(&format!(" ({})", scope.join(" / ")));
            }
            out.push('\n');
            for (level, text) in &record.descriptors {
                let text: String = text.chars().take(DESCRIPTOR_PROMPT_CHARS).collect();
                out.push_str(&format!("    Level {level}: {text}\n"));
            }
        }
        out
    }
}
