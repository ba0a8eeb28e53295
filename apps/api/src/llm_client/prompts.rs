// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction that pins model output to the loaded taxonomy.
pub const VOCABULARY_INSTRUCTION: &str = "\
    CRITICAL: Only use skill names that appear VERBATIM in the SKILLS FRAMEWORK list below. \
    Do NOT invent, rename, abbreviate or merge skills. \
    If nothing in the framework fits a requirement, leave it out.";

/// Proficiency scale shared by job and resume extraction.
pub const PROFICIENCY_SCALE: &str = "\
    Proficiency levels are integers from 1 (basic awareness) to 6 (recognised authority). \
    Use the framework's level descriptors when they are provided.";

/// Builds a system prompt from a role statement plus the JSON-only rules.
pub fn json_system(role: &str) -> String {
    format!("{role} {JSON_ONLY_SYSTEM}")
}
