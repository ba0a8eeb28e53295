/// Role statement for assessment authoring.
pub const ASSESSMENT_ROLE: &str = "You are an experienced hiring manager who writes \
    practical, skills-based interview assessments.";

/// Assessment generation prompt template.
/// Replace: {skills_json}
pub const ASSESSMENT_PROMPT_TEMPLATE: &str = r#"Write one assessment question for EACH skill below, pitched at the
required proficiency level (1 = basic awareness, 6 = recognised authority), together with
a model answer an interviewer can mark against.

SKILLS (with required level and why the role needs it):
{skills_json}

Return a JSON ARRAY with this EXACT schema (no extra fields):
[
  {
    "skill": "Exact skill name from the list above",
    "question": "A scenario-based question the candidate answers in writing",
    "answer": "The key points a strong answer covers"
  }
]

Rules:
1. Exactly one object per listed skill, `skill` copied verbatim
2. Questions test applied ability at the required level, not definitions
3. Answers are concise marking guides, not essays"#;
