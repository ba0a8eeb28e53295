// All LLM prompt constants for the Matching module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Role statement for job description matching.
pub const JD_MATCH_ROLE: &str = "You are an expert recruiter and skills-framework analyst. \
    You map job descriptions onto a controlled skills framework.";

/// Job-skill matching prompt template.
/// Replace: {vocabulary_instruction}, {proficiency_scale}, {framework}, {jd_text}
pub const JD_MATCH_PROMPT_TEMPLATE: &str = r#"{vocabulary_instruction}

{proficiency_scale}

Identify every skill from the SKILLS FRAMEWORK that the job below requires, and the
proficiency level a successful hire needs for each.

Return a JSON ARRAY with this EXACT schema (no extra fields):
[
  {
    "skill": "Exact skill name from the framework",
    "proficiency_level": 3,
    "explanation": "One or two sentences citing the job description"
  }
]

Rules:
1. `skill` MUST be copied verbatim from the framework list
2. `proficiency_level` is an integer 1-6
3. List each skill once; pick the single most fitting level
4. Base every explanation on the job description text only

SKILLS FRAMEWORK:
{framework}

JOB DESCRIPTION:
{jd_text}"#;

/// Role statement for resume extraction.
pub const RESUME_ROLE: &str = "You are an expert recruiter assessing a candidate's resume \
    against a controlled skills framework.";

/// Resume extraction prompt template.
/// Replace: {vocabulary_instruction}, {proficiency_scale}, {framework}, {resume_text}
pub const RESUME_PROMPT_TEMPLATE: &str = r#"{vocabulary_instruction}

{proficiency_scale}

Read the resume below. Extract the candidate's full name, their highest or most relevant
qualification, and every framework skill the resume gives evidence for, with the level
the evidence supports.

Return a JSON OBJECT with this EXACT schema (no extra fields):
{
  "name": "Candidate full name",
  "qualification": "e.g. Bachelor of Computing (Information Systems), NUS",
  "skills": [
    {
      "skill": "Exact skill name from the framework",
      "proficiency_level": 4,
      "explanation": "Evidence from the resume"
    }
  ]
}

Rules:
1. `skill` MUST be copied verbatim from the framework list
2. `proficiency_level` is an integer 1-6, justified by concrete resume evidence
3. Do NOT credit skills the resume does not demonstrate
4. Use an empty string for `name` or `qualification` if the resume does not state them

SKILLS FRAMEWORK:
{framework}

RESUME:
{resume_text}"#;
