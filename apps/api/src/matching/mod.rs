// Skills matching: job description → required skills, resume → candidate skills,
// and the scorer comparing the two. All LLM calls go through llm_client.

pub mod jd_matcher;
pub mod models;
pub mod prompts;
pub mod resume_processor;
pub mod scoring;
