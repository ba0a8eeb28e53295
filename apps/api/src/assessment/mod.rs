// Assessment generation: question set from job skills, rendered per candidate
// by documents::render and zipped by documents::package.

pub mod generator;
pub mod prompts;

pub use generator::{generate_assessment_with_answers, AssessmentItem};
