// Skill Taxonomy: the controlled skills vocabulary every match is pinned to.

pub mod loader;
pub mod models;

use thiserror::Error;

pub use loader::{is_supported_file, load_taxonomy};
pub use models::{skill_key, SkillRecord, Taxonomy};

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("unsupported taxonomy file '{0}' (expected .xlsx, .xls, .ods or .csv)")]
    UnsupportedFormat(String),

    #[error("could not read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("could not read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet has no worksheets")]
    NoWorksheet,

    #[error("no skill column found in the first rows of the taxonomy")]
    MissingSkillColumn,

    #[error("taxonomy contains no skills")]
    Empty,
}
