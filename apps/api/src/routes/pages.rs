//! Informational pages and sample file downloads.
//!
//! Home describes the pipeline; the pipeline itself lives under the session API.
//! Every page is scoped to a session, so nothing here is reachable before login.

use std::io::ErrorKind;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageLink {
    pub slug: &'static str,
    pub title: &'static str,
}

pub const PAGES: &[PageLink] = &[
    PageLink { slug: "home", title: "Home" },
    PageLink { slug: "sample-files", title: "Sample Files" },
    PageLink { slug: "about", title: "About" },
    PageLink { slug: "methodology", title: "Methodology" },
];

#[derive(Debug, Serialize)]
pub struct SampleFile {
    pub file_name: String,
    pub size_bytes: u64,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct Page {
    pub slug: &'static str,
    pub title: &'static str,
    pub sections: &'static [Section],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_files: Option<Vec<SampleFile>>,
}

#[derive(Debug, Serialize)]
pub struct Section {
    pub heading: &'static str,
    pub body: &'static str,
}

const HOME: &[Section] = &[
    Section {
        heading: "Important notice",
        body: "This service is a proof of concept. Generated scores and assessments can be \
               wrong and must not be the sole basis for a hiring decision.",
    },
    Section {
        heading: "Step 1: Upload files",
        body: "Upload a job description (.docx, .pdf or .txt), a skills framework \
               (.xlsx, .xls, .ods or .csv) and one or more resumes (.docx, .pdf or .txt).",
    },
    Section {
        heading: "Step 2: Process candidates",
        body: "Processing maps the job description onto the framework, extracts each \
               candidate's skills and ranks every candidate by match percentage. Run it again \
               to recompute from scratch.",
    },
    Section {
        heading: "Step 3: Review the top candidates",
        body: "Choose how many of the best-ranked candidates to review. Each one lists \
               their qualification, extracted skills and coverage of every required skill.",
    },
    Section {
        heading: "Step 4: Generate assessments",
        body: "Generate a skills assessment for the selected candidates and download \
               Assessments.zip: one document per candidate plus an answer key.",
    },
];

const ABOUT: &[Section] = &[
    Section {
        heading: "What it does",
        body: "Skillmatch helps recruiters shortlist candidates by matching the skills a job \
               requires against the skills evidenced in each resume, using a shared skills \
               framework as the vocabulary.",
    },
    Section {
        heading: "Who it is for",
        body: "Hiring teams screening many resumes for one role who want a consistent, \
               explainable first pass and a ready-made written assessment.",
    },
];

const METHODOLOGY: &[Section] = &[
    Section {
        heading: "Skills framework",
        body: "The uploaded framework is the controlled vocabulary. Skills are read by column \
               header, duplicates are dropped and every match is pinned to a framework skill.",
    },
    Section {
        heading: "Proficiency levels",
        body: "Job requirements and candidate evidence are both expressed on a 1 to 6 \
               proficiency scale.",
    },
    Section {
        heading: "Scoring",
        body: "For each required skill a candidate earns min(candidate level, required level) \
               divided by the required level. The score is the mean over all required skills, \
               as a percentage. Missing skills earn nothing; exceeding a requirement earns no \
               extra credit.",
    },
    Section {
        heading: "Assessments",
        body: "One question and model answer is written per required skill, pitched at the \
               required level. Every selected candidate receives the same questions.",
    },
];

/// GET /api/v1/sessions/:id/pages
pub async fn handle_list_pages(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<&'static [PageLink]>, AppError> {
    state.sessions.get(session_id)?;
    Ok(Json(PAGES))
}

/// GET /api/v1/sessions/:id/pages/:slug
pub async fn handle_get_page(
    State(state): State<AppState>,
    Path((session_id, slug)): Path<(Uuid, String)>,
) -> Result<Json<Page>, AppError> {
    state.sessions.get(session_id)?;
    let link = PAGES
        .iter()
        .find(|p| p.slug == slug)
        .ok_or_else(|| AppError::NotFound(format!("Page '{slug}' not found")))?;

    let (sections, sample_files): (&'static [Section], _) = match link.slug {
        "home" => (HOME, None),
        "about" => (ABOUT, None),
        "methodology" => (METHODOLOGY, None),
        _ => (&[], Some(list_sample_files(&state, session_id).await?)),
    };

    Ok(Json(Page {
        slug: link.slug,
        title: link.title,
        sections,
        sample_files,
    }))
}

/// GET /api/v1/sessions/:id/samples/:file_name
pub async fn handle_download_sample(
    State(state): State<AppState>,
    Path((session_id, file_name)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.get(session_id)?;
    if !is_plain_file_name(&file_name) {
        return Err(AppError::Validation(format!(
            "'{file_name}' is not a valid sample file name"
        )));
    }

    let path = state.config.sample_files_dir.join(&file_name);
    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::NotFound(format!("Sample file '{file_name}' not found")),
        _ => AppError::Internal(e.into()),
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type(&file_name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    ))
}

async fn list_sample_files(state: &AppState, session_id: Uuid) -> Result<Vec<SampleFile>, AppError> {
    let dir = &state.config.sample_files_dir;
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Sample files directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(AppError::Internal(e.into())),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::Internal(e.into()))?
    {
        let metadata = entry
            .metadata()
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !metadata.is_file() || !is_plain_file_name(&file_name) {
            continue;
        }
        files.push(SampleFile {
            download_url: format!("/api/v1/sessions/{session_id}/samples/{file_name}"),
            size_bytes: metadata.len(),
            file_name,
        });
    }
    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(files)
}

/// Rejects anything that could escape the samples directory, and dotfiles.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(|c: char| c == '/' || c == '\\')
        && !name.contains("..")
}

fn content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "txt" => "text/plain; charset=utf-8",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file_names_only() {
        assert!(is_plain_file_name("Sample_JD.docx"));
        assert!(!is_plain_file_name("../secrets.env"));
        assert!(!is_plain_file_name("dir/file.pdf"));
        assert!(!is_plain_file_name("dir\\file.pdf"));
        assert!(!is_plain_file_name(".env"));
        assert!(!is_plain_file_name(""));
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type("a.PDF"), "application/pdf");
        assert_eq!(content_type("framework.csv"), "text/csv");
        assert_eq!(content_type("README"), "application/octet-stream");
    }
}
