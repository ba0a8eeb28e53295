pub mod health;
pub mod pages;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/auth/login", post(handlers::handle_login))
        // Session pipeline
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/files",
            post(handlers::handle_upload_files).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/sessions/:id/process", post(handlers::handle_process))
        .route("/api/v1/sessions/:id/job-skills", get(handlers::handle_job_skills))
        .route("/api/v1/sessions/:id/candidates", get(handlers::handle_candidates))
        .route(
            "/api/v1/sessions/:id/assessments",
            post(handlers::handle_generate_assessments),
        )
        .route(
            "/api/v1/sessions/:id/assessments/download",
            get(handlers::handle_download_assessments),
        )
        // Informational pages
        .route("/api/v1/sessions/:id/pages", get(pages::handle_list_pages))
        .route("/api/v1/sessions/:id/pages/:slug", get(pages::handle_get_page))
        .route(
            "/api/v1/sessions/:id/samples/:file_name",
            get(pages::handle_download_sample),
        )
        .with_state(state)
}
