use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Shared password gating session creation.
    pub app_password: String,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    /// Width of the resume processing queue. 1 = strictly sequential.
    pub resume_concurrency: usize,
    /// Caps how many job skills get an assessment question. None = all.
    pub assessment_max_skills: Option<usize>,
    pub session_ttl_minutes: i64,
    pub sample_files_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            app_password: require_env("APP_PASSWORD")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
            resume_concurrency: parse_env("RESUME_CONCURRENCY", 1usize)?.max(1),
            assessment_max_skills: parse_skill_cap(
                std::env::var("ASSESSMENT_MAX_SKILLS").ok().as_deref(),
            )?,
            session_ttl_minutes: parse_env("SESSION_TTL_MINUTES", 120)?,
            sample_files_dir: std::env::var("SAMPLE_FILES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("sample_files")),
        })
    }

    /// Configuration used by unit and router tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            anthropic_api_key: "test-key".to_string(),
            app_password: "letmein".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            max_upload_bytes: 1024 * 1024,
            resume_concurrency: 2,
            assessment_max_skills: None,
            session_ttl_minutes: 60,
            sample_files_dir: PathBuf::from("sample_files"),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// `ASSESSMENT_MAX_SKILLS`: unset means no cap; otherwise at least 1.
fn parse_skill_cap(raw: Option<&str>) -> Result<Option<usize>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let cap = raw
        .trim()
        .parse::<usize>()
        .with_context(|| format!("ASSESSMENT_MAX_SKILLS must be a positive integer, got '{raw}'"))?;
    if cap == 0 {
        bail!("ASSESSMENT_MAX_SKILLS must be a positive integer, got '0'");
    }
    Ok(Some(cap))
}
