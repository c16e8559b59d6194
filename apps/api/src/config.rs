use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};

/// System font locations tried when `SHEET_FONT_PATH` is not set.
pub(crate) const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
];

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed numeric values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub artifact_dir: PathBuf,
    /// TrueType face for sheet text. `None` selects the built-in bitmap font.
    pub font_path: Option<PathBuf>,
    pub max_questions: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let max_questions: u32 = parse_env_or("MAX_QUESTIONS", 200)?;
        if max_questions == 0 {
            anyhow::bail!("MAX_QUESTIONS must be at least 1");
        }

        Ok(Config {
            port: parse_env_or("PORT", 8000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            artifact_dir: std::env::var("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("generated")),
            font_path: resolve_font_path(
                std::env::var("SHEET_FONT_PATH").ok().map(PathBuf::from),
                FONT_CANDIDATES,
            ),
            max_questions,
        })
    }
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// An explicit path always wins, even if missing: the font loader reports it
/// and falls back. Otherwise the first existing candidate is used.
pub(crate) fn resolve_font_path(
    explicit: Option<PathBuf>,
    candidates: &[&str],
) -> Option<PathBuf> {
    explicit.or_else(|| {
        candidates
            .iter()
            .map(Path::new)
            .find(|p| p.is_file())
            .map(Path::to_path_buf)
    })
}
