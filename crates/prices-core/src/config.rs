//! Repository paths and runtime settings.
//!
//! The pipeline runs from scripts, tests, and CI without hardcoded paths: the
//! repository root is found by walking upward from the working directory until
//! a marker file is found, and every output directory is derived from it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{DataError, Result};

/// Files or directories whose presence marks the repository root.
pub const REPO_MARKERS: &[&str] = &["pyproject.toml", ".git", "setup.cfg"];

/// Environment variable holding the EIA API key.
pub const EIA_API_KEY_VAR: &str = "EIA_API_KEY";

/// Default timeout for a single EIA request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum rows per EIA v2 JSON response.
pub const DEFAULT_PAGE_SIZE: usize = 5000;

/// Standard directory layout derived from the repository root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Canonical repository root.
    pub repo_root: PathBuf,
    /// Raw downloads (`data/raw`).
    pub data_raw: PathBuf,
    /// Intermediate tables (`data/interim`).
    pub data_interim: PathBuf,
    /// Data-quality reports (`reports/qa`).
    pub reports_qa: PathBuf,
    /// Exploratory profiling reports (`reports/eda`).
    pub reports_eda: PathBuf,
}

impl ProjectPaths {
    /// Derives the standard layout from a repository root.
    #[must_use]
    pub fn from_repo_root(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        Self {
            data_raw: repo_root.join("data").join("raw"),
            data_interim: repo_root.join("data").join("interim"),
            reports_qa: repo_root.join("reports").join("qa"),
            reports_eda: repo_root.join("reports").join("eda"),
            repo_root,
        }
    }

    /// Creates every derived directory. Safe to call repeatedly.
    ///
    /// # Errors
    /// Returns [`DataError::Io`] if a directory cannot be created.
    pub fn ensure_dirs(self) -> Result<Self> {
        for dir in [
            &self.data_raw,
            &self.data_interim,
            &self.reports_qa,
            &self.reports_eda,
        ] {
            std::fs::create_dir_all(dir)
                .map_err(|e| DataError::Io(format!("{}: {e}", dir.display())))?;
        }
        Ok(self)
    }
}

/// Walks upward from `start` (or the working directory) until a directory
/// containing one of [`REPO_MARKERS`] is found.
///
/// # Errors
/// Returns [`DataError::Config`] if no ancestor carries a marker, or
/// [`DataError::Io`] if the start directory cannot be resolved.
pub fn find_repo_root(start: Option<&Path>) -> Result<PathBuf> {
    find_repo_root_with_markers(start, REPO_MARKERS)
}

/// Same walk as [`find_repo_root`] with a caller-supplied marker list.
///
/// # Errors
/// See [`find_repo_root`].
pub fn find_repo_root_with_markers(start: Option<&Path>, markers: &[&str]) -> Result<PathBuf> {
    let start = match start {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().map_err(|e| DataError::Io(e.to_string()))?,
    };
    let start = std::fs::canonicalize(&start)
        .map_err(|e| DataError::Io(format!("{}: {e}", start.display())))?;

    for candidate in start.ancestors() {
        if markers.iter().any(|m| candidate.join(m).exists()) {
            debug!(root = %candidate.display(), "Found repository root");
            return Ok(candidate.to_path_buf());
        }
    }

    Err(DataError::Config(format!(
        "Could not locate repo root. Expected one of: {} while searching from: {}",
        markers.join(", "),
        start.display()
    )))
}

/// Resolves the repository root and derives [`ProjectPaths`] from it,
/// optionally creating the directories.
///
/// # Errors
/// Propagates errors from [`find_repo_root`] and [`ProjectPaths::ensure_dirs`].
pub fn get_paths(start: Option<&Path>, create_dirs: bool) -> Result<ProjectPaths> {
    let paths = ProjectPaths::from_repo_root(find_repo_root(start)?);
    if create_dirs { paths.ensure_dirs() } else { Ok(paths) }
}

/// Runtime settings for talking to the EIA API.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// EIA API key, never empty.
    pub eia_api_key: String,
    /// Per-request timeout.
    pub eia_timeout: Duration,
    /// Rows requested per page.
    pub eia_page_size: usize,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("eia_api_key", &"[REDACTED]")
            .field("eia_timeout", &self.eia_timeout)
            .field("eia_page_size", &self.eia_page_size)
            .finish()
    }
}

impl Settings {
    /// Builds settings from a raw key value, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns [`DataError::Config`] if the key is absent or blank.
    pub fn from_api_key(raw: Option<String>) -> Result<Self> {
        let key = raw.as_deref().map(str::trim).unwrap_or_default();
        if key.is_empty() {
            return Err(DataError::Config(format!(
                "Missing {EIA_API_KEY_VAR} environment variable. \
                 Set it in your shell or create a .env file in the repo root with:\n\
                 {EIA_API_KEY_VAR}=your_key"
            )));
        }
        Ok(Self {
            eia_api_key: key.to_string(),
            eia_timeout: DEFAULT_TIMEOUT,
            eia_page_size: DEFAULT_PAGE_SIZE,
        })
    }
}

/// Loads the nearest `.env` file without overriding variables already set.
///
/// A missing file is not an error; an unreadable one is logged and skipped.
fn try_load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env overrides"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Ignoring unreadable .env file"),
    }
}

/// Reads [`Settings`] from the process environment, optionally loading a
/// local `.env` first.
///
/// # Errors
/// Returns [`DataError::Config`] if `EIA_API_KEY` is unset or blank.
pub fn load_settings(load_dotenv: bool) -> Result<Settings> {
    if load_dotenv {
        try_load_dotenv();
    }
    Settings::from_api_key(std::env::var(EIA_API_KEY_VAR).ok())
}
