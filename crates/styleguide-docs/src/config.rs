use std::path::{Path, PathBuf};

use crate::error::AppError;

const DEFAULT_CONTENT_DIR: &str = "src/content/docs";
const DEFAULT_LOCALE: &str = "en";
const DEFAULT_LOCALES: &str = "fr";

/// Where the corpus lives and how its paths map to locales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLayout {
    /// Directory holding `<topic>/` and `<locale>/<topic>/` trees.
    pub root: PathBuf,
    /// Locale of documents that carry no locale prefix.
    pub default_locale: String,
    /// Locale prefixes recognised as the first path component.
    pub locales: Vec<String>,
}

impl ContentLayout {
    pub fn new(root: impl Into<PathBuf>, default_locale: &str, locales: &[&str]) -> Self {
        Self {
            root: root.into(),
            default_locale: default_locale.to_string(),
            locales: locales.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// `en` at the root, `fr` under `fr/`.
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_locale: DEFAULT_LOCALE.to_string(),
            locales: parse_locale_list(DEFAULT_LOCALES),
        }
    }

    /// Every locale, default first.
    pub fn all_locales(&self) -> Vec<String> {
        std::iter::once(self.default_locale.clone())
            .chain(self.locales.iter().cloned())
            .collect()
    }

    pub fn is_locale_prefix(&self, component: &str) -> bool {
        self.locales.iter().any(|l| l == component)
    }

    /// Reads `DOCS_CONTENT_DIR`, `DOCS_DEFAULT_LOCALE` and `DOCS_LOCALES`
    /// around an already-known repository path.
    pub fn from_env_with_repo(repo_path: &Path) -> Result<Self, AppError> {
        let content_dir =
            std::env::var("DOCS_CONTENT_DIR").unwrap_or_else(|_| DEFAULT_CONTENT_DIR.to_string());
        let default_locale =
            std::env::var("DOCS_DEFAULT_LOCALE").unwrap_or_else(|_| DEFAULT_LOCALE.to_string());
        let locales = std::env::var("DOCS_LOCALES").unwrap_or_else(|_| DEFAULT_LOCALES.to_string());

        Ok(Self {
            root: resolve_content_root(repo_path, &content_dir)?,
            default_locale,
            locales: parse_locale_list(&locales),
        })
    }
}

/// Full server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL. `None` disables caching.
    pub redis_url: Option<String>,
    pub lancedb_path: String,
    pub layout: ContentLayout,
}

impl Config {
    /// Required:
    /// - `LANCEDB_PATH`
    /// - `DOCS_REPO_PATH` (docs repository checkout, or the content root itself)
    ///
    /// Optional:
    /// - `REDIS_URL`
    /// - `DOCS_CONTENT_DIR` (default: "src/content/docs")
    /// - `DOCS_DEFAULT_LOCALE` (default: "en")
    /// - `DOCS_LOCALES` (default: "fr", comma-separated)
    pub fn from_env() -> Result<Self, AppError> {
        let lancedb_path = std::env::var("LANCEDB_PATH").map_err(|_| {
            AppError::Config("LANCEDB_PATH environment variable is required".to_string())
        })?;

        Ok(Self {
            redis_url: std::env::var("REDIS_URL").ok(),
            lancedb_path,
            layout: layout_from_env(None)?,
        })
    }
}

/// Layout for commands that only read the corpus. `root_override` wins over
/// `DOCS_REPO_PATH`.
pub fn layout_from_env(root_override: Option<&Path>) -> Result<ContentLayout, AppError> {
    let repo_path = match root_override {
        Some(path) => path.to_path_buf(),
        None => std::env::var("DOCS_REPO_PATH").map(PathBuf::from).map_err(|_| {
            AppError::Config("DOCS_REPO_PATH environment variable is required".to_string())
        })?,
    };
    ContentLayout::from_env_with_repo(&repo_path)
}

/// `<repo>/<content_dir>` when it exists, otherwise `<repo>` itself so the
/// variable may point straight at the content root.
fn resolve_content_root(repo_path: &Path, content_dir: &str) -> Result<PathBuf, AppError> {
    let nested = repo_path.join(content_dir);
    if nested.is_dir() {
        return Ok(nested);
    }
    if repo_path.is_dir() {
        return Ok(repo_path.to_path_buf());
    }
    Err(AppError::Config(format!(
        "content root not found: {} (also checked {})",
        repo_path.display(),
        nested.display()
    )))
}

fn parse_locale_list(raw: &str) -> Vec<String> {
    let mut locales: Vec<String> = Vec::new();
    for locale in raw.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        if !locales.iter().any(|l| l == locale) {
            locales.push(locale.to_string());
        }
    }
    locales
}
