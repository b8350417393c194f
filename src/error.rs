use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single listing page or article. Never fatal to a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("unexpected listing response on page {page}: {reason}")]
    MalformedListing { page: u32, reason: String },

    #[error("article body not found in {url}")]
    MissingBody { url: String },
}

impl FetchError {
    pub fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// The cache directory could not be established. This one aborts the run.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to create cache directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template {} not found", path.display())]
    MissingTemplate { path: PathBuf },

    #[error("template {} is empty", path.display())]
    EmptyTemplate { path: PathBuf },

    #[error("failed to read template {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no author given (pass --author or set NOTE_AUTHOR)")]
    MissingAuthor,

    #[error("cannot derive an author id from {0:?}")]
    InvalidAuthor(String),

    #[error(transparent)]
    Load(#[from] config::ConfigError),
}
