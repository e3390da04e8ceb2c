use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("missing field `{field}`: selector `{selector}` matched nothing")]
    MissingField {
        field: &'static str,
        selector: String,
    },

    #[error("could not parse `{field}` from {text:?}: {reason}")]
    Parse {
        field: &'static str,
        text: String,
        reason: String,
    },

    #[error("failed to write {}: {source}", .path.display())]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("webdriver error: {0}")]
    Driver(String),

    #[error("no listing elements matched `{0}`")]
    NoListings(String),

    #[error("record has no column named `{0}`")]
    UnknownColumn(String),

    #[error("category `{category}` exceeded its {}s deadline", .deadline.as_secs())]
    DeadlineExceeded { category: String, deadline: Duration },

    #[error("unknown category `{0}`")]
    UnknownCategory(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Errors scoped to one listing element, eligible for skip-and-continue.
    pub fn is_element_level(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::Parse { .. })
    }

    /// Errors worth another attempt after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. } | Self::Driver(_) | Self::NoListings(_)
        )
    }

    pub(crate) fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoWrite {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for ScrapeError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
