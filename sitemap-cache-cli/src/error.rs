//! CLI error types.

use std::fmt;

use sitemap_cache::SitemapError;

/// Errors reported by `sitemap-inspect`.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config(String),

    /// The repository fixture could not be loaded.
    Fixture(SitemapError),

    /// A cache query failed.
    Query(SitemapError),

    /// A command-line argument is malformed.
    InvalidArgument(String),

    /// Logging could not be initialized.
    Logging(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Fixture(e) => write!(f, "Failed to load repository fixture: {}", e),
            CliError::Query(e) => write!(f, "Query failed: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Logging(msg) => write!(f, "Failed to initialize logging: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Fixture(e) | CliError::Query(e) => Some(e),
            CliError::Config(_) | CliError::InvalidArgument(_) | CliError::Logging(_) => None,
        }
    }
}

impl From<SitemapError> for CliError {
    fn from(e: SitemapError) -> Self {
        match e {
            SitemapError::Config(msg) => CliError::Config(msg),
            other => CliError::Query(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CliError::InvalidArgument("bad id".to_string());
        assert_eq!(err.to_string(), "Invalid argument: bad id");
    }

    #[test]
    fn test_from_sitemap_error() {
        let err: CliError = SitemapError::Config("unknown mode".to_string()).into();
        assert!(matches!(err, CliError::Config(_)));

        let err: CliError = SitemapError::RebuildAborted.into();
        assert!(matches!(err, CliError::Query(SitemapError::RebuildAborted)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
