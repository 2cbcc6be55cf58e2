//! Error types for the sitemap structure cache.

use thiserror::Error;

/// Errors that can occur while reading the repository or rebuilding the cache.
///
/// The error is `Clone` because a single rebuild failure is handed to every
/// caller that joined the in-flight rebuild.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SitemapError {
    /// A resource, file or identifier does not exist.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// A required property is absent or blank.
    #[error("Property '{property}' missing on {resource}")]
    PropertyMissing { resource: String, property: String },

    /// Sitemap content could not be decoded.
    #[error("Failed to unmarshal sitemap {path}: {reason}")]
    Unmarshal { path: String, reason: String },

    /// Sitemap content decoded but violates a structural rule.
    #[error("Invalid sitemap document {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    /// The backing resource of an entry could not be resolved.
    ///
    /// This aborts the whole rebuild: the structure-id index would be incomplete.
    #[error("Cannot resolve structure {structure_id} of entry {entry}: {reason}")]
    StructureResolution {
        entry: String,
        structure_id: String,
        reason: String,
    },

    /// Any other repository failure (permissions, I/O, ...).
    #[error("Repository error: {0}")]
    Repository(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The thread running a rebuild went away before publishing a result.
    #[error("Sitemap rebuild aborted before completion")]
    RebuildAborted,
}

impl SitemapError {
    /// Create a [`SitemapError::NotFound`] error.
    pub fn not_found(what: impl Into<String>) -> Self {
        SitemapError::NotFound { what: what.into() }
    }

    /// Check whether this error means the requested item is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SitemapError::NotFound { .. })
    }
}

/// Result type for sitemap cache operations.
pub type Result<T> = std::result::Result<T, SitemapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = SitemapError::not_found("/sites/default/.sitemap");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/sites/default/.sitemap"));

        let err = SitemapError::Repository("permission denied".to_string());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_structure_resolution_display() {
        let err = SitemapError::StructureResolution {
            entry: "home".to_string(),
            structure_id: "1234".to_string(),
            reason: "deleted".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("home"));
        assert!(msg.contains("1234"));
        assert!(msg.contains("deleted"));
    }
}
