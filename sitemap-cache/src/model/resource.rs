//! Repository resource descriptors and request context.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::{Locale, StructureId};
use crate::error::SitemapError;

/// Property name to value mapping.
///
/// Ordered so that snapshots and diagnostics render deterministically.
pub type PropertyMap = BTreeMap<String, String>;

/// Repository mode a cache instance is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryMode {
    /// Published content.
    Online,
    /// Work-in-progress content.
    Offline,
}

impl RepositoryMode {
    /// Check if this is the published mode.
    pub fn is_online(&self) -> bool {
        matches!(self, RepositoryMode::Online)
    }
}

impl fmt::Display for RepositoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryMode::Online => write!(f, "online"),
            RepositoryMode::Offline => write!(f, "offline"),
        }
    }
}

impl FromStr for RepositoryMode {
    type Err = SitemapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "online" => Ok(RepositoryMode::Online),
            "offline" => Ok(RepositoryMode::Offline),
            other => Err(SitemapError::Config(format!(
                "unknown repository mode '{}' (expected 'online' or 'offline')",
                other
            ))),
        }
    }
}

/// Descriptor of a repository resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Repository identifier.
    pub structure_id: StructureId,

    /// Absolute path including the site root (e.g. `/sites/default/index.html`).
    pub root_path: String,

    /// Resource type name (e.g. `folder`, `sitemap`, `containerpage`).
    pub resource_type: String,

    /// Whether the resource is a folder.
    #[serde(default)]
    pub folder: bool,
}

impl Resource {
    /// Create a file resource of the given type.
    pub fn file(
        structure_id: StructureId,
        root_path: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            structure_id,
            root_path: root_path.into(),
            resource_type: resource_type.into(),
            folder: false,
        }
    }

    /// Create a folder resource.
    pub fn folder(structure_id: StructureId, root_path: impl Into<String>) -> Self {
        Self {
            structure_id,
            root_path: root_path.into(),
            resource_type: "folder".to_string(),
            folder: true,
        }
    }

    /// Check whether the resource has the given type name.
    pub fn is_type(&self, type_name: &str) -> bool {
        self.resource_type == type_name
    }
}

/// A loaded file: its descriptor plus raw content.
#[derive(Debug, Clone)]
pub struct RepositoryFile {
    pub resource: Resource,
    pub content: Vec<u8>,
}

/// Per-request view used by the read API.
///
/// The locale selects which localized sitemap is queried and the site root is
/// prepended to site-relative URIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub locale: Locale,
    pub site_root: String,
}

impl RequestContext {
    /// Create a context for a locale within a site.
    pub fn new(locale: impl Into<Locale>, site_root: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            site_root: site_root.into(),
        }
    }

    /// Create a context that addresses root paths directly (empty site root).
    pub fn root(locale: impl Into<Locale>) -> Self {
        Self::new(locale, "")
    }

    /// Turn a site-relative URI into a root path.
    pub fn add_site_root(&self, uri: &str) -> String {
        let uri = normalize_path(uri);
        let site_root = self.site_root.trim_end_matches('/');
        if site_root.is_empty() || uri.starts_with(&format!("{}/", site_root)) || uri == site_root
        {
            uri
        } else {
            format!("{}{}", site_root, uri)
        }
    }
}

/// Normalize a repository path: leading slash, no trailing slash (except `/`).
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Append a child name to a parent root path.
///
/// An empty name yields the parent path itself.
pub fn join_path(parent: &str, name: &str) -> String {
    let name = name.trim_matches('/');
    let parent = normalize_path(parent);
    if name.is_empty() {
        parent
    } else if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_mode_parse() {
        assert_eq!("Online".parse::<RepositoryMode>().unwrap(), RepositoryMode::Online);
        assert_eq!(" offline ".parse::<RepositoryMode>().unwrap(), RepositoryMode::Offline);
        assert!("staging".parse::<RepositoryMode>().is_err());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/site/a/"), "/site/a");
        assert_eq!(normalize_path("site/a"), "/site/a");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/site/a", "foo"), "/site/a/foo");
        assert_eq!(join_path("/site/a/", "/foo/"), "/site/a/foo");
        assert_eq!(join_path("/site/a", ""), "/site/a");
        assert_eq!(join_path("/", "foo"), "/foo");
    }

    #[test]
    fn test_add_site_root() {
        let ctx = RequestContext::new("en", "/sites/default");
        assert_eq!(ctx.add_site_root("/about/"), "/sites/default/about");
        assert_eq!(ctx.add_site_root("/sites/default/about"), "/sites/default/about");

        let root = RequestContext::root("en");
        assert_eq!(root.add_site_root("/site/a/foo"), "/site/a/foo");
    }
}
