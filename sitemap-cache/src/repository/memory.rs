//! In-memory repository and JSON sitemap decoding.
//!
//! These back the integration tests and the `sitemap-inspect` binary. The
//! in-memory repository serves the same content to both repository modes.
//!
//! # Fixture format
//!
//! ```json
//! {
//!   "site_roots": ["/sites/default"],
//!   "resources": [
//!     { "structure_id": "…", "root_path": "/sites/default", "resource_type": "folder",
//!       "folder": true, "properties": { "ADE.sitemap": "/sites/default/.sitemap" } },
//!     { "structure_id": "…", "root_path": "/sites/default/.sitemap",
//!       "resource_type": "sitemap", "content": { "locales": [ … ] } }
//!   ]
//! }
//! ```
//!
//! `content` may be a JSON value (stored re-encoded) or a string (stored as-is).

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::Deserialize;

use super::document::SitemapDocument;
use super::{ContentRepository, ResourceFilter, SitemapUnmarshaller};
use crate::error::{Result, SitemapError};
use crate::model::{
    normalize_path, PropertyMap, RepositoryFile, RepositoryMode, Resource, StructureId,
};

#[derive(Debug, Clone)]
struct StoredResource {
    resource: Resource,
    properties: PropertyMap,
    content: Vec<u8>,
}

#[derive(Debug, Default)]
struct RepositoryState {
    by_id: HashMap<StructureId, StoredResource>,
    by_path: HashMap<String, StructureId>,
    site_roots: Vec<String>,
    failing: HashSet<String>,
}

impl RepositoryState {
    fn get_by_path(&self, root_path: &str) -> Option<&StoredResource> {
        self.by_path
            .get(&normalize_path(root_path))
            .and_then(|id| self.by_id.get(id))
    }

    fn check_readable(&self, root_path: &str) -> Result<()> {
        if self.failing.contains(root_path) {
            return Err(SitemapError::Repository(format!(
                "permission denied reading {}",
                root_path
            )));
        }
        Ok(())
    }

    fn sorted_below<'a>(&'a self, root: &str) -> Vec<&'a StoredResource> {
        let root = normalize_path(root);
        let prefix = if root == "/" {
            "/".to_string()
        } else {
            format!("{}/", root)
        };
        let mut found: Vec<&StoredResource> = self
            .by_id
            .values()
            .filter(|s| s.resource.root_path == root || s.resource.root_path.starts_with(&prefix))
            .collect();
        found.sort_by(|a, b| a.resource.root_path.cmp(&b.resource.root_path));
        found
    }
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    site_roots: Vec<String>,
    #[serde(default)]
    resources: Vec<FixtureResource>,
}

#[derive(Debug, Deserialize)]
struct FixtureResource {
    #[serde(flatten)]
    resource: Resource,
    #[serde(default)]
    properties: PropertyMap,
    #[serde(default)]
    content: Option<serde_json::Value>,
}

/// Thread-safe in-memory [`ContentRepository`].
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<RepositoryState>,
}

impl InMemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a repository from a JSON fixture string.
    pub fn from_fixture_str(json: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(json).map_err(|e| SitemapError::Unmarshal {
            path: "<fixture>".to_string(),
            reason: e.to_string(),
        })?;

        let repo = Self::new();
        for site_root in fixture.site_roots {
            repo.add_site_root(site_root);
        }
        for entry in fixture.resources {
            let content = match entry.content {
                None => Vec::new(),
                Some(serde_json::Value::String(text)) => text.into_bytes(),
                Some(value) => value.to_string().into_bytes(),
            };
            repo.insert(entry.resource, entry.properties, content);
        }
        Ok(repo)
    }

    /// Load a repository from a JSON fixture file.
    pub fn from_fixture_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SitemapError::Repository(format!("cannot read fixture {}: {}", path.display(), e))
        })?;
        Self::from_fixture_str(&json)
    }

    /// Register a site root.
    pub fn add_site_root(&self, site_root: impl Into<String>) {
        self.state
            .write()
            .site_roots
            .push(normalize_path(&site_root.into()));
    }

    /// Insert or replace a resource.
    pub fn insert(&self, mut resource: Resource, properties: PropertyMap, content: Vec<u8>) {
        resource.root_path = normalize_path(&resource.root_path);
        let mut state = self.state.write();
        if let Some(previous) = state.by_id.get(&resource.structure_id) {
            let old_path = previous.resource.root_path.clone();
            state.by_path.remove(&old_path);
        }
        state
            .by_path
            .insert(resource.root_path.clone(), resource.structure_id);
        state.by_id.insert(
            resource.structure_id,
            StoredResource {
                resource,
                properties,
                content,
            },
        );
    }

    /// Add a folder and return its descriptor.
    pub fn add_folder(&self, root_path: &str, properties: PropertyMap) -> Resource {
        let resource = Resource::folder(StructureId::new(), root_path);
        self.insert(resource.clone(), properties, Vec::new());
        self.resource(root_path).unwrap_or(resource)
    }

    /// Add a file and return its descriptor.
    pub fn add_file(&self, root_path: &str, resource_type: &str, content: Vec<u8>) -> Resource {
        let resource = Resource::file(StructureId::new(), root_path, resource_type);
        self.insert(resource.clone(), PropertyMap::new(), content);
        self.resource(root_path).unwrap_or(resource)
    }

    /// Look up a resource descriptor by root path.
    pub fn resource(&self, root_path: &str) -> Option<Resource> {
        self.state
            .read()
            .get_by_path(root_path)
            .map(|s| s.resource.clone())
    }

    /// Set (or clear, with `None`) a property on the resource at `root_path`.
    pub fn set_property(&self, root_path: &str, name: &str, value: Option<&str>) -> Result<()> {
        let mut state = self.state.write();
        let id = *state
            .by_path
            .get(&normalize_path(root_path))
            .ok_or_else(|| SitemapError::not_found(root_path))?;
        let stored = state
            .by_id
            .get_mut(&id)
            .ok_or_else(|| SitemapError::not_found(root_path))?;
        match value {
            Some(value) => stored.properties.insert(name.to_string(), value.to_string()),
            None => stored.properties.remove(name),
        };
        Ok(())
    }

    /// Replace the content of the file at `root_path`.
    pub fn set_content(&self, root_path: &str, content: Vec<u8>) -> Result<()> {
        let mut state = self.state.write();
        let id = *state
            .by_path
            .get(&normalize_path(root_path))
            .ok_or_else(|| SitemapError::not_found(root_path))?;
        let stored = state
            .by_id
            .get_mut(&id)
            .ok_or_else(|| SitemapError::not_found(root_path))?;
        stored.content = content;
        Ok(())
    }

    /// Delete the resource at `root_path`.
    pub fn remove(&self, root_path: &str) -> Option<Resource> {
        let mut state = self.state.write();
        let id = state.by_path.remove(&normalize_path(root_path))?;
        state.by_id.remove(&id).map(|s| s.resource)
    }

    /// Make every read of `root_path` fail with a repository error.
    pub fn fail_reads_of(&self, root_path: &str) {
        self.state.write().failing.insert(normalize_path(root_path));
    }

    /// Number of stored resources.
    pub fn len(&self) -> usize {
        self.state.read().by_id.len()
    }

    /// Check if the repository holds no resources.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentRepository for InMemoryRepository {
    fn read_resources_with_property(
        &self,
        _mode: RepositoryMode,
        root: &str,
        property: &str,
        filter: &ResourceFilter,
    ) -> Result<Vec<Resource>> {
        let state = self.state.read();
        Ok(state
            .sorted_below(root)
            .into_iter()
            .filter(|s| filter.accepts(&s.resource))
            .filter(|s| {
                s.properties
                    .get(property)
                    .is_some_and(|v| !v.trim().is_empty())
            })
            .map(|s| s.resource.clone())
            .collect())
    }

    fn read_resources(
        &self,
        _mode: RepositoryMode,
        root: &str,
        filter: &ResourceFilter,
    ) -> Result<Vec<Resource>> {
        let state = self.state.read();
        Ok(state
            .sorted_below(root)
            .into_iter()
            .filter(|s| filter.accepts(&s.resource))
            .map(|s| s.resource.clone())
            .collect())
    }

    fn read_property(
        &self,
        _mode: RepositoryMode,
        resource: &Resource,
        property: &str,
    ) -> Result<Option<String>> {
        let state = self.state.read();
        state.check_readable(&resource.root_path)?;
        let stored = state
            .by_id
            .get(&resource.structure_id)
            .ok_or_else(|| SitemapError::not_found(&resource.root_path))?;
        Ok(stored.properties.get(property).cloned())
    }

    fn read_file(&self, _mode: RepositoryMode, root_path: &str) -> Result<RepositoryFile> {
        let state = self.state.read();
        let root_path = normalize_path(root_path);
        state.check_readable(&root_path)?;
        let stored = state
            .get_by_path(&root_path)
            .ok_or_else(|| SitemapError::not_found(&root_path))?;
        if stored.resource.folder {
            return Err(SitemapError::Repository(format!(
                "{} is a folder, not a file",
                root_path
            )));
        }
        Ok(RepositoryFile {
            resource: stored.resource.clone(),
            content: stored.content.clone(),
        })
    }

    fn read_resource(&self, _mode: RepositoryMode, id: &StructureId) -> Result<Resource> {
        let state = self.state.read();
        let stored = state
            .by_id
            .get(id)
            .ok_or_else(|| SitemapError::not_found(id.to_string()))?;
        state.check_readable(&stored.resource.root_path)?;
        Ok(stored.resource.clone())
    }

    fn site_root(&self, root_path: &str) -> Option<String> {
        let root_path = normalize_path(root_path);
        self.state
            .read()
            .site_roots
            .iter()
            .filter(|site| root_path == **site || root_path.starts_with(&format!("{}/", site)))
            .max_by_key(|site| site.len())
            .cloned()
    }
}

/// [`SitemapUnmarshaller`] that decodes documents stored as JSON.
#[derive(Debug, Default)]
pub struct JsonSitemapUnmarshaller {
    defaults: PropertyMap,
    unmarshal_calls: AtomicUsize,
}

impl JsonSitemapUnmarshaller {
    /// Create an unmarshaller with no schema defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unmarshaller whose schema defines the given default properties.
    pub fn with_defaults(defaults: PropertyMap) -> Self {
        Self {
            defaults,
            unmarshal_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `unmarshal` calls made so far.
    pub fn unmarshal_calls(&self) -> usize {
        self.unmarshal_calls.load(Ordering::SeqCst)
    }
}

impl SitemapUnmarshaller for JsonSitemapUnmarshaller {
    fn unmarshal(&self, file: &RepositoryFile) -> Result<SitemapDocument> {
        self.unmarshal_calls.fetch_add(1, Ordering::SeqCst);
        serde_json::from_slice(&file.content).map_err(|e| SitemapError::Unmarshal {
            path: file.resource.root_path.clone(),
            reason: e.to_string(),
        })
    }

    fn merge_default_properties(
        &self,
        _resource: &Resource,
        overrides: &PropertyMap,
    ) -> Result<PropertyMap> {
        let mut merged = self.defaults.clone();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(merged)
    }
}
