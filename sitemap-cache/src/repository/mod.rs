//! Boundary to the content repository and the sitemap document model.
//!
//! The cache never touches storage directly. It reads entry points, properties
//! and files through [`ContentRepository`] and turns file content into
//! [`SitemapDocument`]s through [`SitemapUnmarshaller`]. Both are traits so the
//! rebuild can be driven by a real repository or by the in-memory
//! implementations in [`memory`].
//!
//! # Example
//!
//! ```ignore
//! use sitemap_cache::repository::{InMemoryRepository, JsonSitemapUnmarshaller};
//!
//! let repo = InMemoryRepository::from_fixture_file("fixtures/site.json")?;
//! let unmarshaller = JsonSitemapUnmarshaller::new();
//! ```

mod document;
pub mod memory;

pub use document::{DocumentEntry, LocalizedSitemap, SitemapDocument};
pub use memory::{InMemoryRepository, JsonSitemapUnmarshaller};

use crate::error::Result;
use crate::model::{PropertyMap, RepositoryFile, RepositoryMode, Resource, StructureId};

/// Filter applied to repository listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    /// Only return folders.
    pub require_folder: bool,

    /// Only return resources of this type.
    pub resource_type: Option<String>,

    /// Include resources outside their release/expiration window.
    pub ignore_expiration: bool,
}

impl ResourceFilter {
    /// Folders only, regardless of expiration (entry point lookup).
    pub fn entry_point_folders() -> Self {
        Self {
            require_folder: true,
            resource_type: None,
            ignore_expiration: true,
        }
    }

    /// Resources of the given type.
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            require_folder: false,
            resource_type: Some(type_name.into()),
            ignore_expiration: false,
        }
    }

    /// Check whether a resource passes this filter.
    pub fn accepts(&self, resource: &Resource) -> bool {
        if self.require_folder && !resource.folder {
            return false;
        }
        match &self.resource_type {
            Some(type_name) => resource.is_type(type_name),
            None => true,
        }
    }
}

/// Read access to the versioned content repository.
///
/// Every call names the repository mode it reads from; a cache instance always
/// passes its own mode. Implementations report absent items with
/// [`SitemapError::NotFound`](crate::SitemapError::NotFound).
pub trait ContentRepository: Send + Sync {
    /// List resources below `root` that carry `property`, in repository order.
    fn read_resources_with_property(
        &self,
        mode: RepositoryMode,
        root: &str,
        property: &str,
        filter: &ResourceFilter,
    ) -> Result<Vec<Resource>>;

    /// List resources below `root` accepted by `filter`, in repository order.
    fn read_resources(
        &self,
        mode: RepositoryMode,
        root: &str,
        filter: &ResourceFilter,
    ) -> Result<Vec<Resource>>;

    /// Read the value of a property set directly on `resource`.
    fn read_property(
        &self,
        mode: RepositoryMode,
        resource: &Resource,
        property: &str,
    ) -> Result<Option<String>>;

    /// Read a file (descriptor plus content) by root path.
    fn read_file(&self, mode: RepositoryMode, root_path: &str) -> Result<RepositoryFile>;

    /// Read a resource descriptor by identifier.
    fn read_resource(&self, mode: RepositoryMode, id: &StructureId) -> Result<Resource>;

    /// Resolve the site root owning a root path, if any site does.
    fn site_root(&self, root_path: &str) -> Option<String>;
}

/// Decoding of sitemap content and schema defaults.
pub trait SitemapUnmarshaller: Send + Sync {
    /// Decode a sitemap file into a document.
    fn unmarshal(&self, file: &RepositoryFile) -> Result<SitemapDocument>;

    /// Merge the schema's default property values for `resource` with `overrides`.
    fn merge_default_properties(
        &self,
        resource: &Resource,
        overrides: &PropertyMap,
    ) -> Result<PropertyMap>;
}
