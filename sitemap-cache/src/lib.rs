//! Sitemap structure cache.
//!
//! An in-memory, queryable index of the sitemaps stored in a content
//! repository. The cache rebuilds lazily on first read, walks every entry point's
//! root sitemap (following sub-sitemap references and inheriting properties
//! down the tree) and serves lookups by entry id, URI, structure id and
//! resource path until a repository change invalidates it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sitemap_cache::repository::{InMemoryRepository, JsonSitemapUnmarshaller};
//! use sitemap_cache::{RequestContext, SitemapCacheConfig, SitemapStructureCache};
//!
//! let repo = Arc::new(InMemoryRepository::from_fixture_file(path)?);
//! let cache = SitemapStructureCache::new(
//!     SitemapCacheConfig::default(),
//!     repo,
//!     Arc::new(JsonSitemapUnmarshaller::new()),
//! );
//!
//! let ctx = RequestContext::new("en", "/sites/default");
//! let active = cache.active_sitemaps(&ctx)?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod repository;
pub mod structure;

pub use config::{LoggingConfig, SitemapCacheConfig};
pub use error::{Result, SitemapError};
pub use model::{EntryId, Locale, PropertyMap, RepositoryMode, RequestContext, Resource, StructureId};
pub use structure::{
    CacheEvent, CacheSnapshot, CacheStatsSnapshot, InvalidationListener, SitemapEntry,
    SitemapStructureCache,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
