//! The sitemap structure cache.
//!
//! [`SitemapStructureCache`] owns the current [`CacheSnapshot`] for one
//! repository mode and serves every read from it. A missing snapshot is
//! rebuilt on demand through a [`SingleFlight`] slot, so concurrent readers
//! of an invalidated cache trigger exactly one rebuild.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sitemap_cache::{RequestContext, SitemapCacheConfig, SitemapStructureCache};
//!
//! let cache = SitemapStructureCache::new(config, repository, unmarshaller);
//! let ctx = RequestContext::new("en", "/sites/default");
//! let entry = cache.entry_by_uri(&ctx, "/about")?;
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use super::flight::{FlightRole, SingleFlight};
use super::rebuild::{rebuild_all, RebuildContext};
use super::snapshot::{CacheSnapshot, SitemapEntry};
use crate::config::SitemapCacheConfig;
use crate::error::Result;
use crate::model::{EntryId, PropertyMap, RepositoryMode, RequestContext, StructureId};
use crate::repository::{ContentRepository, ResourceFilter, SitemapUnmarshaller};

/// Counters describing cache activity.
#[derive(Debug, Default)]
pub struct CacheStats {
    rebuilds_started: AtomicU64,
    rebuilds_failed: AtomicU64,
    rebuild_joins: AtomicU64,
    invalidations: AtomicU64,
    last_rebuild_ms: AtomicU64,
}

impl CacheStats {
    fn record_role(&self, role: FlightRole) {
        if role == FlightRole::Joined {
            self.rebuild_joins.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a plain copy of the counters.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            rebuilds_started: self.rebuilds_started.load(Ordering::Relaxed),
            rebuilds_failed: self.rebuilds_failed.load(Ordering::Relaxed),
            rebuild_joins: self.rebuild_joins.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            last_rebuild_ms: self.last_rebuild_ms.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Rebuilds run by this cache.
    pub rebuilds_started: u64,
    /// Rebuilds that ended in an error.
    pub rebuilds_failed: u64,
    /// Reads that waited for a rebuild started by another caller.
    pub rebuild_joins: u64,
    /// Calls to [`SitemapStructureCache::invalidate`].
    pub invalidations: u64,
    /// Duration of the most recent rebuild.
    pub last_rebuild_ms: u64,
}

/// Lazily rebuilt, indexed view of all active sitemaps in one repository mode.
pub struct SitemapStructureCache {
    config: SitemapCacheConfig,
    repository: Arc<dyn ContentRepository>,
    unmarshaller: Arc<dyn SitemapUnmarshaller>,
    snapshot: SingleFlight<Arc<CacheSnapshot>>,
    default_properties: SingleFlight<Arc<PropertyMap>>,
    stats: CacheStats,
}

impl SitemapStructureCache {
    /// Create an empty cache. Nothing is read until the first query.
    pub fn new(
        config: SitemapCacheConfig,
        repository: Arc<dyn ContentRepository>,
        unmarshaller: Arc<dyn SitemapUnmarshaller>,
    ) -> Self {
        Self {
            config,
            repository,
            unmarshaller,
            snapshot: SingleFlight::new(),
            default_properties: SingleFlight::new(),
            stats: CacheStats::default(),
        }
    }

    /// Cache name used in logs.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Repository mode this cache reads.
    pub fn mode(&self) -> RepositoryMode {
        self.config.mode
    }

    pub fn config(&self) -> &SitemapCacheConfig {
        &self.config
    }

    /// Short description for diagnostics.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// The current snapshot, rebuilding it first if necessary.
    ///
    /// # Errors
    ///
    /// Returns the rebuild error if a rebuild was needed and failed. Every
    /// caller that waited on the same rebuild receives the same error.
    pub fn snapshot(&self) -> Result<Arc<CacheSnapshot>> {
        let (snapshot, role) = self.snapshot.get_or_build(|| self.rebuild())?;
        self.stats.record_role(role);
        Ok(snapshot)
    }

    /// The current snapshot, if one is published. Never rebuilds.
    pub fn cached_snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.snapshot.current()
    }

    /// Active sitemaps keyed by `locale + entry point root path`.
    pub fn active_sitemaps(&self, _ctx: &RequestContext) -> Result<Arc<HashMap<String, String>>> {
        Ok(Arc::clone(self.snapshot()?.active_sitemaps()))
    }

    /// Look up an entry by id.
    pub fn entry_by_id(
        &self,
        _ctx: &RequestContext,
        id: &EntryId,
    ) -> Result<Option<Arc<SitemapEntry>>> {
        Ok(self.snapshot()?.entry_by_id(id))
    }

    /// Look up an entry by site-relative (or root) URI in the context's locale.
    pub fn entry_by_uri(
        &self,
        ctx: &RequestContext,
        uri: &str,
    ) -> Result<Option<Arc<SitemapEntry>>> {
        let root_path = ctx.add_site_root(uri);
        Ok(self.snapshot()?.entry_by_uri(&ctx.locale, &root_path))
    }

    /// Entries backed by a resource, in the context's locale.
    pub fn entries_by_structure_id(
        &self,
        ctx: &RequestContext,
        id: &StructureId,
    ) -> Result<Vec<Arc<SitemapEntry>>> {
        Ok(self
            .snapshot()?
            .entries_by_structure_id(id, &ctx.locale))
    }

    /// Entries backed by the resource at `root_path`, in the context's locale.
    pub fn entries_by_root_vfs_path(
        &self,
        ctx: &RequestContext,
        root_path: &str,
    ) -> Result<Vec<Arc<SitemapEntry>>> {
        Ok(self
            .snapshot()?
            .entries_by_root_vfs_path(root_path, &ctx.locale))
    }

    /// Site roots that own at least one entry point.
    pub fn site_roots_with_sitemap(&self, _ctx: &RequestContext) -> Result<Arc<BTreeSet<String>>> {
        Ok(Arc::clone(self.snapshot()?.site_roots()))
    }

    /// Check whether any entry has this root path.
    pub fn has_path(&self, _ctx: &RequestContext, root_path: &str) -> Result<bool> {
        Ok(self.snapshot()?.has_path(root_path))
    }

    /// Schema default properties of sitemap documents.
    ///
    /// Empty when no sitemap document exists. Cached until invalidated; a
    /// failed merge is logged and yields an uncached empty map.
    pub fn default_properties(&self, _ctx: &RequestContext) -> Arc<PropertyMap> {
        match self
            .default_properties
            .get_or_build(|| self.load_default_properties())
        {
            Ok((properties, _)) => properties,
            Err(e) => {
                error!(name = %self.name(), error = %e, "Failed to read sitemap default properties");
                Arc::new(PropertyMap::new())
            }
        }
    }

    /// Discard the snapshot and the default properties.
    ///
    /// The next read rebuilds. A rebuild already running completes for its
    /// callers but is not published.
    pub fn invalidate(&self) {
        self.snapshot.invalidate();
        self.default_properties.invalidate();
        self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(name = %self.name(), "Sitemap structure cache invalidated");
    }

    /// Discard only the default properties.
    pub fn invalidate_default_properties(&self) {
        self.default_properties.invalidate();
        debug!(name = %self.name(), "Sitemap default properties invalidated");
    }

    /// Activity counters.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    fn rebuild(&self) -> Result<Arc<CacheSnapshot>> {
        self.stats.rebuilds_started.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let ctx = RebuildContext::new(
            self.repository.as_ref(),
            self.unmarshaller.as_ref(),
            &self.config,
        );
        let result = rebuild_all(&ctx);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        self.stats.last_rebuild_ms.store(elapsed_ms, Ordering::Relaxed);
        match result {
            Ok(snapshot) => Ok(Arc::new(snapshot)),
            Err(e) => {
                self.stats.rebuilds_failed.fetch_add(1, Ordering::Relaxed);
                error!(name = %self.name(), elapsed_ms, error = %e, "Sitemap rebuild failed");
                Err(e)
            }
        }
    }

    fn load_default_properties(&self) -> Result<Arc<PropertyMap>> {
        let filter = ResourceFilter::of_type(self.config.sitemap_type.clone());
        let sitemaps = self
            .repository
            .read_resources(self.mode(), "/", &filter)
            .unwrap_or_else(|e| {
                error!(name = %self.name(), error = %e, "Failed to list sitemap documents");
                Vec::new()
            });

        let Some(sitemap) = sitemaps.first() else {
            return Ok(Arc::new(PropertyMap::new()));
        };
        let properties = self
            .unmarshaller
            .merge_default_properties(sitemap, &PropertyMap::new())?;
        info!(
            name = %self.name(),
            sitemap = %sitemap.root_path,
            properties = properties.len(),
            "Loaded sitemap default properties"
        );
        Ok(Arc::new(properties))
    }
}

impl fmt::Display for SitemapStructureCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SitemapStructureCache ({})", self.config.name)
    }
}

impl fmt::Debug for SitemapStructureCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SitemapStructureCache")
            .field("name", &self.config.name)
            .field("mode", &self.config.mode)
            .field("snapshot", &self.snapshot.current().map(|s| s.summary()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SitemapError;
    use crate::model::{Locale, Resource};
    use crate::repository::{
        DocumentEntry, InMemoryRepository, JsonSitemapUnmarshaller, SitemapDocument,
    };

    struct Fixture {
        repo: Arc<InMemoryRepository>,
        unmarshaller: Arc<JsonSitemapUnmarshaller>,
        cache: SitemapStructureCache,
    }

    fn fixture_with(unmarshaller: JsonSitemapUnmarshaller) -> Fixture {
        let repo = Arc::new(InMemoryRepository::new());
        let unmarshaller = Arc::new(unmarshaller);
        let cache = SitemapStructureCache::new(
            SitemapCacheConfig::default(),
            repo.clone(),
            unmarshaller.clone(),
        );
        Fixture {
            repo,
            unmarshaller,
            cache,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(JsonSitemapUnmarshaller::new())
    }

    impl Fixture {
        fn page(&self, name: &str, path: &str) -> DocumentEntry {
            let resource = self.repo.add_file(path, "containerpage", Vec::new());
            DocumentEntry::new(resource.structure_id, name)
        }

        fn add_site(&self, folder: &str, root: DocumentEntry) -> Resource {
            let sitemap_path = format!("{}/.sitemap", folder);
            let props: PropertyMap = [("ADE.sitemap".to_string(), sitemap_path.clone())].into();
            self.repo.add_folder(folder, props);
            let doc = SitemapDocument::new().with_locale("en", vec![root]);
            self.repo.add_file(
                &sitemap_path,
                "sitemap",
                serde_json::to_vec(&doc).unwrap(),
            )
        }
    }

    fn en() -> RequestContext {
        RequestContext::root("en")
    }

    #[test]
    fn test_describe() {
        let fixture = fixture();
        assert_eq!(fixture.cache.describe(), "SitemapStructureCache (offline)");
    }

    #[test]
    fn test_lazy_rebuild_and_reuse() {
        let fixture = fixture();
        let root = fixture.page("", "/sites/a/index.html");
        fixture.add_site("/sites/a", root);

        assert!(fixture.cache.cached_snapshot().is_none());
        assert!(fixture.cache.has_path(&en(), "/sites/a").unwrap());

        let first = fixture.cache.snapshot().unwrap();
        let second = fixture.cache.snapshot().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fixture.unmarshaller.unmarshal_calls(), 1);
        assert_eq!(fixture.cache.stats().rebuilds_started, 1);
    }

    #[test]
    fn test_entry_by_uri_adds_site_root() {
        let fixture = fixture();
        let root = fixture
            .page("", "/sites/a/index.html")
            .with_child(fixture.page("about", "/sites/a/about.html"));
        fixture.add_site("/sites/a", root);

        let ctx = RequestContext::new("en", "/sites/a");
        let about = fixture.cache.entry_by_uri(&ctx, "/about").unwrap().unwrap();
        assert_eq!(about.root_path, "/sites/a/about");

        let by_id = fixture.cache.entry_by_id(&ctx, &about.id).unwrap().unwrap();
        assert!(Arc::ptr_eq(&about, &by_id));

        let de = RequestContext::new("de", "/sites/a");
        assert!(fixture.cache.entry_by_uri(&de, "/about").unwrap().is_none());
    }

    #[test]
    fn test_entries_by_structure_id_and_root_vfs_path() {
        let fixture = fixture();
        let shared = fixture.repo.add_file("/shared/page.html", "containerpage", Vec::new());
        let root = fixture
            .page("", "/sites/a/index.html")
            .with_child(DocumentEntry::new(shared.structure_id, "one"))
            .with_child(DocumentEntry::new(shared.structure_id, "two"));
        fixture.add_site("/sites/a", root);

        let by_structure = fixture
            .cache
            .entries_by_structure_id(&en(), &shared.structure_id)
            .unwrap();
        let names: Vec<_> = by_structure.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);

        let by_path = fixture
            .cache
            .entries_by_root_vfs_path(&en(), "/shared/page.html")
            .unwrap();
        assert_eq!(by_path.len(), 2);
        assert!(fixture
            .cache
            .entries_by_root_vfs_path(&RequestContext::root("de"), "/shared/page.html")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalidate_forces_rebuild() {
        let fixture = fixture();
        let root = fixture.page("", "/sites/a/index.html");
        fixture.add_site("/sites/a", root);

        let before = fixture.cache.snapshot().unwrap();
        fixture.cache.invalidate();
        assert!(fixture.cache.cached_snapshot().is_none());

        let after = fixture.cache.snapshot().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        let stats = fixture.cache.stats();
        assert_eq!(stats.rebuilds_started, 2);
        assert_eq!(stats.invalidations, 1);
    }

    #[test]
    fn test_failed_rebuild_surfaces_and_retries() {
        let fixture = fixture();
        let root = fixture
            .page("", "/sites/a/index.html")
            .with_child(fixture.page("locked", "/sites/a/locked.html"));
        fixture.add_site("/sites/a", root);
        fixture.repo.fail_reads_of("/sites/a/locked.html");

        let err = fixture.cache.active_sitemaps(&en()).unwrap_err();
        assert!(matches!(err, SitemapError::StructureResolution { .. }));
        assert!(fixture.cache.cached_snapshot().is_none());
        assert_eq!(fixture.cache.stats().rebuilds_failed, 1);

        fixture.repo.remove("/sites/a/locked.html");
        fixture.repo.add_file("/sites/a/locked.html", "containerpage", Vec::new());
        // still fails: the document references the old structure id
        assert!(fixture.cache.active_sitemaps(&en()).is_err());
        assert_eq!(fixture.cache.stats().rebuilds_started, 2);
    }

    #[test]
    fn test_default_properties_cached_until_invalidated() {
        let defaults: PropertyMap = [("template".to_string(), "main".to_string())].into();
        let fixture = fixture_with(JsonSitemapUnmarshaller::with_defaults(defaults.clone()));

        assert!(fixture.cache.default_properties(&en()).is_empty());

        let root = fixture.page("", "/sites/a/index.html");
        fixture.add_site("/sites/a", root);
        // the empty result was cached
        assert!(fixture.cache.default_properties(&en()).is_empty());

        fixture.cache.invalidate_default_properties();
        assert_eq!(*fixture.cache.default_properties(&en()), defaults);
        assert!(fixture.cache.cached_snapshot().is_none());
    }

    #[test]
    fn test_site_roots_with_sitemap() {
        let fixture = fixture();
        fixture.repo.add_site_root("/sites/a");
        let root = fixture.page("", "/sites/a/index.html");
        fixture.add_site("/sites/a", root);

        let roots = fixture.cache.site_roots_with_sitemap(&en()).unwrap();
        assert_eq!(roots.iter().collect::<Vec<_>>(), vec!["/sites/a"]);
        assert!(fixture
            .cache
            .active_sitemaps(&en())
            .unwrap()
            .contains_key(&Locale::from("en").qualify("/sites/a")));
    }
}
