//! Translation of repository change events into cache invalidations.
//!
//! Each cache instance gets its own listener bound to the cache's repository
//! mode. A resource change is classified as follows:
//!
//! | change                              | action                         |
//! |-------------------------------------|--------------------------------|
//! | missing resource                    | warn, nothing                  |
//! | other repository mode               | nothing                        |
//! | the sitemap schema                  | drop default properties        |
//! | resource of another type            | nothing                        |
//! | sitemap document                    | invalidate the whole snapshot  |
//!
//! The listener can be driven directly ([`InvalidationListener::handle`]) or as
//! a background task consuming a channel of [`CacheEvent`]s.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cache::SitemapStructureCache;
use crate::model::{RepositoryMode, Resource};

/// Repository notifications relevant to sitemap caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// One resource was written in `mode`.
    ResourceModified {
        mode: RepositoryMode,
        resource: Option<Resource>,
    },

    /// Several resources were written in `mode`.
    ResourcesModified {
        mode: RepositoryMode,
        resources: Vec<Resource>,
    },

    /// Offline content was published to the online repository.
    Published,

    /// Caches are to be flushed. `None` flushes both modes.
    ClearCaches { mode: Option<RepositoryMode> },
}

/// What a change did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    None,
    DefaultProperties,
    Snapshot,
}

/// Feeds change events to one [`SitemapStructureCache`].
#[derive(Debug, Clone)]
pub struct InvalidationListener {
    cache: Arc<SitemapStructureCache>,
}

impl InvalidationListener {
    pub fn new(cache: Arc<SitemapStructureCache>) -> Self {
        Self { cache }
    }

    /// Mode of the cache this listener serves.
    pub fn mode(&self) -> RepositoryMode {
        self.cache.mode()
    }

    /// Decide what a change to `resource` means for the cache, without acting.
    pub fn classify(&self, mode: RepositoryMode, resource: Option<&Resource>) -> Invalidation {
        let Some(resource) = resource else {
            return Invalidation::None;
        };
        if mode != self.mode() {
            return Invalidation::None;
        }

        let config = self.cache.config();
        if resource.root_path == config.schema_path {
            Invalidation::DefaultProperties
        } else if resource.is_type(&config.sitemap_type) {
            Invalidation::Snapshot
        } else {
            Invalidation::None
        }
    }

    /// React to a change of one resource in `mode`.
    pub fn on_resource_changed(
        &self,
        mode: RepositoryMode,
        resource: Option<&Resource>,
    ) -> Invalidation {
        if resource.is_none() {
            warn!(cache = %self.cache.name(), "Resource change event without a resource");
        }

        let action = self.classify(mode, resource);
        match action {
            Invalidation::None => {}
            Invalidation::DefaultProperties => self.cache.invalidate_default_properties(),
            Invalidation::Snapshot => {
                if let Some(resource) = resource {
                    debug!(
                        cache = %self.cache.name(),
                        resource = %resource.root_path,
                        "Sitemap changed"
                    );
                }
                self.cache.invalidate();
            }
        }
        action
    }

    /// Handle one event.
    pub fn handle(&self, event: &CacheEvent) {
        match event {
            CacheEvent::ResourceModified { mode, resource } => {
                self.on_resource_changed(*mode, resource.as_ref());
            }
            CacheEvent::ResourcesModified { mode, resources } => {
                for resource in resources {
                    self.on_resource_changed(*mode, Some(resource));
                }
            }
            CacheEvent::Published => {
                if self.mode().is_online() {
                    self.cache.invalidate();
                }
            }
            CacheEvent::ClearCaches { mode } => {
                if mode.map_or(true, |m| m == self.mode()) {
                    self.cache.invalidate();
                }
            }
        }
    }

    /// Consume events until the channel closes or `shutdown` is cancelled.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<CacheEvent>,
        shutdown: CancellationToken,
    ) {
        info!(cache = %self.cache.name(), "Sitemap invalidation listener started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!(cache = %self.cache.name(), "Sitemap invalidation listener shutting down");
                    break;
                }

                event = events.recv() => {
                    match event {
                        Some(event) => self.handle(&event),
                        None => {
                            debug!(cache = %self.cache.name(), "Event channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SitemapCacheConfig, DEFAULT_SCHEMA_PATH};
    use crate::model::{PropertyMap, StructureId};
    use crate::repository::{
        DocumentEntry, InMemoryRepository, JsonSitemapUnmarshaller, SitemapDocument,
    };

    fn listener(mode: RepositoryMode) -> (InvalidationListener, Arc<SitemapStructureCache>) {
        let repo = Arc::new(InMemoryRepository::new());
        let page = repo.add_file("/sites/a/index.html", "containerpage", Vec::new());
        let props: PropertyMap =
            [("ADE.sitemap".to_string(), "/sites/a/.sitemap".to_string())].into();
        repo.add_folder("/sites/a", props);
        let doc = SitemapDocument::new()
            .with_locale("en", vec![DocumentEntry::new(page.structure_id, "")]);
        repo.add_file("/sites/a/.sitemap", "sitemap", serde_json::to_vec(&doc).unwrap());

        let cache = Arc::new(SitemapStructureCache::new(
            SitemapCacheConfig::new(mode),
            repo,
            Arc::new(JsonSitemapUnmarshaller::new()),
        ));
        (InvalidationListener::new(cache.clone()), cache)
    }

    fn sitemap() -> Resource {
        Resource::file(StructureId::new(), "/sites/a/.sitemap", "sitemap")
    }

    fn page() -> Resource {
        Resource::file(StructureId::new(), "/sites/a/index.html", "containerpage")
    }

    fn schema() -> Resource {
        Resource::file(StructureId::new(), DEFAULT_SCHEMA_PATH, "xsd")
    }

    #[test]
    fn test_classify_decision_table() {
        let (listener, _) = listener(RepositoryMode::Offline);
        let offline = RepositoryMode::Offline;

        assert_eq!(listener.classify(offline, None), Invalidation::None);
        assert_eq!(
            listener.classify(offline, Some(&schema())),
            Invalidation::DefaultProperties
        );
        assert_eq!(listener.classify(offline, Some(&page())), Invalidation::None);
        assert_eq!(
            listener.classify(offline, Some(&sitemap())),
            Invalidation::Snapshot
        );
        assert_eq!(
            listener.classify(RepositoryMode::Online, Some(&sitemap())),
            Invalidation::None
        );
    }

    #[test]
    fn test_page_change_keeps_snapshot() {
        let (listener, cache) = listener(RepositoryMode::Offline);
        let before = cache.snapshot().unwrap();

        listener.on_resource_changed(RepositoryMode::Offline, Some(&page()));
        listener.on_resource_changed(RepositoryMode::Offline, None);

        let after = cache.cached_snapshot().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_schema_change_keeps_snapshot() {
        let (listener, cache) = listener(RepositoryMode::Offline);
        let before = cache.snapshot().unwrap();

        let action = listener.on_resource_changed(RepositoryMode::Offline, Some(&schema()));
        assert_eq!(action, Invalidation::DefaultProperties);
        assert!(Arc::ptr_eq(&before, &cache.cached_snapshot().unwrap()));
    }

    #[test]
    fn test_sitemap_change_drops_snapshot() {
        let (listener, cache) = listener(RepositoryMode::Offline);
        cache.snapshot().unwrap();

        listener.handle(&CacheEvent::ResourcesModified {
            mode: RepositoryMode::Offline,
            resources: vec![page(), sitemap()],
        });
        assert!(cache.cached_snapshot().is_none());
    }

    #[test]
    fn test_publish_only_flushes_online() {
        let (offline, offline_cache) = listener(RepositoryMode::Offline);
        let (online, online_cache) = listener(RepositoryMode::Online);
        offline_cache.snapshot().unwrap();
        online_cache.snapshot().unwrap();

        offline.handle(&CacheEvent::Published);
        online.handle(&CacheEvent::Published);

        assert!(offline_cache.cached_snapshot().is_some());
        assert!(online_cache.cached_snapshot().is_none());
    }

    #[test]
    fn test_clear_caches_by_mode() {
        let (listener, cache) = listener(RepositoryMode::Offline);
        cache.snapshot().unwrap();

        listener.handle(&CacheEvent::ClearCaches {
            mode: Some(RepositoryMode::Online),
        });
        assert!(cache.cached_snapshot().is_some());

        listener.handle(&CacheEvent::ClearCaches { mode: None });
        assert!(cache.cached_snapshot().is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (listener, cache) = listener(RepositoryMode::Offline);
        cache.snapshot().unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(listener.run(rx, shutdown.clone()));

        tx.send(CacheEvent::ResourceModified {
            mode: RepositoryMode::Offline,
            resource: Some(sitemap()),
        })
        .unwrap();
        // let the listener drain the event before shutting it down
        while cache.cached_snapshot().is_some() {
            tokio::task::yield_now().await;
        }

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_when_channel_closes() {
        let (listener, _) = listener(RepositoryMode::Online);
        let (tx, rx) = mpsc::unbounded_channel::<CacheEvent>();
        let task = tokio::spawn(listener.run(rx, CancellationToken::new()));

        drop(tx);
        task.await.unwrap();
    }
}
