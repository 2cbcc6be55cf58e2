//! Indexed sitemap snapshot.
//!
//! A rebuild fills an [`IndexBuilder`]: entries live in one arena and every
//! index maps its key to arena slots. [`IndexBuilder::finish`] freezes the
//! arena into shared [`SitemapEntry`] handles and produces a [`CacheSnapshot`]
//! that is never mutated afterwards.
//!
//! ```text
//!   entries: [ e0, e1, e2, ... ]          (arena, slot = position)
//!        ^      ^    ^
//!        |      |    +-- by_id[e2.id]
//!        |      +------- by_uri["en/sites/a/foo"]
//!        +-------------- by_structure_id[(sid, en)] = [0, 5]
//!                        by_root_vfs_path[("/sites/a/index.html", en)] = [0]
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::model::{EntryId, Locale, PropertyMap, StructureId};

/// A sitemap entry as resolved by a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    /// Unique entry identifier.
    pub id: EntryId,

    /// Resource the entry renders.
    pub structure_id: StructureId,

    /// Path segment below the parent. Always empty for root entries.
    pub name: String,

    /// Root path of the entry (entry point path plus the names on the way down).
    pub root_path: String,

    /// Locale of the sitemap the entry was read from.
    pub locale: Locale,

    /// Properties set on the entry itself.
    pub properties: PropertyMap,

    /// Own properties overlaid on everything inherited from ancestors.
    pub effective_properties: PropertyMap,

    /// Root path of the governing entry point.
    pub entry_point: String,

    /// 0-based index among siblings, in document order.
    pub position: usize,

    /// Whether this is the root entry of a root sitemap.
    pub is_root_entry: bool,

    /// Root path of the backing resource.
    pub resource_path: String,

    /// Ids of child entries, in document order.
    pub sub_entries: Vec<EntryId>,
}

/// Arena slot of an entry during a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntrySlot(usize);

/// Counts describing a snapshot, for logs and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub entries: usize,
    pub uris: usize,
    pub paths: usize,
    pub active_sitemaps: usize,
    pub site_roots: usize,
}

impl std::fmt::Display for SnapshotSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} entries, {} uris, {} paths, {} active sitemaps, {} site roots",
            self.entries, self.uris, self.paths, self.active_sitemaps, self.site_roots
        )
    }
}

/// Accumulates entries and indices during one rebuild pass.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    entries: Vec<SitemapEntry>,
    by_id: HashMap<EntryId, usize>,
    by_uri: HashMap<String, usize>,
    by_structure_id: HashMap<(StructureId, Locale), Vec<usize>>,
    by_root_vfs_path: HashMap<(String, Locale), Vec<usize>>,
    path_set: HashSet<String>,
    active_sitemaps: HashMap<String, String>,
    site_roots: BTreeSet<String>,
}

impl IndexBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to the arena and register it by id, by URI and in the path set.
    pub fn register_entry(&mut self, entry: SitemapEntry) -> EntrySlot {
        let slot = self.entries.len();
        self.by_id.insert(entry.id, slot);
        self.by_uri
            .insert(entry.locale.qualify(&entry.root_path), slot);
        self.path_set.insert(entry.root_path.clone());
        self.entries.push(entry);
        EntrySlot(slot)
    }

    /// Register an entry under its backing resource's id and root path.
    pub fn index_resource(&mut self, slot: EntrySlot, resource_path: &str) {
        let Some(entry) = self.entries.get_mut(slot.0) else {
            return;
        };
        entry.resource_path = resource_path.to_string();
        let locale = entry.locale.clone();
        self.by_structure_id
            .entry((entry.structure_id, locale.clone()))
            .or_default()
            .push(slot.0);
        self.by_root_vfs_path
            .entry((resource_path.to_string(), locale))
            .or_default()
            .push(slot.0);
    }

    /// Record the child ids of an entry once they have been visited.
    pub fn set_sub_entries(&mut self, slot: EntrySlot, children: Vec<EntryId>) {
        if let Some(entry) = self.entries.get_mut(slot.0) {
            entry.sub_entries = children;
        }
    }

    /// Record the sitemap governing `locale` below `entry_point`.
    pub fn record_active_sitemap(&mut self, locale: &Locale, entry_point: &str, sitemap: &str) {
        self.active_sitemaps
            .insert(locale.qualify(entry_point), sitemap.to_string());
    }

    /// Record a site root that owns at least one entry point.
    pub fn add_site_root(&mut self, site_root: impl Into<String>) {
        self.site_roots.insert(site_root.into());
    }

    /// Number of entries registered so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no entries have been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the builder into an immutable snapshot.
    pub fn finish(self) -> CacheSnapshot {
        CacheSnapshot {
            entries: self.entries.into_iter().map(Arc::new).collect(),
            by_id: self.by_id,
            by_uri: self.by_uri,
            by_structure_id: self.by_structure_id,
            by_root_vfs_path: self.by_root_vfs_path,
            path_set: self.path_set,
            active_sitemaps: Arc::new(self.active_sitemaps),
            site_roots: Arc::new(self.site_roots),
        }
    }
}

/// One complete set of indices produced by a single rebuild.
///
/// Immutable once built; readers share it through an `Arc`.
#[derive(Debug, Default)]
pub struct CacheSnapshot {
    entries: Vec<Arc<SitemapEntry>>,
    by_id: HashMap<EntryId, usize>,
    by_uri: HashMap<String, usize>,
    by_structure_id: HashMap<(StructureId, Locale), Vec<usize>>,
    by_root_vfs_path: HashMap<(String, Locale), Vec<usize>>,
    path_set: HashSet<String>,
    active_sitemaps: Arc<HashMap<String, String>>,
    site_roots: Arc<BTreeSet<String>>,
}

impl CacheSnapshot {
    /// Look up an entry by id.
    pub fn entry_by_id(&self, id: &EntryId) -> Option<Arc<SitemapEntry>> {
        self.by_id.get(id).map(|&slot| Arc::clone(&self.entries[slot]))
    }

    /// Look up an entry by locale and root path.
    pub fn entry_by_uri(&self, locale: &Locale, root_path: &str) -> Option<Arc<SitemapEntry>> {
        self.by_uri
            .get(&locale.qualify(root_path))
            .map(|&slot| Arc::clone(&self.entries[slot]))
    }

    /// All entries backed by a resource, for one locale, in visiting order.
    pub fn entries_by_structure_id(
        &self,
        id: &StructureId,
        locale: &Locale,
    ) -> Vec<Arc<SitemapEntry>> {
        self.collect(self.by_structure_id.get(&(*id, locale.clone())))
    }

    /// All entries backed by the resource at `root_path`, for one locale.
    pub fn entries_by_root_vfs_path(
        &self,
        root_path: &str,
        locale: &Locale,
    ) -> Vec<Arc<SitemapEntry>> {
        self.collect(
            self.by_root_vfs_path
                .get(&(root_path.to_string(), locale.clone())),
        )
    }

    /// Check whether any entry, in any locale, has this root path.
    pub fn has_path(&self, root_path: &str) -> bool {
        self.path_set.contains(root_path)
    }

    /// Active sitemaps keyed by `locale + entry point root path`.
    pub fn active_sitemaps(&self) -> &Arc<HashMap<String, String>> {
        &self.active_sitemaps
    }

    /// Site roots owning at least one entry point.
    pub fn site_roots(&self) -> &Arc<BTreeSet<String>> {
        &self.site_roots
    }

    /// All entries in visiting order.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<SitemapEntry>> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index sizes.
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            entries: self.by_id.len(),
            uris: self.by_uri.len(),
            paths: self.path_set.len(),
            active_sitemaps: self.active_sitemaps.len(),
            site_roots: self.site_roots.len(),
        }
    }

    fn collect(&self, slots: Option<&Vec<usize>>) -> Vec<Arc<SitemapEntry>> {
        slots
            .map(|slots| {
                slots
                    .iter()
                    .map(|&slot| Arc::clone(&self.entries[slot]))
                    .collect()
            })
            .unwrap_or_default()
    }
}
