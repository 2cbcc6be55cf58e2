//! Depth-first walk over one locale of a root sitemap.
//!
//! The visitor resolves each entry's runtime fields (root path, entry point,
//! position, root flag, effective properties), registers it with the
//! [`IndexBuilder`] and recurses into its children. Children come either from
//! the document itself or, when the entry names a sub-sitemap, from that
//! sub-sitemap's entries for the same locale.
//!
//! ```text
//!   /sites/a            (root entry, entry point /sites/a)
//!   ├── foo             position 0
//!   └── news            sitemap=<id>  -> children replaced by sub-sitemap
//!       ├── 2024        entry point /sites/a/news
//!       └── archive     entry point /sites/a/news
//! ```
//!
//! Failing to resolve an entry's backing resource aborts the walk. A broken
//! sub-sitemap only costs the entry its children.

use tracing::{debug, error};

use super::properties::{effective_properties, inherited_by_children, non_blank};
use super::rebuild::RebuildContext;
use super::snapshot::{IndexBuilder, SitemapEntry};
use super::sub_sitemap::resolve_sub_sitemap;
use crate::error::{Result, SitemapError};
use crate::model::{join_path, normalize_path, EntryId, Locale, PropertyMap};
use crate::repository::DocumentEntry;

/// Where an entry sits in the tree.
struct Placement<'p> {
    root_path: String,
    entry_point: &'p str,
    is_root_entry: bool,
    position: usize,
}

/// Walks the entries of one locale and feeds them to an [`IndexBuilder`].
pub struct TreeVisitor<'a> {
    ctx: &'a RebuildContext<'a>,
    builder: &'a mut IndexBuilder,
    locale: Locale,
    /// Sitemap documents open on the current branch, outermost first.
    open_sitemaps: Vec<String>,
}

impl<'a> TreeVisitor<'a> {
    /// Create a visitor for `locale` of the root sitemap at `root_sitemap`.
    pub fn new(
        ctx: &'a RebuildContext<'a>,
        builder: &'a mut IndexBuilder,
        locale: Locale,
        root_sitemap: &str,
    ) -> Self {
        Self {
            ctx,
            builder,
            locale,
            open_sitemaps: vec![root_sitemap.to_string()],
        }
    }

    /// Visit the root entry of a root sitemap attached to `entry_point`.
    ///
    /// The root entry takes the entry point's path; a non-empty name in the
    /// document is dropped.
    pub fn visit_root(&mut self, mut root: DocumentEntry, entry_point: &str) -> Result<EntryId> {
        if !root.name.is_empty() {
            debug!(
                entry_point = %entry_point,
                locale = %self.locale,
                name = %root.name,
                "Clearing name of root sitemap entry"
            );
            root.name.clear();
        }

        let entry_point = normalize_path(entry_point);
        let placement = Placement {
            root_path: entry_point.clone(),
            entry_point: &entry_point,
            is_root_entry: true,
            position: 0,
        };
        self.visit(root, placement, &PropertyMap::new())
    }

    fn visit(
        &mut self,
        entry: DocumentEntry,
        placement: Placement<'_>,
        inherited: &PropertyMap,
    ) -> Result<EntryId> {
        let DocumentEntry {
            id,
            structure_id,
            name,
            properties,
            sub_entries,
        } = entry;
        let sitemap_property = self.ctx.config.sitemap_property.as_str();

        let effective = effective_properties(inherited, &properties);
        let reference = non_blank(&effective, sitemap_property).map(str::to_string);
        let child_inherited = inherited_by_children(&effective, sitemap_property);
        let root_path = placement.root_path;

        let slot = self.builder.register_entry(SitemapEntry {
            id,
            structure_id,
            name,
            root_path: root_path.clone(),
            locale: self.locale.clone(),
            properties,
            effective_properties: effective,
            entry_point: placement.entry_point.to_string(),
            position: placement.position,
            is_root_entry: placement.is_root_entry,
            resource_path: String::new(),
            sub_entries: Vec::new(),
        });

        let resource = self
            .ctx
            .repository
            .read_resource(self.ctx.mode(), &structure_id)
            .map_err(|e| SitemapError::StructureResolution {
                entry: id.to_string(),
                structure_id: structure_id.to_string(),
                reason: e.to_string(),
            })?;
        self.builder.index_resource(slot, &resource.root_path);

        let (children, sub_sitemap) = match reference {
            None => (sub_entries, None),
            Some(reference) => {
                match resolve_sub_sitemap(self.ctx, &reference, &self.locale, &self.open_sitemaps)
                {
                    Ok(sub) => (sub.entries, Some(sub.root_path)),
                    Err(e) => {
                        error!(
                            entry = %root_path,
                            locale = %self.locale,
                            reference = %reference,
                            error = %e,
                            "Failed to load sub-sitemap, entry keeps no children"
                        );
                        (Vec::new(), None)
                    }
                }
            }
        };

        let child_entry_point = match &sub_sitemap {
            Some(sitemap) => {
                self.builder
                    .record_active_sitemap(&self.locale, &root_path, sitemap);
                self.open_sitemaps.push(sitemap.clone());
                root_path.clone()
            }
            None => placement.entry_point.to_string(),
        };

        let mut child_ids = Vec::with_capacity(children.len());
        for (position, child) in children.into_iter().enumerate() {
            let placement = Placement {
                root_path: join_path(&root_path, &child.name),
                entry_point: &child_entry_point,
                is_root_entry: false,
                position,
            };
            child_ids.push(self.visit(child, placement, &child_inherited)?);
        }

        if sub_sitemap.is_some() {
            self.open_sitemaps.pop();
        }
        self.builder.set_sub_entries(slot, child_ids);
        Ok(id)
    }
}
