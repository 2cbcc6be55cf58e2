//! Full rebuild of the sitemap indices.
//!
//! Entry points are folders carrying the entry point property. For each one
//! the root sitemap is loaded and every declared locale is walked by a
//! [`TreeVisitor`]. A broken entry point is logged and skipped; a broken
//! structure reference anywhere aborts the whole rebuild.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::snapshot::{CacheSnapshot, IndexBuilder};
use super::visitor::TreeVisitor;
use crate::config::SitemapCacheConfig;
use crate::error::{Result, SitemapError};
use crate::model::{normalize_path, RepositoryMode, Resource};
use crate::repository::{
    ContentRepository, LocalizedSitemap, ResourceFilter, SitemapDocument, SitemapUnmarshaller,
};

/// Collaborators and settings shared by all steps of one rebuild.
#[derive(Clone, Copy)]
pub struct RebuildContext<'a> {
    pub repository: &'a dyn ContentRepository,
    pub unmarshaller: &'a dyn SitemapUnmarshaller,
    pub config: &'a SitemapCacheConfig,
}

impl<'a> RebuildContext<'a> {
    pub fn new(
        repository: &'a dyn ContentRepository,
        unmarshaller: &'a dyn SitemapUnmarshaller,
        config: &'a SitemapCacheConfig,
    ) -> Self {
        Self {
            repository,
            unmarshaller,
            config,
        }
    }

    /// Repository mode every read is issued in.
    pub fn mode(&self) -> RepositoryMode {
        self.config.mode
    }
}

/// Build a fresh snapshot of all active sitemaps.
///
/// # Errors
///
/// Fails if entry points cannot be listed or an entry's backing resource cannot
/// be resolved. Failures confined to one entry point's root sitemap are logged
/// and do not fail the rebuild.
pub fn rebuild_all(ctx: &RebuildContext<'_>) -> Result<CacheSnapshot> {
    let start = Instant::now();
    let mut builder = IndexBuilder::new();

    let entry_points = ctx.repository.read_resources_with_property(
        ctx.mode(),
        "/",
        &ctx.config.entry_point_property,
        &ResourceFilter::entry_point_folders(),
    )?;
    debug!(
        name = %ctx.config.name,
        entry_points = entry_points.len(),
        "Rebuilding sitemap structure"
    );

    for entry_point in &entry_points {
        if let Some(site_root) = ctx.repository.site_root(&entry_point.root_path) {
            builder.add_site_root(site_root);
        }

        let (sitemap, document) = match load_root_sitemap(ctx, entry_point) {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(
                    name = %ctx.config.name,
                    entry_point = %entry_point.root_path,
                    error = %e,
                    "Skipping entry point with unusable root sitemap"
                );
                continue;
            }
        };

        visit_root_sitemap(ctx, &mut builder, entry_point, &sitemap, document)?;
    }

    let snapshot = builder.finish();
    info!(
        name = %ctx.config.name,
        elapsed_ms = start.elapsed().as_millis() as u64,
        summary = %snapshot.summary(),
        "Sitemap structure rebuilt"
    );
    Ok(snapshot)
}

/// Locate, read and decode the root sitemap of an entry point.
///
/// The property value is tried as a root path first and, if nothing exists
/// there, as a path inside the entry point's site.
fn load_root_sitemap(
    ctx: &RebuildContext<'_>,
    entry_point: &Resource,
) -> Result<(Resource, SitemapDocument)> {
    let property = &ctx.config.entry_point_property;
    let value = ctx
        .repository
        .read_property(ctx.mode(), entry_point, property)?;
    let path = value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SitemapError::PropertyMissing {
            resource: entry_point.root_path.clone(),
            property: property.clone(),
        })?;

    let file = match ctx.repository.read_file(ctx.mode(), path) {
        Err(e) if e.is_not_found() => {
            let site_root = ctx
                .repository
                .site_root(&entry_point.root_path)
                .ok_or(e)?;
            let site_path = format!(
                "{}{}",
                site_root.trim_end_matches('/'),
                normalize_path(path)
            );
            ctx.repository.read_file(ctx.mode(), &site_path)?
        }
        other => other?,
    };

    let document = ctx.unmarshaller.unmarshal(&file)?;
    if let Some(empty) = document.locales.iter().find(|l| l.entries.is_empty()) {
        return Err(SitemapError::InvalidDocument {
            path: file.resource.root_path,
            reason: format!("locale {} has no root entry", empty.locale),
        });
    }
    Ok((file.resource, document))
}

fn visit_root_sitemap(
    ctx: &RebuildContext<'_>,
    builder: &mut IndexBuilder,
    entry_point: &Resource,
    sitemap: &Resource,
    document: SitemapDocument,
) -> Result<()> {
    // Keys and entry fields must agree however the repository spells folders.
    let entry_point = normalize_path(&entry_point.root_path);
    for LocalizedSitemap { locale, entries } in document.locales {
        builder.record_active_sitemap(&locale, &entry_point, &sitemap.root_path);

        let mut entries = entries.into_iter();
        let Some(root) = entries.next() else {
            continue;
        };
        let ignored = entries.len();
        if ignored > 0 {
            warn!(
                sitemap = %sitemap.root_path,
                locale = %locale,
                ignored,
                "Root sitemap has more than one root entry, using the first"
            );
        }

        let before = builder.len();
        TreeVisitor::new(ctx, builder, locale.clone(), &sitemap.root_path)
            .visit_root(root, &entry_point)?;
        debug!(
            entry_point = %entry_point,
            locale = %locale,
            entries = builder.len() - before,
            "Indexed root sitemap"
        );
    }
    Ok(())
}
