//! Resolution of sub-sitemap references.
//!
//! An entry whose effective properties carry the sitemap property (by default
//! `sitemap`) is replaced, child-wise, by the root entries of the referenced
//! sitemap document for the locale being visited.

use tracing::debug;

use super::rebuild::RebuildContext;
use crate::error::{Result, SitemapError};
use crate::model::{Locale, StructureId};
use crate::repository::DocumentEntry;

/// A loaded sub-sitemap: its location and the entries for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubSitemap {
    /// Root path of the sub-sitemap document.
    pub root_path: String,

    /// Root-level entries for the visited locale, in document order.
    ///
    /// Empty when the document does not declare the locale.
    pub entries: Vec<DocumentEntry>,
}

/// Load the sub-sitemap named by `reference` for `locale`.
///
/// `reference` is the structure id of the sitemap document. `open_sitemaps`
/// holds the root paths of the sitemaps currently being walked on this branch;
/// a reference back into one of them is rejected as a cycle.
///
/// # Errors
///
/// Any failure to parse the id, read the document or decode it. The caller
/// treats every error as "no sub-entries".
pub fn resolve_sub_sitemap(
    ctx: &RebuildContext<'_>,
    reference: &str,
    locale: &Locale,
    open_sitemaps: &[String],
) -> Result<SubSitemap> {
    let id: StructureId = reference.parse().map_err(|e| SitemapError::InvalidDocument {
        path: reference.to_string(),
        reason: format!("sub-sitemap reference is not a structure id: {}", e),
    })?;

    let resource = ctx.repository.read_resource(ctx.mode(), &id)?;
    if open_sitemaps.contains(&resource.root_path) {
        return Err(SitemapError::InvalidDocument {
            path: resource.root_path,
            reason: "sub-sitemap references a sitemap already being visited".to_string(),
        });
    }

    let file = ctx.repository.read_file(ctx.mode(), &resource.root_path)?;
    let mut document = ctx.unmarshaller.unmarshal(&file)?;
    let entries = document.take_entries(locale).unwrap_or_default();

    debug!(
        sub_sitemap = %file.resource.root_path,
        locale = %locale,
        entries = entries.len(),
        "Resolved sub-sitemap"
    );

    Ok(SubSitemap {
        root_path: file.resource.root_path,
        entries,
    })
}
