//! Queries against the sitemap structure cache.

use std::fmt::Write as _;

use clap::Subcommand;
use sitemap_cache::{
    CacheSnapshot, EntryId, RequestContext, SitemapEntry, SitemapStructureCache, StructureId,
};

use crate::error::CliError;

/// Inspect subcommands.
#[derive(Debug, Subcommand)]
pub enum InspectCommand {
    /// List active sitemaps (locale + entry point -> sitemap document)
    Active,

    /// Show the entry at a URI in the request locale
    Uri {
        /// Site-relative URI or root path (e.g. /about)
        uri: String,
    },

    /// Show the entry with an id
    Id {
        /// Entry id (UUID)
        id: String,
    },

    /// List entries backed by a resource
    StructureId {
        /// Structure id of the resource (UUID)
        id: String,
    },

    /// List entries backed by the resource at a root path
    Path {
        /// Root path of the backing resource
        root_path: String,
    },

    /// List site roots with at least one sitemap
    SiteRoots,

    /// Show the default properties of sitemap documents
    Defaults,

    /// Print the entry trees of the request locale
    Tree,

    /// Show index sizes and cache counters
    Stats,
}

/// Run an inspect subcommand.
pub fn run(
    cache: &SitemapStructureCache,
    ctx: &RequestContext,
    command: InspectCommand,
) -> Result<(), CliError> {
    match command {
        InspectCommand::Active => {
            let active = cache.active_sitemaps(ctx)?;
            let mut rows: Vec<_> = active.iter().collect();
            rows.sort();
            for (key, sitemap) in rows {
                println!("{:<40} {}", key, sitemap);
            }
        }
        InspectCommand::Uri { uri } => match cache.entry_by_uri(ctx, &uri)? {
            Some(entry) => print!("{}", describe_entry(&entry)),
            None => println!("No entry at {} ({})", ctx.add_site_root(&uri), ctx.locale),
        },
        InspectCommand::Id { id } => {
            let id: EntryId = id
                .parse()
                .map_err(|e| CliError::InvalidArgument(format!("entry id '{}': {}", id, e)))?;
            match cache.entry_by_id(ctx, &id)? {
                Some(entry) => print!("{}", describe_entry(&entry)),
                None => println!("No entry with id {}", id),
            }
        }
        InspectCommand::StructureId { id } => {
            let id: StructureId = id
                .parse()
                .map_err(|e| CliError::InvalidArgument(format!("structure id '{}': {}", id, e)))?;
            print_entries(&cache.entries_by_structure_id(ctx, &id)?);
        }
        InspectCommand::Path { root_path } => {
            print_entries(&cache.entries_by_root_vfs_path(ctx, &root_path)?);
        }
        InspectCommand::SiteRoots => {
            for site_root in cache.site_roots_with_sitemap(ctx)?.iter() {
                println!("{}", site_root);
            }
        }
        InspectCommand::Defaults => {
            let defaults = cache.default_properties(ctx);
            if defaults.is_empty() {
                println!("(no default properties)");
            }
            for (name, value) in defaults.iter() {
                println!("{} = {}", name, value);
            }
        }
        InspectCommand::Tree => {
            let snapshot = cache.snapshot()?;
            print!("{}", render_tree(&snapshot, ctx));
        }
        InspectCommand::Stats => {
            let snapshot = cache.snapshot()?;
            let stats = cache.stats();
            println!("{}", cache.describe());
            println!("  Index:         {}", snapshot.summary());
            println!("  Rebuilds:      {}", stats.rebuilds_started);
            println!("  Failed:        {}", stats.rebuilds_failed);
            println!("  Last rebuild:  {} ms", stats.last_rebuild_ms);
        }
    }
    Ok(())
}

fn print_entries(entries: &[std::sync::Arc<SitemapEntry>]) {
    if entries.is_empty() {
        println!("(no entries)");
    }
    for entry in entries {
        println!("{}  {}", entry.id, entry.root_path);
    }
}

/// Multi-line description of one entry.
fn describe_entry(entry: &SitemapEntry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", entry.root_path);
    let _ = writeln!(out, "  id:           {}", entry.id);
    let _ = writeln!(out, "  structure id: {}", entry.structure_id);
    let _ = writeln!(out, "  resource:     {}", entry.resource_path);
    let _ = writeln!(out, "  locale:       {}", entry.locale);
    let _ = writeln!(out, "  entry point:  {}", entry.entry_point);
    let _ = writeln!(out, "  position:     {}", entry.position);
    let _ = writeln!(out, "  root entry:   {}", entry.is_root_entry);
    let _ = writeln!(out, "  children:     {}", entry.sub_entries.len());
    for (name, value) in &entry.effective_properties {
        let marker = if entry.properties.contains_key(name) { "" } else { " (inherited)" };
        let _ = writeln!(out, "  {} = {}{}", name, value, marker);
    }
    out
}

/// Indented tree of all root sitemaps in the request locale.
fn render_tree(snapshot: &CacheSnapshot, ctx: &RequestContext) -> String {
    let mut out = String::new();
    let roots = snapshot
        .entries()
        .filter(|e| e.is_root_entry && e.locale == ctx.locale);
    for root in roots {
        render_subtree(snapshot, root, 0, &mut out);
    }
    out
}

fn render_subtree(snapshot: &CacheSnapshot, entry: &SitemapEntry, depth: usize, out: &mut String) {
    let label = if entry.name.is_empty() {
        entry.root_path.as_str()
    } else {
        entry.name.as_str()
    };
    let _ = writeln!(out, "{}{}", "  ".repeat(depth), label);
    for child in &entry.sub_entries {
        if let Some(child) = snapshot.entry_by_id(child) {
            render_subtree(snapshot, &child, depth + 1, out);
        }
    }
}
