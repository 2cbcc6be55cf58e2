//! Sitemap structure cache.
//!
//! This module builds and serves the indexed view of all active sitemaps.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐ CacheEvent  ┌──────────────────────────┐
//! │ InvalidationListener │────────────▶│  SitemapStructureCache   │
//! └──────────────────────┘ invalidate()│  SingleFlight<Snapshot>  │
//!                                      └────────────┬─────────────┘
//!                                                   │ rebuild_all()
//!                                      ┌────────────▼─────────────┐
//!                                      │ entry points → root      │
//!                                      │ sitemaps → TreeVisitor   │
//!                                      │   ├─ properties          │
//!                                      │   └─ sub_sitemap         │
//!                                      └────────────┬─────────────┘
//!                                                   │ IndexBuilder
//!                                      ┌────────────▼─────────────┐
//!                                      │ CacheSnapshot (immutable)│
//!                                      │ by id / uri / structure  │
//!                                      │ id / root path, paths,   │
//!                                      │ active sitemaps, sites   │
//!                                      └──────────────────────────┘
//! ```
//!
//! Readers share the published snapshot through an `Arc`; a rebuild produces
//! a new snapshot and never touches the old one.

mod cache;
mod flight;
mod listener;
pub mod properties;
mod rebuild;
mod snapshot;
mod sub_sitemap;
mod visitor;

pub use cache::{CacheStats, CacheStatsSnapshot, SitemapStructureCache};
pub use flight::{Flight, FlightRole, SingleFlight};
pub use listener::{CacheEvent, Invalidation, InvalidationListener};
pub use rebuild::{rebuild_all, RebuildContext};
pub use snapshot::{CacheSnapshot, EntrySlot, IndexBuilder, SitemapEntry, SnapshotSummary};
pub use sub_sitemap::{resolve_sub_sitemap, SubSitemap};
pub use visitor::TreeVisitor;
