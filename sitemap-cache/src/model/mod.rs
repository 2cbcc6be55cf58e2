//! Core value types shared by the repository boundary and the cache.

mod ids;
mod resource;

pub use ids::{EntryId, Locale, StructureId};
pub use resource::{
    join_path, normalize_path, PropertyMap, RepositoryFile, RepositoryMode, RequestContext,
    Resource,
};
