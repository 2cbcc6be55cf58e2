//! Identifier types for sitemap entries, repository resources and locales.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier of a sitemap entry.
    EntryId
);

uuid_id!(
    /// Identifier of a resource in the content repository.
    StructureId
);

/// A content locale such as `en` or `de_CH`.
///
/// Locales are compared by their string form. They are prefixed onto root paths
/// to build locale-qualified keys (`"en" + "/sites/a/foo"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    /// Create a locale from its string form.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the locale as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the locale-qualified key for a root path.
    pub fn qualify(&self, root_path: &str) -> String {
        format!("{}{}", self.0, root_path)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_id_parse_roundtrip() {
        let id = StructureId::new();
        let parsed: StructureId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_structure_id_parse_trims_whitespace() {
        let id = StructureId::new();
        let parsed: StructureId = format!("  {}\n", id).parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_structure_id_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<StructureId>().is_err());
    }

    #[test]
    fn test_locale_qualify() {
        let locale = Locale::from("en");
        assert_eq!(locale.qualify("/site/a"), "en/site/a");
    }
}
