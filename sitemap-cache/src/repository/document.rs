//! Decoded sitemap documents.

use serde::{Deserialize, Serialize};

use crate::model::{EntryId, Locale, PropertyMap, StructureId};

/// An entry as stored in a sitemap document.
///
/// Carries only the entry's own properties; inherited values are computed
/// during the rebuild walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Unique entry identifier.
    pub id: EntryId,

    /// Resource the entry renders.
    pub structure_id: StructureId,

    /// Path segment below the parent entry. Empty for root entries.
    #[serde(default)]
    pub name: String,

    /// Properties set on this entry.
    #[serde(default)]
    pub properties: PropertyMap,

    /// Child entries in document order.
    #[serde(default)]
    pub sub_entries: Vec<DocumentEntry>,
}

impl DocumentEntry {
    /// Create a leaf entry with no properties.
    pub fn new(structure_id: StructureId, name: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(),
            structure_id,
            name: name.into(),
            properties: PropertyMap::new(),
            sub_entries: Vec::new(),
        }
    }

    /// Set a property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Append a child entry.
    pub fn with_child(mut self, child: DocumentEntry) -> Self {
        self.sub_entries.push(child);
        self
    }
}

/// The entries of a document for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedSitemap {
    pub locale: Locale,
    #[serde(default)]
    pub entries: Vec<DocumentEntry>,
}

/// A decoded sitemap document: one entry tree per declared locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapDocument {
    #[serde(default)]
    pub locales: Vec<LocalizedSitemap>,
}

impl SitemapDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the entries for a locale.
    pub fn with_locale(mut self, locale: impl Into<Locale>, entries: Vec<DocumentEntry>) -> Self {
        self.locales.push(LocalizedSitemap {
            locale: locale.into(),
            entries,
        });
        self
    }

    /// Declared locales in document order.
    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.locales.iter().map(|l| &l.locale)
    }

    /// Take the root-level entries for a locale, if the locale is declared.
    pub fn take_entries(&mut self, locale: &Locale) -> Option<Vec<DocumentEntry>> {
        self.locales
            .iter_mut()
            .find(|l| &l.locale == locale)
            .map(|l| std::mem::take(&mut l.entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_entries_for_declared_locale() {
        let root = DocumentEntry::new(StructureId::new(), "");
        let mut doc = SitemapDocument::new()
            .with_locale("en", vec![root.clone()])
            .with_locale("de", Vec::new());

        let locales: Vec<_> = doc.locales().map(|l| l.to_string()).collect();
        assert_eq!(locales, vec!["en", "de"]);

        assert_eq!(doc.take_entries(&Locale::from("en")), Some(vec![root]));
        assert_eq!(doc.take_entries(&Locale::from("fr")), None);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = format!(
            r#"{{"locales":[{{"locale":"en","entries":[{{"id":"{}","structure_id":"{}"}}]}}]}}"#,
            EntryId::new(),
            StructureId::new()
        );
        let doc: SitemapDocument = serde_json::from_str(&json).unwrap();
        let entry = &doc.locales[0].entries[0];
        assert!(entry.name.is_empty());
        assert!(entry.properties.is_empty());
        assert!(entry.sub_entries.is_empty());
    }
}
