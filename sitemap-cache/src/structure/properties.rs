//! Property inheritance along the sitemap tree.
//!
//! Every entry sees the properties of its ancestors overlaid with its own.
//! Each child receives its own copy of the parent's effective map, so sibling
//! subtrees never observe each other's overlays and the walk does not depend
//! on visiting order for correctness.

use crate::model::PropertyMap;

/// Overlay an entry's own properties on the inherited ones.
pub fn effective_properties(inherited: &PropertyMap, own: &PropertyMap) -> PropertyMap {
    let mut effective = inherited.clone();
    effective.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
    effective
}

/// The map passed down to the children of an entry.
///
/// Sub-sitemap references are never inherited: a child only switches to a
/// sub-sitemap when it names one itself.
pub fn inherited_by_children(effective: &PropertyMap, sitemap_property: &str) -> PropertyMap {
    let mut inherited = effective.clone();
    inherited.remove(sitemap_property);
    inherited
}

/// Look up a non-blank property value.
pub fn non_blank<'a>(properties: &'a PropertyMap, name: &str) -> Option<&'a str> {
    properties
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_child_without_own_properties_inherits_all() {
        let parent = props(&[("title", "Home")]);
        assert_eq!(effective_properties(&parent, &PropertyMap::new()), parent);
    }

    #[test]
    fn test_own_properties_override_inherited() {
        let inherited = props(&[("title", "Home"), ("template", "main")]);
        let own = props(&[("title", "About")]);
        assert_eq!(
            effective_properties(&inherited, &own),
            props(&[("title", "About"), ("template", "main")])
        );
    }

    #[test]
    fn test_sitemap_reference_not_inherited() {
        let effective = props(&[("title", "Home"), ("sitemap", "abc")]);
        assert_eq!(
            inherited_by_children(&effective, "sitemap"),
            props(&[("title", "Home")])
        );
        // the parent's map is untouched
        assert_eq!(effective.get("sitemap").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_siblings_do_not_share_overlays() {
        let parent = props(&[("title", "Home")]);
        let first = effective_properties(&parent, &props(&[("nav", "hidden")]));
        let second = effective_properties(&parent, &PropertyMap::new());

        assert_eq!(first.get("nav").map(String::as_str), Some("hidden"));
        assert!(!second.contains_key("nav"));
    }

    #[test]
    fn test_non_blank() {
        let map = props(&[("sitemap", "  "), ("title", " Home ")]);
        assert_eq!(non_blank(&map, "sitemap"), None);
        assert_eq!(non_blank(&map, "title"), Some("Home"));
        assert_eq!(non_blank(&map, "missing"), None);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn property_map() -> impl Strategy<Value = PropertyMap> {
            proptest::collection::btree_map("[a-e]{1,3}", "[a-z]{0,5}", 0..8)
        }

        proptest! {
            #[test]
            fn test_effective_is_parent_overridden_by_own(
                inherited in property_map(),
                own in property_map(),
            ) {
                let effective = effective_properties(&inherited, &own);

                for (key, value) in &own {
                    prop_assert_eq!(effective.get(key), Some(value));
                }
                for (key, value) in &inherited {
                    if !own.contains_key(key) {
                        prop_assert_eq!(effective.get(key), Some(value));
                    }
                }
                prop_assert!(effective.keys().all(|k| inherited.contains_key(k) || own.contains_key(k)));
            }

            #[test]
            fn test_children_never_inherit_sitemap_key(effective in property_map()) {
                let inherited = inherited_by_children(&effective, "a");
                prop_assert!(!inherited.contains_key("a"));
                prop_assert_eq!(inherited.len(), effective.len() - usize::from(effective.contains_key("a")));
            }
        }
    }
}
