//! Links: derived directed edges of the logical graph.
//!
//! A link exists in the map iff the source module's `destinations` list has
//! an entry for the destination and both endpoint modules exist. Links are
//! never persisted; they are rebuilt from `destinations` at load time.

use std::collections::HashMap;

/// A directed logical edge between two modules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// Derived id, `"<source_id>-<destination_id>"`.
    pub id: String,
    pub source_id: String,
    pub destination_id: String,
}

impl Link {
    /// Creates a link between two module ids.
    pub fn new(source_id: impl Into<String>, destination_id: impl Into<String>) -> Self {
        let source_id = source_id.into();
        let destination_id = destination_id.into();
        Self {
            id: link_id(&source_id, &destination_id),
            source_id,
            destination_id,
        }
    }
}

/// Link storage keyed by derived link id, for O(1) existence checks.
pub type LinkMap = HashMap<String, Link>;

/// Derives the id of a link between two modules. At most one link exists per
/// ordered module pair, regardless of which input or parameter it targets.
pub fn link_id(source_id: &str, destination_id: &str) -> String {
    format!("{}-{}", source_id, destination_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_id_derivation() {
        let link = Link::new("a", "b");
        assert_eq!(link.id, "a-b");
        assert_eq!(link.id, link_id("a", "b"));
    }

    #[test]
    fn test_link_map_round_trip() {
        let mut links = LinkMap::new();
        let link = Link::new("src", "dst");
        links.insert(link.id.clone(), link);
        assert!(links.contains_key(&link_id("src", "dst")));
        links.remove(&link_id("src", "dst"));
        assert!(links.is_empty());
    }
}
