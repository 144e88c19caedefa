//! Item Sum Type
//!
//! Everything placed in the workspace tree is an `Item`: either a
//! [`Document`] (note) or a [`Container`] (folder). The set of kinds is
//! closed on purpose - entity fields are compile-time checked rather than
//! shuttled through an open JSON map.
//!
//! # Wire Format
//!
//! Items serialize internally tagged, with the discriminator merged into the
//! entity fields (NOT nested):
//!
//! ```json
//! {"kind":"container","id":"...","parentId":null,"order":1.0,"name":"Inbox",...}
//! ```
//!
//! The persistence gateway and the change feed both rely on this shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::container::Container;
use super::document::Document;

/// Discriminator for the entity kinds crossing the persistence boundary.
///
/// `Item` covers only the tree kinds; `SavedQuery` additionally appears in
/// gateway calls and change-feed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Document,
    Container,
    SavedQuery,
}

/// A node in the workspace tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Item {
    Document(Document),
    Container(Container),
}

impl Item {
    /// Unique identifier of the underlying entity.
    pub fn id(&self) -> &str {
        match self {
            Item::Document(doc) => &doc.id,
            Item::Container(container) => &container.id,
        }
    }

    /// Containing folder (`None` = workspace root).
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Item::Document(doc) => doc.parent_id.as_deref(),
            Item::Container(container) => container.parent_id.as_deref(),
        }
    }

    /// Fractional sort key among siblings.
    pub fn order(&self) -> f64 {
        match self {
            Item::Document(doc) => doc.order,
            Item::Container(container) => container.order,
        }
    }

    /// Last modification timestamp.
    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Item::Document(doc) => doc.updated_at,
            Item::Container(container) => container.updated_at,
        }
    }

    /// Entity kind discriminator.
    pub fn kind(&self) -> EntityKind {
        match self {
            Item::Document(_) => EntityKind::Document,
            Item::Container(_) => EntityKind::Container,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Item::Container(_))
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Item::Document(doc) => Some(doc),
            Item::Container(_) => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Item::Container(container) => Some(container),
            Item::Document(_) => None,
        }
    }

    /// Rewrite the tree placement and bump `updated_at`.
    ///
    /// The workspace store is the only caller; no other component writes
    /// `parent_id` or `order`.
    pub(crate) fn set_placement(&mut self, parent_id: Option<String>, order: f64) {
        let now = Utc::now();
        match self {
            Item::Document(doc) => {
                doc.parent_id = parent_id;
                doc.order = order;
                doc.updated_at = now;
            }
            Item::Container(container) => {
                container.parent_id = parent_id;
                container.order = order;
                container.updated_at = now;
            }
        }
    }

    /// Rewrite only the sort key, without touching `updated_at`.
    ///
    /// Used when a sibling run is renumbered: relabeling is a key-readability
    /// rewrite, not an edit, and must not win timestamp conflicts.
    pub(crate) fn set_order(&mut self, order: f64) {
        match self {
            Item::Document(doc) => doc.order = order,
            Item::Container(container) => container.order = order,
        }
    }
}

impl From<Document> for Item {
    fn from(doc: Document) -> Self {
        Item::Document(doc)
    }
}

impl From<Container> for Item {
    fn from(container: Container) -> Self {
        Item::Container(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Contract test: documents and enforces the exact JSON format for Item.
    ///
    /// The frontend TypeScript types MUST match this format. Serde's
    /// `#[serde(tag = "kind")]` produces an INTERNALLY-TAGGED format where
    /// the discriminator field is merged with the entity fields (NOT nested).
    #[test]
    fn test_item_serialization_contract() {
        let container = Item::Container(Container::new("Inbox", None, 1.0));

        let json = serde_json::to_string(&container).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.get("kind").unwrap(), "container");
        assert_eq!(parsed.get("name").unwrap(), "Inbox");
        assert_eq!(parsed.get("order").unwrap(), 1.0);
        assert!(parsed.get("parentId").unwrap().is_null());
        // Verify NOT nested - there should be no "container" key
        assert!(
            parsed.get("container").is_none(),
            "Should NOT be nested under 'container' key"
        );

        let doc = Item::Document(Document::new("Note", "body", Some("folder-1".into()), 2.0));
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.get("kind").unwrap(), "document");
        assert_eq!(parsed.get("parentId").unwrap(), "folder-1");
        assert_eq!(parsed.get("title").unwrap(), "Note");
        assert!(parsed.get("document").is_none());
    }

    #[test]
    fn test_item_round_trip() {
        let original = Item::Document(Document::new("Note", "body", None, 1.5));
        let json = serde_json::to_string(&original).unwrap();
        let decoded: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_entity_kind_tags() {
        assert_eq!(
            serde_json::to_string(&EntityKind::SavedQuery).unwrap(),
            "\"savedQuery\""
        );
        assert_eq!(
            serde_json::to_string(&EntityKind::Document).unwrap(),
            "\"document\""
        );
    }
}
