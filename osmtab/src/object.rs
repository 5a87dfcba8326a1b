//! OSM object model.
//!
//! One [`OsmObject`] is produced per `node`, `way` or `relation` element of
//! an OSM XML document. Objects are transient: the ingest driver hands each
//! one to a sink by value once it is complete.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::Error;

/// Tag map of an object. Keeps document order; equality ignores order.
pub type Tags = IndexMap<String, String>;

/// The three kinds of OSM entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Node,
    Way,
    Relation,
}

impl EntityKind {
    /// All kinds, in document order.
    pub const ALL: [EntityKind; 3] = [EntityKind::Node, EntityKind::Way, EntityKind::Relation];

    /// Returns the XML element name (and TSV `osm_type` value) of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Node => "node",
            EntityKind::Way => "way",
            EntityKind::Relation => "relation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(EntityKind::Node),
            "way" => Ok(EntityKind::Way),
            "relation" => Ok(EntityKind::Relation),
            other => Err(Error::InvalidKind(other.to_string())),
        }
    }
}

/// Identity of an object: ids are only unique per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub kind: EntityKind,
    pub id: i64,
}

impl ObjectKey {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        ObjectKey { kind, id }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Element attributes passed through verbatim.
///
/// Only `action` is ever replaced, and only by the changefile writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub timestamp: Option<String>,
    pub user: Option<String>,
    pub uid: Option<String>,
    pub version: Option<String>,
    pub changeset: Option<String>,
    pub visible: Option<String>,
    pub action: Option<String>,
}

/// A relation member reference.
///
/// `reference` is the validated id exactly as written in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub kind: EntityKind,
    pub reference: String,
    pub role: String,
}

impl Member {
    pub fn new(kind: EntityKind, reference: impl Into<String>, role: impl Into<String>) -> Self {
        Member {
            kind,
            reference: reference.into(),
            role: role.into(),
        }
    }
}

/// A fully parsed node, way or relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsmObject {
    pub kind: EntityKind,
    pub id: i64,
    pub tags: Tags,
    pub metadata: Metadata,
    /// Node coordinates, kept as the original strings.
    pub lat: Option<String>,
    pub lon: Option<String>,
    /// Way node references in geometry order, as written in the input.
    pub nodes: Vec<String>,
    /// Relation members in document order.
    pub members: Vec<Member>,
}

impl OsmObject {
    /// Creates an object with no tags, metadata or children.
    pub fn new(kind: EntityKind, id: i64) -> Self {
        OsmObject {
            kind,
            id,
            tags: Tags::new(),
            metadata: Metadata::default(),
            lat: None,
            lon: None,
            nodes: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Builder-style helper that adds a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Returns the store key of this object.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = "area".parse::<EntityKind>().unwrap_err();
        assert!(matches!(err, Error::InvalidKind(ref s) if s == "area"));
        assert!("Node".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_identity_includes_kind() {
        let node = OsmObject::new(EntityKind::Node, 7);
        let way = OsmObject::new(EntityKind::Way, 7);
        assert_ne!(node.key(), way.key());
        assert_eq!(node.key().to_string(), "node 7");
    }

    #[test]
    fn test_tag_equality_ignores_order() {
        let a = OsmObject::new(EntityKind::Node, 1)
            .with_tag("a", "1")
            .with_tag("b", "2");
        let b = OsmObject::new(EntityKind::Node, 1)
            .with_tag("b", "2")
            .with_tag("a", "1");
        assert_eq!(a.tags, b.tags);
    }
}
