//! In-memory attribute store.
//!
//! Maps object identities to tag snapshots. A store is filled during one
//! pass (from a TSV table or from an OSM document) and only queried after
//! that.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use tracing::warn;

use crate::error::Result;
use crate::object::{EntityKind, ObjectKey, OsmObject, Tags};
use crate::xml::{self, ObjectSink};

/// Tag snapshots keyed by `(kind, id)`.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    records: HashMap<ObjectKey, Tags>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the snapshot for an identity.
    ///
    /// Returns the snapshot that was replaced, if any.
    pub fn put(&mut self, kind: EntityKind, id: i64, tags: Tags) -> Option<Tags> {
        let key = ObjectKey::new(kind, id);
        let previous = self.records.insert(key, tags);
        if previous.is_some() {
            warn!(object = %key, "attribute snapshot overwritten");
        }
        previous
    }

    /// Looks up the snapshot for an identity. Unknown identities are `None`.
    pub fn get(&self, kind: EntityKind, id: i64) -> Option<&Tags> {
        self.records.get(&ObjectKey::new(kind, id))
    }

    pub fn contains(&self, kind: EntityKind, id: i64) -> bool {
        self.records.contains_key(&ObjectKey::new(kind, id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Sink that records the tags of every object it receives.
pub struct StoreLoader<'a> {
    store: &'a mut AttributeStore,
}

impl<'a> StoreLoader<'a> {
    pub fn new(store: &'a mut AttributeStore) -> Self {
        StoreLoader { store }
    }
}

impl ObjectSink for StoreLoader<'_> {
    fn add(&mut self, object: OsmObject) -> Result<()> {
        self.store.put(object.kind, object.id, object.tags);
        Ok(())
    }
}

/// Loads the tags of all objects of an OSM file into `store`.
pub fn load_xml_into_store<P: AsRef<Path>>(path: P, store: &mut AttributeStore) -> Result<usize> {
    xml::parse_file(path, StoreLoader::new(store))
}

/// Like [`load_xml_into_store`], reading from a buffered reader.
pub fn load_xml_reader_into_store<R: BufRead>(
    input: R,
    store: &mut AttributeStore,
) -> Result<usize> {
    xml::parse_reader(input, StoreLoader::new(store))
}
