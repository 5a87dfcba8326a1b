//! Column discovery.
//!
//! Collects every tag key used in a document. Keys come out sorted so the
//! header of an export is the same on every run over the same data.

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::Path;

use crate::error::Result;
use crate::object::OsmObject;
use crate::xml::{self, ObjectSink};

/// Sink that accumulates the union of all tag keys.
#[derive(Debug, Default)]
pub struct ColumnDetector {
    columns: BTreeSet<String>,
}

impl ColumnDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the discovered keys in sorted order.
    pub fn into_columns(self) -> Vec<String> {
        self.columns.into_iter().collect()
    }
}

impl ObjectSink for ColumnDetector {
    fn add(&mut self, object: OsmObject) -> Result<()> {
        for key in object.tags.into_keys() {
            self.columns.insert(key);
        }
        Ok(())
    }
}

/// Scans an OSM file and returns its tag keys.
pub fn detect_columns<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let mut detector = ColumnDetector::new();
    xml::parse_file(path, &mut detector)?;
    Ok(detector.into_columns())
}

/// Scans OSM XML from a reader and returns its tag keys.
pub fn detect_columns_from_reader<R: BufRead>(input: R) -> Result<Vec<String>> {
    let mut detector = ColumnDetector::new();
    xml::parse_reader(input, &mut detector)?;
    Ok(detector.into_columns())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const XML: &str = r#"<osm>
        <node id="1"><tag k="name" v="A"/><tag k="amenity" v="cafe"/></node>
        <way id="2"><tag k="highway" v="path"/><tag k="name" v="B"/></way>
        <relation id="3"/>
    </osm>"#;

    #[test]
    fn test_union_of_keys_sorted() {
        let columns = detect_columns_from_reader(XML.as_bytes()).unwrap();
        assert_eq!(columns, vec!["amenity", "highway", "name"]);
    }

    #[test]
    fn test_detection_is_stable() {
        let first = detect_columns_from_reader(XML.as_bytes()).unwrap();
        let second = detect_columns_from_reader(XML.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_tags_no_columns() {
        let columns = detect_columns_from_reader(r#"<osm><node id="1"/></osm>"#.as_bytes()).unwrap();
        assert!(columns.is_empty());
    }
}
