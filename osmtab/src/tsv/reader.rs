//! TSV import.
//!
//! The header is validated once. Every record must have exactly as many
//! fields as the header, so a row that was split or joined by a stray tab
//! fails the run instead of shifting values into the wrong keys.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord};

use super::{DELIMITER, OSM_ID_COLUMN, OSM_TYPE_COLUMN};
use crate::error::{Error, Result};
use crate::object::{EntityKind, Tags};
use crate::store::AttributeStore;

/// Column layout of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsvHeader {
    columns: Vec<String>,
    type_index: usize,
    id_index: usize,
}

impl TsvHeader {
    /// Validates a header record.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        let find = |name: &str| {
            columns.iter().position(|c| c == name).ok_or_else(|| {
                Error::SchemaMismatch(format!("header has no '{}' column", name))
            })
        };
        let type_index = find(OSM_TYPE_COLUMN)?;
        let id_index = find(OSM_ID_COLUMN)?;
        Ok(TsvHeader {
            columns,
            type_index,
            id_index,
        })
    }

    /// Splits a record into its identity and tag snapshot.
    ///
    /// Empty fields are kept as present, empty tag values.
    pub fn split(&self, record: &StringRecord, line: u64) -> Result<(EntityKind, i64, Tags)> {
        if record.len() != self.columns.len() {
            return Err(Error::SchemaMismatch(format!(
                "line {}: {} fields, header has {}",
                line,
                record.len(),
                self.columns.len()
            )));
        }

        let raw_kind = record.get(self.type_index).unwrap_or_default();
        let kind = raw_kind.parse::<EntityKind>().map_err(|_| {
            Error::Parse(format!("line {}: invalid {} {:?}", line, OSM_TYPE_COLUMN, raw_kind))
        })?;
        let raw_id = record.get(self.id_index).unwrap_or_default();
        let id = raw_id.trim().parse::<i64>().map_err(|_| {
            Error::Parse(format!("line {}: invalid {} {:?}", line, OSM_ID_COLUMN, raw_id))
        })?;

        let tags = self
            .columns
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(index, _)| *index != self.type_index && *index != self.id_index)
            .map(|(_, (column, value))| (column.clone(), value.to_string()))
            .collect();

        Ok((kind, id, tags))
    }
}

/// Reads a table into a new store.
pub fn load_tsv<R: Read>(input: R) -> Result<AttributeStore> {
    let mut store = AttributeStore::new();
    load_tsv_into_store(input, &mut store)?;
    Ok(store)
}

/// Reads a table into `store`, returning the number of records read.
pub fn load_tsv_into_store<R: Read>(input: R, store: &mut AttributeStore) -> Result<usize> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .quoting(false)
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => TsvHeader::new(record?.iter().map(str::to_string).collect())?,
        None => {
            return Err(Error::SchemaMismatch(
                "empty input, expected a header line".to_string(),
            ))
        }
    };

    let mut count = 0;
    for record in records {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let (kind, id, tags) = header.split(&record, line)?;
        store.put(kind, id, tags);
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_rows() {
        let tsv = "osm_type\tosm_id\tname\tamenity\nnode\t1\tFoo\t\nway\t2\t\tparking\n";
        let store = load_tsv(tsv.as_bytes()).unwrap();
        assert_eq!(store.len(), 2);

        let node = store.get(EntityKind::Node, 1).unwrap();
        assert_eq!(node.get("name").map(String::as_str), Some("Foo"));
        // empty cell is a present, empty value
        assert_eq!(node.get("amenity").map(String::as_str), Some(""));
        assert!(!node.contains_key(OSM_TYPE_COLUMN));
        assert!(!node.contains_key(OSM_ID_COLUMN));

        let way = store.get(EntityKind::Way, 2).unwrap();
        assert_eq!(way.get("amenity").map(String::as_str), Some("parking"));
    }

    #[test]
    fn test_reserved_columns_anywhere() {
        let tsv = "name\tosm_id\tosm_type\nFoo\t7\trelation\n";
        let store = load_tsv(tsv.as_bytes()).unwrap();
        let tags = store.get(EntityKind::Relation, 7).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["name"], "Foo");
    }

    #[test]
    fn test_header_only() {
        let store = load_tsv("osm_type\tosm_id\tname\n".as_bytes()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_reserved_column() {
        let err = load_tsv("osm_type\tname\nnode\tFoo\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(ref msg) if msg.contains("osm_id")));
    }

    #[test]
    fn test_empty_input() {
        let err = load_tsv("".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }

    #[test]
    fn test_short_row_rejected() {
        let tsv = "osm_type\tosm_id\tname\tamenity\nnode\t1\tFoo\n";
        let err = load_tsv(tsv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(ref msg) if msg.contains("line 2")));
    }

    #[test]
    fn test_long_row_rejected() {
        let tsv = "osm_type\tosm_id\tname\nnode\t1\tFoo\textra\n";
        assert!(matches!(
            load_tsv(tsv.as_bytes()).unwrap_err(),
            Error::SchemaMismatch(_)
        ));
    }

    #[test]
    fn test_bad_kind_and_id() {
        let err = load_tsv("osm_type\tosm_id\nshape\t1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("shape")));

        let err = load_tsv("osm_type\tosm_id\nnode\tx1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("x1")));
    }

    #[test]
    fn test_quotes_are_literal() {
        let tsv = "osm_type\tosm_id\tname\nnode\t1\t\"Foo\"\n";
        let store = load_tsv(tsv.as_bytes()).unwrap();
        assert_eq!(store.get(EntityKind::Node, 1).unwrap()["name"], "\"Foo\"");
    }

    #[test]
    fn test_duplicate_rows_last_wins() {
        let tsv = "osm_type\tosm_id\tname\nnode\t1\tA\nnode\t1\tB\n";
        let store = load_tsv(tsv.as_bytes()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(EntityKind::Node, 1).unwrap()["name"], "B");
    }
}
