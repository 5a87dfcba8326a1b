//! osmtab - spreadsheet editing of OpenStreetMap tags
//!
//! This library converts the tags of an OSM XML document into a tab
//! separated table and turns an edited copy of that table back into a
//! JOSM changefile.
//!
//! # Overview
//!
//! Export streams the document once to discover tag keys (see
//! [`columns`]) and once more to write rows (see [`tsv::TsvWriter`]).
//!
//! Import loads the edited table into an [`AttributeStore`], then streams
//! the original document through a [`ChangefileWriter`]. Objects whose tags
//! differ after merging their edited row are written with
//! `action="modify"`; everything else is written back untouched.
//!
//! # Editing rules
//!
//! - a value in the table replaces the original value of that key;
//! - a blank cell removes the key;
//! - columns starting with a configured ignore prefix are never applied;
//! - objects without a row are left as they are.

pub mod columns;
pub mod error;
pub mod merge;
pub mod object;
pub mod store;
pub mod tsv;
pub mod xml;

// Re-export commonly used types
pub use columns::{detect_columns, detect_columns_from_reader, ColumnDetector};
pub use error::{Error, Result};
pub use merge::{
    write_changefile, ChangeStats, ChangefileWriter, MergePolicy, Reconciliation, GENERATOR,
    MODIFY_ACTION,
};
pub use object::{EntityKind, Member, Metadata, ObjectKey, OsmObject, Tags};
pub use store::{load_xml_into_store, load_xml_reader_into_store, AttributeStore, StoreLoader};
pub use tsv::{load_tsv, load_tsv_into_store, ExportOptions, ExportStats, TsvWriter};
pub use xml::{parse_file, parse_reader, parse_str, ObjectSink, OsmParser};
