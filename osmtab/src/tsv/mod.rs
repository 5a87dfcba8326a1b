//! Tab separated tag tables.
//!
//! A table has one header line, `osm_type<TAB>osm_id<TAB>key...`, and one
//! line per object. Fields are written and read raw: there is no quoting, so
//! tag values containing tabs or line breaks cannot be represented.

mod reader;
mod writer;

pub use reader::{load_tsv, load_tsv_into_store, TsvHeader};
pub use writer::{ExportOptions, ExportStats, TsvWriter};

/// Reserved column holding the object kind.
pub const OSM_TYPE_COLUMN: &str = "osm_type";

/// Reserved column holding the object id.
pub const OSM_ID_COLUMN: &str = "osm_id";

/// Field separator.
pub const DELIMITER: u8 = b'\t';
