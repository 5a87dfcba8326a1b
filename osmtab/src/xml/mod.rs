//! OSM XML reading and changefile printing.
//!
//! The parser streams an OSM XML document and hands every completed object
//! to an [`ObjectSink`]. The printer writes the element layout used by JOSM
//! changefiles.

mod parser;
mod printer;

pub use parser::{parse_file, parse_reader, parse_str, OsmParser};
pub use printer::{escape_attr, ChangefilePrinter};

use crate::error::Result;
use crate::object::OsmObject;

/// Consumer of parsed objects.
///
/// Every pass over an OSM document drives exactly one sink: column
/// discovery, TSV export, store loading and changefile synthesis are all
/// sinks.
pub trait ObjectSink {
    /// Receives one fully populated object.
    fn add(&mut self, object: OsmObject) -> Result<()>;
}

impl<S: ObjectSink + ?Sized> ObjectSink for &mut S {
    fn add(&mut self, object: OsmObject) -> Result<()> {
        (**self).add(object)
    }
}

/// Collects objects in document order.
impl ObjectSink for Vec<OsmObject> {
    fn add(&mut self, object: OsmObject) -> Result<()> {
        self.push(object);
        Ok(())
    }
}
