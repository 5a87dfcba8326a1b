//! Streaming OSM XML parser.
//!
//! This parser uses quick-xml's pull API. Objects are accumulated in an
//! [`ObjectBuilder`] owned by the parse loop and emitted on their end tag,
//! so a sink never sees a partially populated object.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::ObjectSink;
use crate::error::{Error, Result};
use crate::object::{EntityKind, Member, OsmObject};

/// An element name with its unescaped attributes.
struct Element {
    name: String,
    attributes: HashMap<String, String>,
}

impl Element {
    fn take(&mut self, attr: &str) -> Option<String> {
        self.attributes.remove(attr)
    }

    fn required(&mut self, attr: &str, position: u64) -> Result<String> {
        self.take(attr).ok_or_else(|| {
            Error::Parse(format!(
                "<{}> without required attribute '{}' at byte {}",
                self.name, attr, position
            ))
        })
    }

    fn required_id(&mut self, attr: &str, position: u64) -> Result<i64> {
        let raw = self.required(attr, position)?;
        raw.trim().parse().map_err(|_| self.non_integer(attr, &raw, position))
    }

    /// Like [`Element::required_id`], but keeps the text as written.
    fn required_ref(&mut self, attr: &str, position: u64) -> Result<String> {
        let raw = self.required(attr, position)?;
        match raw.trim().parse::<i64>() {
            Ok(_) => Ok(raw),
            Err(_) => Err(self.non_integer(attr, &raw, position)),
        }
    }

    fn non_integer(&self, attr: &str, raw: &str, position: u64) -> Error {
        Error::Parse(format!(
            "<{}> has non-integer {}=\"{}\" at byte {}",
            self.name, attr, raw, position
        ))
    }
}

fn object_kind(name: &str) -> Option<EntityKind> {
    name.parse().ok()
}

/// The object currently being read, if any.
#[derive(Default)]
struct ObjectBuilder {
    current: Option<OsmObject>,
}

impl ObjectBuilder {
    /// Handles a start (or self-closed) element.
    fn open(&mut self, mut element: Element, position: u64) -> Result<()> {
        if let Some(kind) = object_kind(&element.name) {
            if let Some(outer) = &self.current {
                return Err(Error::Parse(format!(
                    "<{}> nested inside {} at byte {}",
                    element.name,
                    outer.key(),
                    position
                )));
            }
            let mut object = OsmObject::new(kind, element.required_id("id", position)?);
            let metadata = &mut object.metadata;
            metadata.timestamp = element.take("timestamp");
            metadata.user = element.take("user");
            metadata.uid = element.take("uid");
            metadata.version = element.take("version");
            metadata.changeset = element.take("changeset");
            metadata.visible = element.take("visible");
            metadata.action = element.take("action");
            if kind == EntityKind::Node {
                object.lat = element.take("lat");
                object.lon = element.take("lon");
            }
            self.current = Some(object);
            return Ok(());
        }

        match element.name.as_str() {
            "tag" => {
                let key = element.required("k", position)?;
                let value = element.required("v", position)?;
                self.current_of("tag", None, position)?
                    .tags
                    .insert(key, value);
            }
            "nd" => {
                let reference = element.required_ref("ref", position)?;
                self.current_of("nd", Some(EntityKind::Way), position)?
                    .nodes
                    .push(reference);
            }
            "member" => {
                let kind = element.required("type", position)?.parse()?;
                let reference = element.required_ref("ref", position)?;
                let role = element.take("role").unwrap_or_default();
                self.current_of("member", Some(EntityKind::Relation), position)?
                    .members
                    .push(Member::new(kind, reference, role));
            }
            // <osm>, <bounds>, <changeset> and friends carry no object data
            _ => {}
        }
        Ok(())
    }

    /// Handles an end element, returning the object it completes.
    fn close(&mut self, name: &str) -> Option<OsmObject> {
        let kind = object_kind(name)?;
        if self.current.as_ref().is_some_and(|object| object.kind == kind) {
            self.current.take()
        } else {
            None
        }
    }

    fn current_of(
        &mut self,
        child: &str,
        parent: Option<EntityKind>,
        position: u64,
    ) -> Result<&mut OsmObject> {
        match self.current.as_mut() {
            Some(object) if parent.is_none_or(|kind| kind == object.kind) => Ok(object),
            Some(object) => Err(Error::Parse(format!(
                "<{}> not allowed inside {} at byte {}",
                child,
                object.key(),
                position
            ))),
            None => Err(Error::Parse(format!(
                "<{}> outside of any node, way or relation at byte {}",
                child, position
            ))),
        }
    }
}

/// Streaming parser that feeds a sink.
pub struct OsmParser<S: ObjectSink> {
    sink: S,
}

impl<S: ObjectSink> OsmParser<S> {
    /// Creates a new parser that emits into `sink`.
    pub fn new(sink: S) -> Self {
        OsmParser { sink }
    }

    /// Returns the sink, consuming the parser.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Parses XML from a string. Returns the number of objects emitted.
    pub fn parse_str(&mut self, xml: &str) -> Result<usize> {
        let mut reader = Reader::from_str(xml);
        self.parse_events(&mut reader)
    }

    /// Parses XML from a file.
    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let file = File::open(path)?;
        self.parse_reader(BufReader::new(file))
    }

    /// Parses XML from any buffered reader.
    pub fn parse_reader<R: BufRead>(&mut self, input: R) -> Result<usize> {
        let mut reader = Reader::from_reader(input);
        self.parse_events(&mut reader)
    }

    fn parse_events<R: BufRead>(&mut self, reader: &mut Reader<R>) -> Result<usize> {
        let mut builder = ObjectBuilder::default();
        let mut buf = Vec::new();
        let mut emitted = 0usize;

        loop {
            let position = reader.buffer_position();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let element = parse_element(e, reader)?;
                    builder.open(element, position)?;
                }
                Ok(Event::Empty(ref e)) => {
                    // Self-closing tag: open and close in one step
                    let element = parse_element(e, reader)?;
                    let name = element.name.clone();
                    builder.open(element, position)?;
                    if let Some(object) = builder.close(&name) {
                        self.sink.add(object)?;
                        emitted += 1;
                    }
                }
                Ok(Event::End(ref e)) => {
                    let name = reader
                        .decoder()
                        .decode(e.name().as_ref())
                        .map_err(|e| Error::Parse(e.to_string()))?
                        .into_owned();
                    if let Some(object) = builder.close(&name) {
                        self.sink.add(object)?;
                        emitted += 1;
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::Parse(format!(
                        "{} at byte {}",
                        e,
                        reader.error_position()
                    )))
                }
            }
            buf.clear();
        }

        if let Some(object) = builder.current {
            return Err(Error::Parse(format!(
                "document ended inside {}",
                object.key()
            )));
        }

        debug!(objects = emitted, "finished OSM XML pass");
        Ok(emitted)
    }
}

/// Parses an element's name and attributes.
fn parse_element<R>(e: &BytesStart, reader: &Reader<R>) -> Result<Element> {
    let name = reader
        .decoder()
        .decode(e.name().as_ref())
        .map_err(|e| Error::Parse(e.to_string()))?
        .into_owned();

    let mut attributes = HashMap::new();
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| Error::Parse(format!("attribute error: {}", e)))?;
        let key = reader
            .decoder()
            .decode(attr.key.as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Parse(e.to_string()))?
            .into_owned();
        attributes.insert(key, value);
    }

    Ok(Element { name, attributes })
}

/// Parses an OSM file into `sink`.
pub fn parse_file<P: AsRef<Path>, S: ObjectSink>(path: P, sink: S) -> Result<usize> {
    OsmParser::new(sink).parse_file(path)
}

/// Parses OSM XML from a string into `sink`.
pub fn parse_str<S: ObjectSink>(xml: &str, sink: S) -> Result<usize> {
    OsmParser::new(sink).parse_str(xml)
}

/// Parses OSM XML from a buffered reader into `sink`.
pub fn parse_reader<R: BufRead, S: ObjectSink>(input: R, sink: S) -> Result<usize> {
    OsmParser::new(sink).parse_reader(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(xml: &str) -> Result<Vec<OsmObject>> {
        let mut objects = Vec::new();
        parse_str(xml, &mut objects)?;
        Ok(objects)
    }

    #[test]
    fn test_parse_node_with_metadata() {
        let xml = r#"<?xml version="1.0"?>
<osm version="0.6">
 <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
 <node id="1" lat="50.1" lon="14.2" version="3" user="alice" uid="42"
       changeset="9" timestamp="2020-01-01T00:00:00Z" visible="true">
  <tag k="name" v="Foo &amp; Bar"/>
  <tag k="amenity" v="cafe"/>
 </node>
</osm>"#;
        let objects = parse(xml).unwrap();
        assert_eq!(objects.len(), 1);

        let node = &objects[0];
        assert_eq!(node.kind, EntityKind::Node);
        assert_eq!(node.id, 1);
        assert_eq!(node.lat.as_deref(), Some("50.1"));
        assert_eq!(node.lon.as_deref(), Some("14.2"));
        assert_eq!(node.metadata.user.as_deref(), Some("alice"));
        assert_eq!(node.metadata.version.as_deref(), Some("3"));
        assert_eq!(node.metadata.action, None);
        assert_eq!(node.tags.get("name").map(String::as_str), Some("Foo & Bar"));
        let keys: Vec<_> = node.tags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "amenity"]);
    }

    #[test]
    fn test_parse_self_closed_node() {
        let objects = parse(r#"<osm><node id="5" lat="1" lon="2" action="delete"/></osm>"#).unwrap();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].tags.is_empty());
        assert_eq!(objects[0].metadata.action.as_deref(), Some("delete"));
    }

    #[test]
    fn test_way_keeps_node_order() {
        let xml = r#"<osm><way id="10"><nd ref="3"/><nd ref="1"/><nd ref="2"/><nd ref="3"/></way></osm>"#;
        let objects = parse(xml).unwrap();
        assert_eq!(objects[0].nodes, vec!["3", "1", "2", "3"]);
    }

    #[test]
    fn test_refs_keep_their_text() {
        let xml = r#"<osm>
            <way id="1"><nd ref="007"/><nd ref="+5"/></way>
            <relation id="2"><member type="node" ref="-03" role="stop"/></relation>
        </osm>"#;
        let objects = parse(xml).unwrap();
        assert_eq!(objects[0].nodes, vec!["007", "+5"]);
        assert_eq!(objects[1].members[0].reference, "-03");
    }

    #[test]
    fn test_non_integer_ref_fails() {
        let err = parse(r#"<osm><way id="1"><nd ref="x1"/></way></osm>"#).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("x1")));
    }

    #[test]
    fn test_relation_members() {
        let xml = r#"<osm><relation id="-4">
            <member type="way" ref="10" role="outer"/>
            <member type="node" ref="1" role=""/>
            <tag k="type" v="multipolygon"/>
        </relation></osm>"#;
        let objects = parse(xml).unwrap();
        let relation = &objects[0];
        assert_eq!(relation.id, -4);
        assert_eq!(
            relation.members,
            vec![
                Member::new(EntityKind::Way, "10", "outer"),
                Member::new(EntityKind::Node, "1", ""),
            ]
        );
    }

    #[test]
    fn test_duplicate_tag_last_wins() {
        let xml = r#"<osm><node id="1"><tag k="a" v="1"/><tag k="a" v="2"/></node></osm>"#;
        let objects = parse(xml).unwrap();
        assert_eq!(objects[0].tags.len(), 1);
        assert_eq!(objects[0].tags["a"], "2");
    }

    #[test]
    fn test_same_id_different_kinds() {
        let xml = r#"<osm><node id="1"/><way id="1"/><relation id="1"/></osm>"#;
        let kinds: Vec<_> = parse(xml).unwrap().iter().map(|o| o.kind).collect();
        assert_eq!(kinds, EntityKind::ALL.to_vec());
    }

    #[test]
    fn test_tag_outside_object_fails() {
        let err = parse(r#"<osm><tag k="a" v="b"/></osm>"#).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("outside")));
    }

    #[test]
    fn test_nested_object_fails() {
        let err = parse(r#"<osm><way id="1"><node id="2"/></way></osm>"#).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("nested")));
    }

    #[test]
    fn test_nd_inside_node_fails() {
        let err = parse(r#"<osm><node id="1"><nd ref="2"/></node></osm>"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_non_integer_id_fails() {
        let err = parse(r#"<osm><node id="abc"/></osm>"#).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("abc")));
    }

    #[test]
    fn test_missing_id_fails() {
        assert!(parse(r#"<osm><way/></osm>"#).is_err());
    }

    #[test]
    fn test_unknown_member_type_fails() {
        let xml = r#"<osm><relation id="1"><member type="area" ref="1" role=""/></relation></osm>"#;
        assert!(matches!(parse(xml).unwrap_err(), Error::InvalidKind(_)));
    }

    #[test]
    fn test_mismatched_end_tag_fails() {
        assert!(parse(r#"<osm><node id="1"></way></osm>"#).is_err());
    }

    #[test]
    fn test_unterminated_object_fails() {
        let mut objects = Vec::new();
        let err = parse_str(r#"<osm><node id="1"><tag k="a" v="b"/>"#, &mut objects).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg == "document ended inside node 1"));
        assert!(objects.is_empty());
    }

    #[test]
    fn test_member_outside_relation_fails() {
        let xml = r#"<osm><way id="1"><member type="node" ref="2" role=""/></way></osm>"#;
        let err = parse(xml).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("not allowed inside way 1")));

        let err = parse(r#"<osm><member type="node" ref="2" role=""/></osm>"#).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("outside")));
    }

    #[test]
    fn test_tag_without_key_or_value_fails() {
        let err = parse(r#"<osm><node id="1"><tag v="b"/></node></osm>"#).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("'k'")));

        let err = parse(r#"<osm><node id="1"><tag k="a"/></node></osm>"#).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("'v'")));
    }

    #[test]
    fn test_parser_returns_count_and_sink() {
        let mut parser = OsmParser::new(Vec::new());
        let count = parser
            .parse_str(r#"<osm><node id="1"/><node id="2"/></osm>"#)
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(parser.into_sink().len(), 2);
    }
}
