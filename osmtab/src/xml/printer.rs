//! Changefile XML printer.
//!
//! Writes the line-oriented layout of JOSM changefiles: one element per
//! line, objects indented by one space and their children by two.

use std::borrow::Cow;
use std::io::{self, Write};

use quick_xml::escape::escape;

/// Low-level writer for changefile elements.
pub struct ChangefilePrinter<W: Write> {
    writer: W,
}

impl<W: Write> ChangefilePrinter<W> {
    /// Creates a new printer.
    pub fn new(writer: W) -> Self {
        ChangefilePrinter { writer }
    }

    /// Writes the XML declaration and the opening `<osm>` element.
    pub fn start_document(&mut self, generator: &str) -> io::Result<()> {
        writeln!(self.writer, "<?xml version='1.0' encoding='UTF-8'?>")?;
        writeln!(
            self.writer,
            "<osm version='0.6' upload='true' generator='{}'>",
            escape_attr(generator)
        )
    }

    /// Writes a start tag, or a self-closed element when `closed` is set.
    ///
    /// Attributes are written in the given order; `None` values are left out.
    pub fn element(
        &mut self,
        name: &str,
        attrs: &[(&str, Option<&str>)],
        closed: bool,
        indent: usize,
    ) -> io::Result<()> {
        let mut tag = String::new();
        tag.push_str(&indent_str(indent));
        tag.push('<');
        tag.push_str(name);
        for (key, value) in attrs {
            if let Some(value) = value {
                tag.push(' ');
                tag.push_str(key);
                tag.push_str("=\"");
                tag.push_str(&escape_attr(value));
                tag.push('"');
            }
        }
        tag.push_str(if closed { " />" } else { ">" });
        writeln!(self.writer, "{}", tag)
    }

    /// Writes an end tag.
    pub fn end_element(&mut self, name: &str, indent: usize) -> io::Result<()> {
        writeln!(self.writer, "{}</{}>", indent_str(indent), name)
    }

    /// Closes the `<osm>` element and flushes.
    pub fn end_document(&mut self) -> io::Result<()> {
        writeln!(self.writer, "</osm>")?;
        self.writer.flush()
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn indent_str(level: usize) -> String {
    " ".repeat(level)
}

/// Escapes a value for use inside a quoted attribute.
///
/// Besides the five predefined entities, tabs and line breaks are written as
/// character references so that a reader does not normalize them to spaces.
pub fn escape_attr(value: &str) -> Cow<'_, str> {
    let escaped = escape(value);
    if !escaped.contains(['\t', '\n', '\r']) {
        return escaped;
    }
    let mut result = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        match c {
            '\t' => result.push_str("&#9;"),
            '\n' => result.push_str("&#10;"),
            '\r' => result.push_str("&#13;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}
