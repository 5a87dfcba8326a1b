//! TSV export.

use std::io::Write;

use csv::{QuoteStyle, WriterBuilder};

use super::{DELIMITER, OSM_ID_COLUMN, OSM_TYPE_COLUMN};
use crate::error::{Error, Result};
use crate::object::{EntityKind, OsmObject};
use crate::xml::ObjectSink;

/// Options controlling which rows are exported.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Kinds to export. Objects of other kinds are skipped silently.
    pub kinds: Vec<EntityKind>,
    /// Skip rows whose tag columns are all empty.
    pub skip_empty: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            kinds: EntityKind::ALL.to_vec(),
            skip_empty: false,
        }
    }
}

impl ExportOptions {
    pub fn allows(&self, kind: EntityKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Row counters of one export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub written: usize,
    pub filtered_by_kind: usize,
    pub skipped_empty: usize,
}

/// Sink that writes one TSV row per accepted object.
pub struct TsvWriter<W: Write> {
    writer: csv::Writer<W>,
    columns: Vec<String>,
    options: ExportOptions,
    stats: ExportStats,
}

impl<W: Write> TsvWriter<W> {
    /// Creates the writer and emits the header line.
    ///
    /// The same column order is used for the header and every row.
    pub fn new(writer: W, columns: Vec<String>, options: ExportOptions) -> Result<Self> {
        let mut writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .quote_style(QuoteStyle::Never)
            .from_writer(writer);

        let header = [OSM_TYPE_COLUMN, OSM_ID_COLUMN]
            .into_iter()
            .chain(columns.iter().map(String::as_str));
        writer.write_record(header)?;

        Ok(TsvWriter {
            writer,
            columns,
            options,
            stats: ExportStats::default(),
        })
    }

    /// Flushes the output and returns the underlying writer with the counters.
    pub fn finish(self) -> Result<(W, ExportStats)> {
        let stats = self.stats;
        let inner = self
            .writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        Ok((inner, stats))
    }
}

impl<W: Write> ObjectSink for TsvWriter<W> {
    fn add(&mut self, object: OsmObject) -> Result<()> {
        if !self.options.allows(object.kind) {
            self.stats.filtered_by_kind += 1;
            return Ok(());
        }

        let values: Vec<&str> = self
            .columns
            .iter()
            .map(|column| object.tags.get(column).map_or("", String::as_str))
            .collect();

        // Identity columns never count towards emptiness
        if self.options.skip_empty && values.iter().all(|value| value.is_empty()) {
            self.stats.skipped_empty += 1;
            return Ok(());
        }

        let id = object.id.to_string();
        let row = [object.kind.as_str(), id.as_str()]
            .into_iter()
            .chain(values);
        self.writer.write_record(row)?;
        self.stats.written += 1;
        Ok(())
    }
}
