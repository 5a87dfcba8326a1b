//! JOSM changefile synthesis.
//!
//! Every object of the original document is written back. Objects whose
//! merged tags differ from the original get the merged tags and
//! `action="modify"`; all others are written with their original tags and
//! action.

use std::io::{BufRead, Write};

use tracing::{debug, trace};

use super::{MergePolicy, Reconciliation};
use crate::error::Result;
use crate::object::{OsmObject, Tags};
use crate::store::AttributeStore;
use crate::xml::{self, ChangefilePrinter, ObjectSink};

/// Value of the `generator` attribute of the `<osm>` element.
pub const GENERATOR: &str = "osmtab";

/// Action forced onto changed objects, whatever their original action.
pub const MODIFY_ACTION: &str = "modify";

/// Object counters of one changefile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeStats {
    pub modified: usize,
    pub unchanged: usize,
}

/// Sink that writes a changefile from objects and edited records.
pub struct ChangefileWriter<'s, W: Write> {
    store: &'s AttributeStore,
    policy: MergePolicy,
    printer: ChangefilePrinter<W>,
    stats: ChangeStats,
}

impl<'s, W: Write> ChangefileWriter<'s, W> {
    /// Creates the writer and emits the document header.
    pub fn new(store: &'s AttributeStore, policy: MergePolicy, writer: W) -> Result<Self> {
        let mut printer = ChangefilePrinter::new(writer);
        printer.start_document(GENERATOR)?;
        Ok(ChangefileWriter {
            store,
            policy,
            printer,
            stats: ChangeStats::default(),
        })
    }

    /// Closes the document and returns the writer with the counters.
    pub fn finish(mut self) -> Result<(W, ChangeStats)> {
        self.printer.end_document()?;
        Ok((self.printer.into_inner(), self.stats))
    }

    fn write_object(
        &mut self,
        object: &OsmObject,
        tags: &Tags,
        action: Option<&str>,
    ) -> Result<()> {
        let name = object.kind.as_str();
        let simple = tags.is_empty() && object.nodes.is_empty() && object.members.is_empty();

        let id = object.id.to_string();
        let meta = &object.metadata;
        let attrs = [
            ("id", Some(id.as_str())),
            ("timestamp", meta.timestamp.as_deref()),
            ("uid", meta.uid.as_deref()),
            ("user", meta.user.as_deref()),
            ("visible", meta.visible.as_deref()),
            ("version", meta.version.as_deref()),
            ("changeset", meta.changeset.as_deref()),
            ("lat", object.lat.as_deref()),
            ("lon", object.lon.as_deref()),
            ("action", action),
        ];
        self.printer.element(name, &attrs, simple, 1)?;
        if simple {
            return Ok(());
        }

        for node in &object.nodes {
            self.printer
                .element("nd", &[("ref", Some(node.as_str()))], true, 2)?;
        }
        for member in &object.members {
            self.printer.element(
                "member",
                &[
                    ("type", Some(member.kind.as_str())),
                    ("ref", Some(member.reference.as_str())),
                    ("role", Some(member.role.as_str())),
                ],
                true,
                2,
            )?;
        }
        for (key, value) in tags {
            self.printer.element(
                "tag",
                &[("k", Some(key.as_str())), ("v", Some(value.as_str()))],
                true,
                2,
            )?;
        }

        self.printer.end_element(name, 1)?;
        Ok(())
    }
}

impl<W: Write> ObjectSink for ChangefileWriter<'_, W> {
    fn add(&mut self, object: OsmObject) -> Result<()> {
        let record = self.store.get(object.kind, object.id);
        match self.policy.reconcile(&object.tags, record) {
            Reconciliation::Modified(tags) => {
                trace!(object = %object.key(), "tags changed");
                self.stats.modified += 1;
                self.write_object(&object, &tags, Some(MODIFY_ACTION))
            }
            Reconciliation::Unchanged => {
                self.stats.unchanged += 1;
                self.write_object(&object, &object.tags, object.metadata.action.as_deref())
            }
        }
    }
}

/// Streams `osm` through a [`ChangefileWriter`] into `output`.
pub fn write_changefile<R: BufRead, W: Write>(
    osm: R,
    store: &AttributeStore,
    policy: MergePolicy,
    output: W,
) -> Result<ChangeStats> {
    let mut writer = ChangefileWriter::new(store, policy, output)?;
    xml::parse_reader(osm, &mut writer)?;
    let (_, stats) = writer.finish()?;
    debug!(modified = stats.modified, unchanged = stats.unchanged, "changefile written");
    Ok(stats)
}
