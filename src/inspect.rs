//! Human-readable reports about a closed output file.

use crate::error::OutputError;
use crate::store::format::RegistryKind;
use crate::store::{FileReader, TableId};
use crate::types::RecordCategory;
use std::fmt::{self, Write as _};
use std::io::{Read, Seek};

/// How range sets are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStyle {
    /// Every stored record and segment with its id.
    Full,
    /// Per category, one `run N: a-b,c` line per run.
    Compact,
}

/// Runs `body` against a fresh buffer.
fn render(body: impl FnOnce(&mut String) -> fmt::Result) -> Result<String, OutputError> {
    let mut out = String::new();
    body(&mut out)
        .map_err(|e| OutputError::InternalError(format!("Failed to format report: {}", e)))?;
    Ok(out)
}

/// One line per event: `run subrun event`.
pub fn event_list<R: Read + Seek>(reader: &mut FileReader<R>) -> Result<String, OutputError> {
    let index = reader.file_index()?;
    render(|out| {
        for entry in index.entries_for(RecordCategory::Event) {
            writeln!(
                out,
                "{:>8} {:>8} {:>10}",
                entry.key.run,
                entry.key.subrun.unwrap_or(0),
                entry.key.event.unwrap_or(0)
            )?;
        }
        Ok(())
    })
}

/// The file index in write order, with the row counts of every table.
pub fn file_index_listing<R: Read + Seek>(
    reader: &mut FileReader<R>,
) -> Result<String, OutputError> {
    let index = reader.file_index()?;
    let rows = RecordCategory::ALL.map(|c| (c, reader.entry_count(TableId::Records(c))));
    render(|out| {
        for (category, count) in rows {
            writeln!(out, "{:<8} rows: {}", category.to_string(), count)?;
        }
        for entry in index.entries() {
            writeln!(
                out,
                "{:<8} {:<16} entry {}",
                entry.category.to_string(),
                entry.key.to_string(),
                entry.entry
            )?;
        }
        Ok(())
    })
}

/// Every persisted column per category: id, name, type and producing process.
pub fn column_ids<R: Read + Seek>(reader: &mut FileReader<R>) -> Result<String, OutputError> {
    let schema = reader.schema()?;
    render(|out| {
        for category in RecordCategory::ALL {
            let columns = &schema.columns[category];
            if columns.is_empty() {
                continue;
            }
            writeln!(out, "{}:", category)?;
            for column in columns {
                writeln!(
                    out,
                    "{:>6} {:<32} {:<12} {}",
                    column.id.0,
                    column.name,
                    column.data_type.to_string(),
                    column.process_name
                )?;
            }
        }
        Ok(())
    })
}

pub fn range_sets<R: Read + Seek>(
    reader: &mut FileReader<R>,
    style: RangeStyle,
) -> Result<String, OutputError> {
    let registry = reader.range_sets()?;
    render(|out| match style {
        RangeStyle::Full => {
            for record in &registry.records {
                writeln!(
                    out,
                    "{} #{} (entry {}): {}",
                    record.category, record.id, record.entry, record.ranges
                )?;
            }
            for segment in &registry.segments {
                writeln!(
                    out,
                    "input file {} {}: {}",
                    segment.input_file, segment.category, segment.ranges
                )?;
            }
            Ok(())
        }
        RangeStyle::Compact => {
            for category in [RecordCategory::SubRun, RecordCategory::Run] {
                let coverage = registry.coverage(category);
                if !coverage.is_empty() {
                    writeln!(out, "{}:\n{}", category, coverage.to_compact_string())?;
                }
            }
            Ok(())
        }
    })
}

pub fn process_history<R: Read + Seek>(reader: &mut FileReader<R>) -> Result<String, OutputError> {
    let history = reader.process_history()?;
    render(|out| {
        for (i, process) in history.processes.iter().enumerate() {
            writeln!(
                out,
                "{}. {} ({}) pset {}",
                i + 1,
                process.process_name,
                process.release_version,
                process.parameter_set_id
            )?;
        }
        Ok(())
    })
}

/// Format, size and registry overview.
pub fn summary<R: Read + Seek>(reader: &mut FileReader<R>) -> Result<String, OutputError> {
    let format = reader.format_version().clone();
    let writer_version = reader.writer_version().to_string();
    let rows = RecordCategory::ALL.map(|c| (c, reader.entry_count(TableId::Records(c))));
    let has_lookup = reader.entry_count(TableId::Registry(RegistryKind::LookupIndex)) > 0;
    render(|out| {
        writeln!(out, "format {} ({}), written by {}", format.value, format.era, writer_version)?;
        for (category, count) in rows.into_iter().filter(|(_, n)| *n > 0) {
            writeln!(out, "{}s: {}", category, count)?;
        }
        writeln!(out, "lookup index: {}", if has_lookup { "yes" } else { "no" })
    })
}
