use super::*;
use crate::config::OutputSettings;
use crate::error::OutputError;
use crate::file_index::FileIndexEntry;
use crate::observability::init_test_logging;
use crate::policy::{ClosingCriteria, ClosureRequestMode};
use crate::registry::{ParameterSetRegistry, ProcessConfiguration, ProcessHistory};
use crate::selection::{SelectionRule, StrictMode};
use crate::store::format::FrameKind;
use crate::store::{FileReader, MemoryStoreFactory, TableId};
use crate::types::{ColumnDescriptor, ColumnId, Record, RecordCategory, RecordKey};
use arrow::array::{Array, ArrayRef, Int64Array};
use arrow_schema::DataType;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

//==================================================================================
// Fixtures
//==================================================================================

const HEADER: ColumnId = ColumnId(1);
const HITS: ColumnId = ColumnId(2);
const CALIB: ColumnId = ColumnId(3);
const POT: ColumnId = ColumnId(10);
const LUMI: ColumnId = ColumnId(20);
const SUMMARY: ColumnId = ColumnId(30);

fn schema() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new(1, RecordCategory::Event, "header", DataType::Int64)
            .mandatory()
            .produced_by("daq"),
        ColumnDescriptor::new(2, RecordCategory::Event, "hits", DataType::Int64)
            .produced_by("reco")
            .derived_from([HEADER]),
        ColumnDescriptor::new(3, RecordCategory::Event, "calib", DataType::Int64)
            .transient()
            .produced_by("reco"),
        ColumnDescriptor::new(10, RecordCategory::SubRun, "pot", DataType::Int64),
        ColumnDescriptor::new(20, RecordCategory::Run, "lumi", DataType::Int64),
        ColumnDescriptor::new(30, RecordCategory::Results, "summary", DataType::Int64),
    ]
}

fn process(name: &str) -> ProcessConfiguration {
    ProcessConfiguration {
        process_name: name.to_string(),
        release_version: "v2.1".to_string(),
        parameter_set_id: format!("pset-{}", name),
    }
}

fn context() -> StreamContext {
    StreamContext {
        schema: schema(),
        process: process("reco"),
        parameter_sets: ParameterSetRegistry::default(),
        catalog_entries: vec![("experiment".to_string(), "nova".to_string())],
    }
}

fn int(v: i64) -> ArrayRef {
    Arc::new(Int64Array::from(vec![v]))
}

fn event(n: u64) -> Record {
    Record::event(1, 1, n)
        .with_product(HEADER, int(n as i64))
        .with_product(HITS, int(10 * n as i64))
        .with_product(CALIB, int(-1))
}

fn open_stream(
    settings: OutputSettings,
) -> (OutputStream, MemoryStoreFactory, CollectingCatalog) {
    init_test_logging();
    let factory = MemoryStoreFactory::new();
    let catalog = CollectingCatalog::new();
    let stream = OutputStream::new(settings, context(), Arc::new(factory.clone()))
        .unwrap()
        .with_catalog(Box::new(catalog.clone()));
    (stream, factory, catalog)
}

fn open(factory: &MemoryStoreFactory, path: impl AsRef<Path>) -> FileReader<Cursor<Vec<u8>>> {
    FileReader::new(factory.reader(path).unwrap()).unwrap()
}

/// Writes `events` events plus one subrun record into `input.evs`, uncompressed.
fn write_input(events: u64) -> MemoryStoreFactory {
    let settings =
        OutputSettings { compression_level: 0, ..Default::default() }.with_file_name("input.evs");
    let (input, factory, _) = open_stream(settings);
    for n in 1..=events {
        input.write(&event(n)).unwrap();
    }
    input.write(&Record::subrun(1, 1).with_product(POT, int(5))).unwrap();
    input.close().unwrap();
    factory
}

/// Reads the event rows of an input file back as unmodified records.
fn replay(reader: &mut FileReader<Cursor<Vec<u8>>>, input_file: u32) -> Vec<Record> {
    let entries: Vec<FileIndexEntry> = reader
        .file_index()
        .unwrap()
        .entries_for(RecordCategory::Event)
        .copied()
        .collect();
    entries
        .into_iter()
        .map(|e| {
            let mut record = Record::new(RecordCategory::Event, e.key);
            for (column, value) in reader.read_row(RecordCategory::Event, e.entry).unwrap() {
                record = record.with_carried_product(column, value);
            }
            record.with_source(reader.source_segment(e.entry, input_file).unwrap())
        })
        .collect()
}

fn input_layout(reader: &mut FileReader<Cursor<Vec<u8>>>) -> Vec<ColumnId> {
    reader.schema().unwrap().columns[RecordCategory::Event]
        .iter()
        .map(|c| c.id)
        .collect()
}

//==================================================================================
// Rotation
//==================================================================================

#[test]
fn test_max_events_rotation_writes_two_then_one() {
    let settings = OutputSettings::default()
        .with_file_name("out_%#.evs")
        .with_closing(ClosingCriteria::unset().with_max_events(2));
    let (stream, factory, catalog) = open_stream(settings);

    stream.write(&event(1)).unwrap();
    assert!(!stream.requests_to_close_file().should_close);
    stream.write(&event(2)).unwrap();

    let verdict = stream.requests_to_close_file();
    assert!(verdict.should_close);
    assert_eq!(verdict.reason, ClosureRequestMode::MaxEvents);

    stream.write(&event(3)).unwrap();
    assert_eq!(stream.closed_files(), vec![PathBuf::from("out_001.evs")]);
    assert_eq!(stream.current_file_name(), Some(PathBuf::from("out_002.evs")));
    stream.close().unwrap();

    let reports = catalog.reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].reason, ClosureRequestMode::MaxEvents);
    assert_eq!(reports[0].event_count, 2);
    assert_eq!(reports[1].event_count, 1);
    assert_eq!(reports[1].reason, ClosureRequestMode::Unset);

    let mut first = open(&factory, "out_001.evs");
    assert_eq!(first.file_index().unwrap().len(), 2);
    let mut second = open(&factory, "out_002.evs");
    let index = second.file_index().unwrap();
    assert_eq!(index.entries()[0].key, RecordKey::event(1, 1, 3));
    assert_eq!(index.entries()[0].entry, 0);
}

#[test]
fn test_requests_to_close_file_is_idempotent() {
    let settings =
        OutputSettings::default().with_closing(ClosingCriteria::unset().with_max_events(1));
    let (stream, _, _) = open_stream(settings);

    // Nothing open yet: nothing to close.
    assert_eq!(stream.requests_to_close_file(), stream.requests_to_close_file());
    stream.write(&event(1)).unwrap();

    let first = stream.requests_to_close_file();
    let second = stream.requests_to_close_file();
    assert_eq!(first, second);
    assert!(first.should_close);
    assert_eq!(stream.current_counters().unwrap().events, 1);
}

#[test]
fn test_input_file_boundary_closes_the_file() {
    let settings = OutputSettings::default()
        .with_closing(ClosingCriteria::unset().closing_at_input_file_boundary());
    let (stream, factory, catalog) = open_stream(settings);

    stream.begin_input_file(InputFileInfo::new("a.evs")).unwrap();
    stream.write(&event(1)).unwrap();
    stream.write(&Record::subrun(1, 1).with_product(POT, int(3))).unwrap();
    stream.respond_to_close_input_file().unwrap();

    stream.begin_input_file(InputFileInfo::new("b.evs")).unwrap();
    stream.write(&event(2)).unwrap();
    stream.close().unwrap();

    let reports = catalog.reports();
    assert_eq!(reports[0].reason, ClosureRequestMode::InputFileBoundary);
    assert_eq!(reports[0].stats.input_files, vec!["a.evs"]);
    assert_eq!(reports[1].stats.input_files, vec!["b.evs"]);

    let mut first = open(&factory, "output_001.evs");
    let range_sets = first.range_sets().unwrap();
    assert_eq!(range_sets.segments.len(), 1);
    assert_eq!(range_sets.segments[0].input_file, 1);
    assert!(range_sets.segments[0].ranges.contains(1, 1));
}

//==================================================================================
// Bulk Segment Copy
//==================================================================================

#[test]
fn test_first_record_of_a_segment_is_bulk_copied() {
    let input = write_input(2);
    let mut source = open(&input, "input.evs");

    let settings = OutputSettings::default().with_fast_cloning(true);
    let (stream, factory, catalog) = open_stream(settings);
    let layout = input_layout(&mut source);
    let eligible = stream
        .begin_input_file(InputFileInfo::new("input.evs").with_event_layout(layout))
        .unwrap();
    assert!(eligible);

    let records = replay(&mut source, stream.input_file_number());
    assert_eq!(stream.write(&records[0]).unwrap(), WriteMethod::Copied);
    stream.close().unwrap();

    let reports = catalog.reports();
    let stats = &reports[0].stats;
    assert_eq!(stats.columns_serialized, 0);
    assert_eq!(stats.rows_copied, 1);

    let mut out = open(&factory, "output_001.evs");
    let frames = out.frames(TableId::Records(RecordCategory::Event));
    assert_eq!(frames[0].kind, FrameKind::Copied);
    let row = out.read_row(RecordCategory::Event, 0).unwrap();
    let header = row[0].1.as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(header.value(0), 1);
}

#[test]
fn test_fast_clone_denied_for_size_rotation_and_foreign_layouts() {
    let settings = OutputSettings::default()
        .with_fast_cloning(true)
        .with_closing(ClosingCriteria::unset().with_max_size(1 << 20));
    let (sized, _, _) = open_stream(settings);
    let layout = vec![HEADER, HITS, CALIB];
    assert!(!sized
        .begin_input_file(InputFileInfo::new("a.evs").with_event_layout(layout.clone()))
        .unwrap());

    let (plain, _, _) = open_stream(OutputSettings::default());
    let input = |name: &str| InputFileInfo::new(name).with_event_layout(layout.clone());
    assert!(!plain
        .begin_input_file(InputFileInfo::new("b.evs").with_event_layout(vec![HEADER, HITS]))
        .unwrap());
    assert!(!plain.begin_input_file(input("c.evs").with_event_selection()).unwrap());
    assert!(!plain.begin_input_file(input("d.evs").with_fast_cloning_disabled()).unwrap());
    assert!(plain.begin_input_file(input("e.evs")).unwrap());
    assert!(plain.fast_clone_active());
}

#[test]
fn test_rotation_mid_segment_falls_back_to_serialization() {
    let input = write_input(3);
    let mut source = open(&input, "input.evs");
    let layout = input_layout(&mut source);

    let settings = OutputSettings::default()
        .with_fast_cloning(true)
        .with_closing(ClosingCriteria::unset().with_max_events(2));
    let (stream, factory, catalog) = open_stream(settings);
    assert!(stream
        .begin_input_file(InputFileInfo::new("input.evs").with_event_layout(layout.clone()))
        .unwrap());

    let records = replay(&mut source, stream.input_file_number());
    assert_eq!(stream.write(&records[0]).unwrap(), WriteMethod::Copied);
    assert_eq!(stream.write(&records[1]).unwrap(), WriteMethod::Copied);
    // The max-events rotation splits the segment.
    assert_eq!(stream.write(&records[2]).unwrap(), WriteMethod::Serialized);
    assert_eq!(stream.rotation_conflicts(), 1);
    assert!(!stream.fast_clone_active());

    // The next input file gets a fresh decision.
    stream.respond_to_close_input_file().unwrap();
    assert!(stream
        .begin_input_file(InputFileInfo::new("next.evs").with_event_layout(layout))
        .unwrap());
    stream.close().unwrap();

    let reports = catalog.reports();
    assert_eq!(reports[0].stats.rotation_conflicts, 1);
    assert_eq!(reports[0].stats.rows_copied, 2);
    assert_eq!(reports[1].stats.rows_copied, 0);

    let mut second = open(&factory, "output_002.evs");
    let frames = second.frames(TableId::Records(RecordCategory::Event));
    assert_eq!(frames[0].kind, FrameKind::Serialized);
}

//==================================================================================
// Record-Level Failures
//==================================================================================

#[test]
fn test_missing_mandatory_column_aborts_only_that_record() {
    let (stream, factory, _) = open_stream(OutputSettings::default());
    stream.write(&event(1)).unwrap();

    let no_header = Record::event(1, 1, 2).with_product(HITS, int(4));
    let err = stream.write(&no_header).unwrap_err();
    assert!(matches!(
        err,
        OutputError::MissingMandatoryColumn { ref column, .. } if column == "header"
    ));
    assert_eq!(stream.current_counters().unwrap().events, 1);
    assert!(!stream.is_aborted());

    stream.write(&event(3)).unwrap();
    assert_eq!(stream.current_counters().unwrap().events, 2);
    stream.close().unwrap();

    let mut reader = open(&factory, "output_001.evs");
    let index = reader.file_index().unwrap();
    let keys: Vec<RecordKey> = index.entries().iter().map(|e| e.key).collect();
    assert_eq!(keys, vec![RecordKey::event(1, 1, 1), RecordKey::event(1, 1, 3)]);
}

#[test]
fn test_strict_mode_refuses_dummy_values() {
    let (stream, _, _) = open_stream(OutputSettings::default());
    let stream = stream.with_missing_value_strategy(Box::new(StrictMode));

    let no_hits = Record::event(1, 1, 1)
        .with_product(HEADER, int(1))
        .with_product(CALIB, int(0));
    assert!(matches!(
        stream.write(&no_hits),
        Err(OutputError::MissingMandatoryColumn { .. })
    ));
}

#[test]
fn test_file_system_failure_is_fatal_for_the_stream() {
    // Learn how many bytes one open file with one event takes.
    let (sizing, _, _) = open_stream(OutputSettings::default());
    sizing.write(&event(1)).unwrap();
    let quota = sizing.current_counters().unwrap().size_bytes;

    let factory = MemoryStoreFactory::with_quota(quota);
    let stream =
        OutputStream::new(OutputSettings::default(), context(), Arc::new(factory)).unwrap();
    stream.write(&event(1)).unwrap();

    let err = stream.write(&event(2)).unwrap_err();
    assert!(matches!(err, OutputError::FileSystemFailure { .. }));
    assert!(stream.is_aborted());
    assert!(matches!(stream.write(&event(3)), Err(OutputError::StreamAborted(_))));
    assert!(matches!(stream.close(), Err(OutputError::StreamAborted(_))));
    assert!(matches!(
        stream.increment_input_file_number(),
        Err(OutputError::StreamAborted(_))
    ));
    assert!(matches!(
        stream.set_file_status(FileStatus::Switching),
        Err(OutputError::StreamAborted(_))
    ));
    assert_eq!(stream.input_file_number(), 0);
}

//==================================================================================
// Persisted Metadata
//==================================================================================

#[test]
fn test_provenance_and_index_agree_with_every_table() {
    let (stream, factory, _) = open_stream(OutputSettings::default());
    for n in 1..=3 {
        stream.write(&event(n)).unwrap();
    }
    stream.write(&Record::subrun(1, 1).with_product(POT, int(7))).unwrap();
    stream.write(&Record::run(1).with_product(LUMI, int(9))).unwrap();
    stream.close().unwrap();

    let mut reader = open(&factory, "output_001.evs");
    let index = reader.file_index().unwrap();
    let widths = [
        (RecordCategory::Event, 2),
        (RecordCategory::SubRun, 1),
        (RecordCategory::Run, 1),
    ];
    for (category, width) in widths {
        let entries: Vec<u64> = index.entries_for(category).map(|e| e.entry).collect();
        assert!(entries.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(entries.len() as u64, reader.entry_count(TableId::Records(category)));
        for entry in entries {
            let provenance = reader.provenance(category, entry).unwrap().unwrap();
            assert_eq!(provenance.len(), width);
        }
    }
}

#[test]
fn test_registries_are_written_on_close() {
    let settings =
        OutputSettings { data_tier: "reconstructed".to_string(), ..Default::default() };
    let (stream, factory, catalog) = open_stream(settings);
    let history = ProcessHistory { processes: vec![process("gen"), process("reco")] };
    stream
        .begin_input_file(InputFileInfo::new("gen.evs").with_process_history(history))
        .unwrap();
    stream.write(&event(4)).unwrap();
    stream.write(&event(2)).unwrap();
    stream.write(&Record::subrun(1, 1).with_product(POT, int(1))).unwrap();
    stream.respond_to_close_input_file().unwrap();
    stream.close().unwrap();

    let mut reader = open(&factory, "output_001.evs");
    let names: Vec<String> = reader
        .process_history()
        .unwrap()
        .processes
        .into_iter()
        .map(|p| p.process_name)
        .collect();
    assert_eq!(names, vec!["gen", "reco"]);

    let lookup = reader.lookup_table().unwrap().unwrap();
    assert_eq!(lookup.find(RecordCategory::Event, &RecordKey::event(1, 1, 2)), Some(1));
    assert_eq!(lookup.rows()[0].key, RecordKey::subrun(1, 1));

    let metadata = reader.catalog_metadata().unwrap();
    assert_eq!(metadata.get("experiment"), Some("nova"));
    assert_eq!(metadata.get("data_tier"), Some("reconstructed"));
    assert_eq!(metadata.get("event_count"), Some("2"));
    assert_eq!(metadata.get("parents"), Some("gen.evs"));

    let schema = reader.schema().unwrap();
    assert_eq!(schema.columns[RecordCategory::Event][0].process_name, "daq");
    assert!(reader.range_sets().unwrap().coverage(RecordCategory::SubRun).contains(1, 1));
    assert!(catalog.reports()[0].ranges.contains(1, 1));
}

#[test]
fn test_dropped_columns_are_not_written() {
    let settings = OutputSettings::default().with_selection(vec![SelectionRule::drop("hits")]);
    let (stream, factory, _) = open_stream(settings);
    stream.write(&event(1)).unwrap();
    stream.close().unwrap();

    let mut reader = open(&factory, "output_001.evs");
    let columns: Vec<ColumnId> = reader
        .read_row(RecordCategory::Event, 0)
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(columns, vec![HEADER, CALIB]);
    // Descriptors of dropped columns are kept unless asked otherwise.
    assert_eq!(reader.schema().unwrap().columns[RecordCategory::Event].len(), 3);
}

#[test]
fn test_dropped_column_descriptors_can_be_left_out() {
    let settings = OutputSettings {
        drop_metadata_for_dropped_data: true,
        ..Default::default()
    }
    .with_selection(vec![SelectionRule::drop("hits")]);
    let (stream, factory, _) = open_stream(settings);
    stream.write(&event(1)).unwrap();
    stream.close().unwrap();

    let mut reader = open(&factory, "output_001.evs");
    let schema = reader.schema().unwrap();
    let persisted: Vec<ColumnId> =
        schema.columns[RecordCategory::Event].iter().map(|c| c.id).collect();
    assert_eq!(persisted, vec![HEADER, CALIB]);
    // Nothing persisted depends on a dropped column any more.
    assert!(reader.product_dependencies().unwrap().dependencies.is_empty());
}

#[test]
fn test_results_records_are_indexed_without_range_sets() {
    let (stream, factory, catalog) = open_stream(OutputSettings::default());
    stream.write(&event(1)).unwrap();
    stream.write(&Record::results().with_product(SUMMARY, int(11))).unwrap();
    stream.write(&Record::results().with_product(SUMMARY, int(12))).unwrap();
    stream.close().unwrap();

    let report = &catalog.reports()[0];
    assert_eq!(report.event_count, 1);
    assert_eq!(report.stats.records[RecordCategory::Results], 2);
    assert!(report.ranges.is_empty());

    let mut reader = open(&factory, "output_001.evs");
    let index = reader.file_index().unwrap();
    let entries: Vec<u64> = index.entries_for(RecordCategory::Results).map(|e| e.entry).collect();
    assert_eq!(entries, vec![0, 1]);
    assert_eq!(reader.entry_count(TableId::Records(RecordCategory::Results)), 2);

    let range_sets = reader.range_sets().unwrap();
    assert!(range_sets.records.iter().all(|r| r.category != RecordCategory::Results));
    assert!(range_sets.coverage(RecordCategory::Results).is_empty());
    assert!(range_sets.segments.is_empty());

    let provenance = reader.provenance(RecordCategory::Results, 1).unwrap().unwrap();
    assert_eq!(provenance.len(), 1);
    assert_eq!(provenance[0].column, SUMMARY);
    let row = reader.read_row(RecordCategory::Results, 1).unwrap();
    let summary = row[0].1.as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(summary.value(0), 12);
}

#[test]
fn test_lineage_registries_are_written_on_close() {
    let (stream, factory, _) = open_stream(OutputSettings::default());
    let history = ProcessHistory { processes: vec![process("gen")] };
    stream
        .begin_input_file(InputFileInfo::new("gen.evs").with_process_history(history))
        .unwrap();
    stream.write(&event(1)).unwrap();
    stream.respond_to_close_input_file().unwrap();
    stream.write(&event(2)).unwrap();
    stream.close().unwrap();

    let mut reader = open(&factory, "output_001.evs");
    let parentage = reader.parentage().unwrap();
    assert_eq!(parentage.len(), 1);
    assert_eq!(parentage.get(0), Some(&[HEADER][..]));

    let provenance = reader.provenance(RecordCategory::Event, 0).unwrap().unwrap();
    let hits = provenance.iter().find(|e| e.column == HITS).unwrap();
    assert_eq!(hits.parentage, Some(0));
    let header = provenance.iter().find(|e| e.column == HEADER).unwrap();
    assert_eq!(header.parentage, None);

    let dependencies = reader.product_dependencies().unwrap();
    assert_eq!(dependencies.of(HITS), &[HEADER]);
    assert!(dependencies.of(HEADER).is_empty());

    let events = reader.event_history().unwrap();
    assert_eq!(events.events.len(), 2);
    assert_eq!(events.events[0].history_id, "gen/reco");
    assert_eq!(events.events[1].history_id, "reco");
    assert_eq!(events.history_of(1).unwrap().processes.len(), 1);
}

#[test]
fn test_basket_size_reaches_the_store() {
    let settings = OutputSettings { basket_size: 4096, ..Default::default() };
    let (stream, factory, _) = open_stream(settings);
    stream.write(&event(1)).unwrap();
    stream.close().unwrap();
    assert_eq!(factory.buffer_size("output_001.evs"), Some(4096));
}

//==================================================================================
// Locking and Status
//==================================================================================

#[test]
fn test_concurrent_producers_are_serialized() {
    let (stream, factory, catalog) = open_stream(OutputSettings::default());
    let stream = Arc::new(stream);

    let handles: Vec<_> = (0..4u64)
        .map(|worker| {
            let stream = Arc::clone(&stream);
            thread::spawn(move || {
                for i in 0..25u64 {
                    stream.write(&event(worker * 100 + i + 1)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    stream.close().unwrap();

    assert_eq!(catalog.reports()[0].event_count, 100);
    let mut reader = open(&factory, "output_001.evs");
    let index = reader.file_index().unwrap();
    let entries: Vec<u64> = index.entries().iter().map(|e| e.entry).collect();
    assert_eq!(entries, (0..100).collect::<Vec<u64>>());
}

#[test]
fn test_exclusive_section_reenters_the_lock() {
    let settings =
        OutputSettings::default().with_closing(ClosingCriteria::unset().with_max_events(1));
    let (stream, _, _) = open_stream(settings);

    let closed = stream.exclusive(|s| {
        s.write(&event(1)).unwrap();
        let verdict = s.requests_to_close_file();
        if verdict.should_close {
            s.close_file(verdict.reason).unwrap();
        }
        s.exclusive(|inner| inner.closed_files())
    });
    assert_eq!(closed.len(), 1);
    assert_eq!(stream.current_file_name(), None);
}

#[test]
fn test_file_status_and_limit_queries() {
    let settings = OutputSettings::default()
        .with_closing(ClosingCriteria::unset().with_max_events(10).with_max_size(4096));
    let (stream, _, _) = open_stream(settings);
    assert_eq!(stream.file_status(), FileStatus::Closed);

    stream.write(&event(1)).unwrap();
    assert_eq!(stream.file_status(), FileStatus::Opened);
    stream.set_file_status(FileStatus::Switching).unwrap();
    assert_eq!(stream.file_status(), FileStatus::Switching);

    assert!(stream.max_events_per_file_reached(10));
    assert!(!stream.max_events_per_file_reached(9));
    assert!(stream.max_size_reached(5000));
    assert!(!stream.max_size_reached(100));

    assert_eq!(stream.increment_input_file_number().unwrap(), 1);
    assert_eq!(stream.input_file_number(), 1);
    stream.close().unwrap();
    assert_eq!(stream.file_status(), FileStatus::Closed);
}
