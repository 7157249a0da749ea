// In: src/output/stream.rs

//! The file lifecycle manager of one output stream.
//!
//! `OutputStream` owns the file currently being written, decides when to
//! rotate it, writes the registries at open and close, reacts to input-file
//! transitions and hands closed files to the catalog.
//!
//! Every public call takes a reentrant lock for its whole duration. The
//! same thread may re-enter (e.g. `write` asks `requests_to_close_file`
//! before writing, and `exclusive` lets a caller chain several calls under
//! one acquisition); other threads wait. State lives in a `RefCell` behind
//! the lock and is never borrowed across a re-entering call.

use crate::config::OutputSettings;
use crate::error::OutputError;
use crate::output::catalog::{CatalogSink, ClosedFileReport};
use crate::output::output_file::OutputFile;
use crate::output::record_writer::{RecordWriter, WriteMethod};
use crate::policy::{
    ClosingPolicyEvaluator, ClosingVerdict, ClosureRequestMode, FastCloneDecisionEngine,
    FastCloneDenial, FileCounters,
};
use crate::registry::{
    CatalogMetadata, FormatRecord, ParameterSetRegistry, ProcessConfiguration, ProcessHistory,
    SchemaRegistry,
};
use crate::selection::{ColumnSelector, DummyValueCache, MissingValueStrategy, SelectionRules};
use crate::store::format::{FileFormatVersion, FILE_FORMAT_ERA};
use crate::store::{RegistryKind, StoreFactory};
use crate::types::{CategoryArray, ColumnDescriptor, ColumnId, Record, RecordCategory};
use chrono::Utc;
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::Arc;

//==================================================================================
// I. Inputs
//==================================================================================

/// What the stream is configured with, besides the settings.
#[derive(Debug, Clone)]
pub struct StreamContext {
    /// Every column the pipeline may produce.
    pub schema: Vec<ColumnDescriptor>,
    /// The process writing this stream; appended to the process history.
    pub process: ProcessConfiguration,
    pub parameter_sets: ParameterSetRegistry,
    /// Descriptive tags passed through to the catalog untouched.
    pub catalog_entries: Vec<(String, String)>,
}

/// Signalled when the pipeline opens a new input file.
#[derive(Debug, Clone)]
pub struct InputFileInfo {
    pub name: String,
    pub fast_cloning_globally_enabled: bool,
    /// `false` when the pipeline filters events of this input.
    pub want_all_events: bool,
    /// Column layout of the input's event rows; bulk copy needs it to match ours.
    pub event_layout: Option<Vec<ColumnId>>,
    pub process_history: ProcessHistory,
    pub parameter_sets: ParameterSetRegistry,
}

impl InputFileInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fast_cloning_globally_enabled: true,
            want_all_events: true,
            event_layout: None,
            process_history: ProcessHistory::default(),
            parameter_sets: ParameterSetRegistry::default(),
        }
    }

    pub fn with_event_layout(mut self, layout: Vec<ColumnId>) -> Self {
        self.event_layout = Some(layout);
        self
    }

    pub fn with_event_selection(mut self) -> Self {
        self.want_all_events = false;
        self
    }

    pub fn with_fast_cloning_disabled(mut self) -> Self {
        self.fast_cloning_globally_enabled = false;
        self
    }

    pub fn with_process_history(mut self, history: ProcessHistory) -> Self {
        self.process_history = history;
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Opened,
    Switching,
    Closed,
}

//==================================================================================
// II. Stream State
//==================================================================================

struct StreamState {
    settings: OutputSettings,
    factory: Arc<dyn StoreFactory>,
    catalog: Option<Box<dyn CatalogSink>>,
    writer: RecordWriter,
    schema_registry: SchemaRegistry,
    process: ProcessConfiguration,
    process_history: ProcessHistory,
    /// History of the events of the current input segment, ending in this process.
    segment_history: ProcessHistory,
    parameter_sets: ParameterSetRegistry,
    catalog_entries: Vec<(String, String)>,
    file: Option<OutputFile>,
    status: FileStatus,
    next_sequence: u32,
    input_file_number: u32,
    current_input: Option<String>,
    /// Rows of the current input segment written into the current file.
    segment_rows_in_file: u64,
    closed_files: Vec<PathBuf>,
    rotation_conflicts: u32,
    aborted: Option<String>,
}

impl StreamState {
    fn verdict(&self) -> ClosingVerdict {
        match &self.file {
            Some(file) => {
                ClosingPolicyEvaluator::evaluate(&file.counters(), &self.settings.closing)
            }
            None => ClosingVerdict {
                should_close: false,
                reason: ClosureRequestMode::Unset,
            },
        }
    }

    fn ensure_open(&mut self) -> Result<(), OutputError> {
        if self.file.is_some() {
            return Ok(());
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let path = self.settings.file_path(sequence);

        let store = self.factory.create(&path, self.settings.basket_size)?;
        let mut file = OutputFile::new(sequence, store);
        file.write_registry(
            RegistryKind::FormatVersion,
            &FormatRecord {
                format: FileFormatVersion::default(),
                writer_version: crate::VERSION.to_string(),
                split_level: self.settings.split_level,
            },
        )?;
        file.write_registry(RegistryKind::Schema, &self.schema_registry)?;

        log::info!(
            "Opened output file '{}' for stream '{}'",
            path.display(),
            self.settings.stream_name
        );
        self.segment_rows_in_file = 0;
        self.status = FileStatus::Opened;
        self.file = Some(file);
        Ok(())
    }

    fn write(&mut self, record: &Record) -> Result<WriteMethod, OutputError> {
        self.ensure_open()?;
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| OutputError::InternalError("no output file after open".into()))?;
        let method = self.writer.write_record(file, record)?;
        if record.category == RecordCategory::Event {
            file.record_event_history(&self.segment_history);
        }
        if let Some(name) = &self.current_input {
            if self.segment_rows_in_file == 0 {
                file.stats.note_input_file(name);
            }
            self.segment_rows_in_file += 1;
        }
        Ok(method)
    }

    fn switch(&mut self, reason: ClosureRequestMode) -> Result<(), OutputError> {
        self.status = FileStatus::Switching;
        if self.segment_rows_in_file > 0 && self.writer.disable_fast_clone() {
            self.rotation_conflicts += 1;
            if let Some(file) = self.file.as_mut() {
                file.stats.rotation_conflicts += 1;
            }
            log::warn!(
                "Closing on {} splits input file {}; \
                 its remaining events are written column by column",
                reason,
                self.input_file_number
            );
        }
        self.close_file(reason)
    }

    fn begin_input_file(&mut self, info: InputFileInfo) -> Result<bool, OutputError> {
        if self.current_input.is_some() {
            self.close_input_file();
        }
        self.input_file_number += 1;

        let layout = self.writer.selector().layout(RecordCategory::Event);
        let decision = FastCloneDecisionEngine::check(
            self.settings.fast_cloning_requested(),
            info.fast_cloning_globally_enabled,
            info.want_all_events,
            &self.settings.closing,
        )
        .and_then(|()| match info.event_layout.as_deref() {
            Some(input_layout) if input_layout == layout.as_slice() => Ok(()),
            _ => Err(FastCloneDenial::IncompatibleLayout),
        });
        let eligible = match decision {
            Ok(()) => {
                log::info!("Fast cloning enabled for input file '{}'", info.name);
                true
            }
            Err(denial)
                if self.settings.fast_cloning_set_by_user()
                    && denial != FastCloneDenial::NotRequested =>
            {
                log::warn!(
                    "Fast cloning requested but unavailable for '{}': {}",
                    info.name,
                    denial
                );
                false
            }
            Err(denial) => {
                log::info!("Fast cloning off for input file '{}': {}", info.name, denial);
                false
            }
        };
        log_metric!(
            "event" = "input_file_opened",
            "input" = &info.name,
            "number" = self.input_file_number,
            "fast_clone" = eligible
        );

        self.process_history.merge(&info.process_history);
        let own = self.own_history();
        self.segment_history = info.process_history.clone();
        self.segment_history.merge(&own);
        self.parameter_sets.merge(&info.parameter_sets);
        self.writer.begin_segment(self.input_file_number, eligible);
        self.segment_rows_in_file = 0;
        self.current_input = Some(info.name);
        Ok(eligible)
    }

    fn close_input_file(&mut self) {
        if self.current_input.take().is_none() {
            return;
        }
        if let Some(file) = self.file.as_mut() {
            file.input_file_closed(self.input_file_number);
        }
        self.writer.end_segment();
        self.segment_rows_in_file = 0;
        self.segment_history = self.own_history();
    }

    fn own_history(&self) -> ProcessHistory {
        ProcessHistory { processes: vec![self.process.clone()] }
    }

    fn close_file(&mut self, reason: ClosureRequestMode) -> Result<(), OutputError> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        if self.current_input.is_some() {
            file.seal_segment(self.input_file_number);
        }

        let mut history = self.process_history.clone();
        history.merge(&self.own_history());
        file.write_registry(RegistryKind::ProcessHistory, &history)?;
        file.write_registry(RegistryKind::ParameterSets, &self.parameter_sets)?;
        file.write_registry(RegistryKind::Parentage, self.writer.parentage())?;
        let dependencies = self.writer.selector().product_dependencies();
        file.write_registry(RegistryKind::ProductDependencies, &dependencies)?;
        let event_history = file.event_history().clone();
        file.write_registry(RegistryKind::EventHistory, &event_history)?;
        let range_sets = file.range_sets().clone();
        file.write_registry(RegistryKind::RangeSets, &range_sets)?;
        let index = file.index().clone();
        file.write_registry(RegistryKind::FileIndex, &index)?;
        if self.settings.write_lookup_index {
            file.write_registry(RegistryKind::LookupIndex, &index.lookup_table())?;
        }

        file.stats.closed_at = Some(Utc::now());
        let mut metadata = CatalogMetadata { entries: self.catalog_entries.clone() };
        metadata.entries.extend([
            ("file_format".to_string(), FILE_FORMAT_ERA.to_string()),
            ("file_sequence".to_string(), file.sequence().to_string()),
            ("stream_name".to_string(), self.settings.stream_name.clone()),
            ("data_tier".to_string(), self.settings.data_tier.clone()),
        ]);
        metadata.entries.extend(file.stats.to_metadata());
        file.write_registry(RegistryKind::CatalogMetadata, &metadata)?;

        let path = file.path().to_path_buf();
        let sequence = file.sequence();
        let ranges = file.covered_ranges();
        let (stats, size_bytes) = file.finish()?;

        log::info!(
            "Closed output file '{}': {} events, {} bytes, reason {}",
            path.display(),
            stats.events(),
            size_bytes,
            reason
        );
        log_metric!(
            "event" = "file_closed",
            "path" = path.display(),
            "reason" = reason,
            "events" = stats.events(),
            "bytes" = size_bytes
        );

        self.closed_files.push(path.clone());
        self.status = FileStatus::Closed;
        if let Some(sink) = self.catalog.as_mut() {
            sink.file_closed(&ClosedFileReport {
                path,
                sequence,
                reason,
                metadata,
                event_count: stats.events(),
                size_bytes,
                ranges,
                stats,
            })?;
        }
        Ok(())
    }
}

//==================================================================================
// III. The Public Stream
//==================================================================================

pub struct OutputStream {
    inner: ReentrantMutex<RefCell<StreamState>>,
}

impl OutputStream {
    pub fn new(
        settings: OutputSettings,
        context: StreamContext,
        factory: Arc<dyn StoreFactory>,
    ) -> Result<Self, OutputError> {
        settings.validate()?;
        let rules = SelectionRules::compile(&settings.selection)?;
        let selector = ColumnSelector::new(
            &context.schema,
            &rules,
            settings.drop_metadata_for_dropped_data,
        )?;
        let schema_registry = SchemaRegistry {
            columns: CategoryArray::from_fn(|c| selector.descriptions_to_persist(c)),
        };
        let dummies = DummyValueCache::for_columns(&context.schema);
        let writer = RecordWriter::new(
            selector,
            Box::new(dummies),
            settings.drop_metadata,
            settings.compression_level,
        );

        log::info!(
            "Output stream '{}' configured: {} columns, closing {:?}",
            settings.stream_name,
            context.schema.len(),
            settings.closing
        );

        let state = StreamState {
            settings,
            factory,
            catalog: None,
            writer,
            schema_registry,
            segment_history: ProcessHistory { processes: vec![context.process.clone()] },
            process: context.process,
            process_history: ProcessHistory::default(),
            parameter_sets: context.parameter_sets,
            catalog_entries: context.catalog_entries,
            file: None,
            status: FileStatus::Closed,
            next_sequence: 1,
            input_file_number: 0,
            current_input: None,
            segment_rows_in_file: 0,
            closed_files: Vec::new(),
            rotation_conflicts: 0,
            aborted: None,
        };
        Ok(Self { inner: ReentrantMutex::new(RefCell::new(state)) })
    }

    pub fn with_catalog(mut self, sink: Box<dyn CatalogSink>) -> Self {
        self.inner.get_mut().get_mut().catalog = Some(sink);
        self
    }

    /// Replaces the dummy-value fallback, e.g. with `StrictMode`.
    pub fn with_missing_value_strategy(mut self, strategy: Box<dyn MissingValueStrategy>) -> Self {
        self.inner.get_mut().get_mut().writer.set_fallback(strategy);
        self
    }

    /// Runs `f` with the stream lock held, so several calls happen as one step.
    pub fn exclusive<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.inner.lock();
        f(self)
    }

    fn read<R>(&self, f: impl FnOnce(&StreamState) -> R) -> R {
        let guard = self.inner.lock();
        let state = guard.borrow();
        f(&*state)
    }

    /// Runs a mutating operation. A fatal error poisons the stream; every
    /// later call fails with `StreamAborted`.
    fn guarded<T>(
        &self,
        op: impl FnOnce(&mut StreamState) -> Result<T, OutputError>,
    ) -> Result<T, OutputError> {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        if let Some(cause) = &state.aborted {
            return Err(OutputError::StreamAborted(cause.clone()));
        }
        let result = op(&mut *state);
        if let Err(e) = &result {
            if e.is_fatal() {
                log::error!("Output stream '{}' aborted: {}", state.settings.stream_name, e);
                state.aborted = Some(e.to_string());
            }
        }
        result
    }

    /// Whether the current file should close before the next record.
    /// Pure: repeated calls without a write in between agree.
    pub fn requests_to_close_file(&self) -> ClosingVerdict {
        self.read(|s| s.verdict())
    }

    /// Writes one record, first rotating the file if the closing policy asks for it.
    pub fn write(&self, record: &Record) -> Result<WriteMethod, OutputError> {
        let _guard = self.inner.lock();
        let verdict = self.requests_to_close_file();
        if verdict.should_close {
            self.guarded(|s| s.switch(verdict.reason))?;
        }
        self.guarded(|s| s.write(record))
    }

    /// Signals a new input file. Returns whether its events may be bulk-copied.
    pub fn begin_input_file(&self, info: InputFileInfo) -> Result<bool, OutputError> {
        self.guarded(|s| s.begin_input_file(info))
    }

    /// Signals that the current input file is done; seals its range sets.
    pub fn respond_to_close_input_file(&self) -> Result<(), OutputError> {
        self.guarded(|s| {
            s.close_input_file();
            Ok(())
        })
    }

    pub fn increment_input_file_number(&self) -> Result<u32, OutputError> {
        self.guarded(|s| {
            s.input_file_number += 1;
            Ok(s.input_file_number)
        })
    }

    pub fn input_file_number(&self) -> u32 {
        self.read(|s| s.input_file_number)
    }

    /// Closes the current file, if any, on an external request.
    pub fn close_file(&self, reason: ClosureRequestMode) -> Result<(), OutputError> {
        self.guarded(|s| s.close_file(reason))
    }

    /// Ends the stream: closes the open file.
    pub fn close(&self) -> Result<(), OutputError> {
        self.guarded(|s| {
            s.close_file(ClosureRequestMode::Unset)?;
            s.close_input_file();
            Ok(())
        })
    }

    pub fn set_file_status(&self, status: FileStatus) -> Result<(), OutputError> {
        self.guarded(|s| {
            s.status = status;
            Ok(())
        })
    }

    pub fn file_status(&self) -> FileStatus {
        self.read(|s| s.status)
    }

    pub fn current_file_name(&self) -> Option<PathBuf> {
        self.read(|s| s.file.as_ref().map(|f| f.path().to_path_buf()))
    }

    pub fn current_counters(&self) -> Option<FileCounters> {
        self.read(|s| s.file.as_ref().map(|f| f.counters()))
    }

    pub fn max_events_per_file_reached(&self, events: u64) -> bool {
        self.read(|s| s.settings.closing.max_events.is_some_and(|max| events >= max))
    }

    pub fn max_size_reached(&self, size_bytes: u64) -> bool {
        self.read(|s| s.settings.closing.max_size.is_some_and(|max| size_bytes >= max))
    }

    pub fn fast_clone_active(&self) -> bool {
        self.read(|s| s.writer.fast_clone_active())
    }

    pub fn closed_files(&self) -> Vec<PathBuf> {
        self.read(|s| s.closed_files.clone())
    }

    pub fn rotation_conflicts(&self) -> u32 {
        self.read(|s| s.rotation_conflicts)
    }

    pub fn is_aborted(&self) -> bool {
        self.read(|s| s.aborted.is_some())
    }
}
