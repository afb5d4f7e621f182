//! Tracer - records traced cell values once per tick
//!
//! The tracer owns a trigger cell registered in the graph. Traced cells are
//! wired as the trigger's dependencies, so refreshing the trigger for a tick
//! first brings every traced cell up to date, then appends one line per
//! cell to its output file. The output files are owned by the tracer state
//! shared with the trigger's action.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use pulsegraph_core::{CellId, Graph, GraphError, Time, TriggerCell};

use crate::{normalize_directory, TraceConfig, TraceError, TraceResult};

/// A traced cell and the nickname used for its file
#[derive(Clone, Debug)]
struct TraceTarget {
    cell: CellId,
    nickname: String,
}

/// An open output file
struct TraceFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// State shared between the tracer handle and its trigger action
struct TraceState {
    config: TraceConfig,
    targets: Vec<TraceTarget>,
    files: Vec<TraceFile>,
    /// Files were opened at least once; later additions open immediately
    names_set: bool,
}

impl TraceState {
    fn new(config: TraceConfig) -> Self {
        TraceState {
            config,
            targets: Vec::new(),
            files: Vec::new(),
            names_set: false,
        }
    }

    fn open_file(&mut self, graph: &Graph, target: &TraceTarget) -> TraceResult<()> {
        let signame = if target.nickname.is_empty() {
            short_name(graph.name(target.cell)?).to_string()
        } else {
            target.nickname.clone()
        };

        let path = PathBuf::from(format!(
            "{}{}{}{}",
            self.config.directory_prefix(),
            self.config.basename,
            signame,
            self.config.suffix
        ));
        let file = File::create(&path)?;
        debug!(cell = %target.cell, path = %path.display(), "trace file opened");

        self.files.push(TraceFile {
            path,
            writer: BufWriter::new(file),
        });
        Ok(())
    }

    fn close_files(&mut self) -> TraceResult<()> {
        let mut first_error = None;
        for mut file in self.files.drain(..) {
            if let Err(err) = file.writer.flush() {
                warn!(path = %file.path.display(), error = %err, "trace file flush failed");
                first_error.get_or_insert(err);
            }
            debug!(path = %file.path.display(), "trace file closed");
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn record(&mut self, graph: &Graph) -> TraceResult<()> {
        if self.files.len() != self.targets.len() {
            return Err(TraceError::CountMismatch {
                files: self.files.len(),
                signals: self.targets.len(),
            });
        }

        let time_start = self.config.time_start;
        for (target, file) in self.targets.iter().zip(self.files.iter_mut()) {
            // One faulty cell must not prevent recording the others
            if let Err(err) = record_signal(&mut file.writer, graph, target.cell, time_start) {
                warn!(cell = %target.cell, error = %err, "signal record failed");
                if let Err(io) = writeln!(file.writer, "{err}") {
                    warn!(path = %file.path.display(), error = %io, "trace file write failed");
                }
            }
        }
        Ok(())
    }
}

fn record_signal(
    out: &mut impl Write,
    graph: &Graph,
    cell: CellId,
    time_start: Time,
) -> TraceResult<()> {
    let Some(time) = graph.last_computed(cell)? else {
        return Ok(());
    };
    if time <= time_start {
        return Ok(());
    }

    let mut value = String::new();
    graph.trace_value(cell, &mut value)?;
    writeln!(out, "{time}\t{value}")?;
    Ok(())
}

/// Last component of a qualified cell name (`robot.position` -> `position`)
pub fn short_name(name: &str) -> &str {
    name.rsplit(|c| c == ':' || c == '.')
        .next()
        .unwrap_or(name)
}

/// Per-tick recorder of cell values
pub struct Tracer {
    name: String,
    trigger: CellId,
    state: Arc<Mutex<TraceState>>,
}

impl Tracer {
    /// Create a paused tracer with default configuration
    pub fn new(graph: &mut Graph, name: impl Into<String>) -> Self {
        Self::with_config(graph, name, TraceConfig::default())
    }

    /// Create a tracer and register its trigger cell in `graph`
    pub fn with_config(graph: &mut Graph, name: impl Into<String>, config: TraceConfig) -> Self {
        let name = name.into();
        let trigger_name = format!("Tracer({name})::trigger");
        let playing = config.start_playing;

        let state = Arc::new(Mutex::new(TraceState::new(config)));
        let recorder = Arc::clone(&state);
        let action_name = trigger_name.clone();
        let trigger = graph.add_trigger(TriggerCell::new(trigger_name).armed(playing).with_action(
            move |time, graph| {
                debug!(tracer = %action_name, time, "recording");
                recorder
                    .lock()
                    .record(graph)
                    .map_err(|err| GraphError::compute(action_name.as_str(), err))
            },
        ));

        Tracer {
            name,
            trigger,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The trigger cell to refresh once per tick
    pub fn trigger(&self) -> CellId {
        self.trigger
    }

    /// Trace `cell`. An empty nickname uses the cell's short name.
    ///
    /// Once files are open, the cell's file is opened before the cell is
    /// wired, so a failed open leaves the tracer unchanged.
    pub fn add_signal(
        &self,
        graph: &mut Graph,
        cell: impl Into<CellId>,
        nickname: &str,
    ) -> TraceResult<()> {
        let cell = cell.into();
        let name = graph.name(cell)?.to_string();

        let mut state = self.state.lock();
        if state.targets.iter().any(|t| t.cell == cell) {
            warn!(tracer = %self.name, cell = %name, "signal already traced");
            return Err(TraceError::AlreadyTraced(name));
        }

        let target = TraceTarget {
            cell,
            nickname: nickname.to_string(),
        };
        if state.names_set {
            state.open_file(graph, &target)?;
        }
        if let Err(err) = graph.add_dependency(self.trigger, cell) {
            if state.names_set {
                state.files.pop();
            }
            return Err(err.into());
        }

        debug!(tracer = %self.name, cell = %name, nickname, "signal traced");
        state.targets.push(target);
        Ok(())
    }

    /// Stop tracing every cell. Open files are left untouched.
    pub fn clear_signals(&self, graph: &mut Graph) -> TraceResult<()> {
        self.state.lock().targets.clear();
        graph.clear_dependencies(self.trigger)?;
        Ok(())
    }

    /// Open one file per traced cell, closing previously open files first
    pub fn open_files(
        &self,
        graph: &Graph,
        directory: &str,
        basename: &str,
        suffix: &str,
    ) -> TraceResult<()> {
        let mut state = self.state.lock();
        state.config.directory = normalize_directory(directory);
        state.config.basename = basename.to_string();
        state.config.suffix = suffix.to_string();

        if !state.files.is_empty() {
            state.close_files()?;
        }

        let targets = state.targets.clone();
        for target in &targets {
            state.open_file(graph, target)?;
        }
        state.names_set = true;
        Ok(())
    }

    /// Open files using the configured directory, basename and suffix
    pub fn open(&self, graph: &Graph) -> TraceResult<()> {
        let config = self.config();
        self.open_files(graph, &config.directory, &config.basename, &config.suffix)
    }

    /// Flush and close every output file
    pub fn close_files(&self) -> TraceResult<()> {
        self.state.lock().close_files()
    }

    /// Record the current value of every traced cell, if playing
    pub fn record(&self, graph: &Graph) -> TraceResult<()> {
        if !self.is_playing(graph)? {
            return Ok(());
        }
        self.state.lock().record(graph)
    }

    pub fn play(&self, graph: &mut Graph) -> TraceResult<()> {
        graph.set_armed(self.trigger, true)?;
        Ok(())
    }

    pub fn pause(&self, graph: &mut Graph) -> TraceResult<()> {
        graph.set_armed(self.trigger, false)?;
        Ok(())
    }

    pub fn is_playing(&self, graph: &Graph) -> TraceResult<bool> {
        Ok(graph.is_armed(self.trigger)?)
    }

    pub fn time_start(&self) -> Time {
        self.state.lock().config.time_start
    }

    pub fn set_time_start(&self, time: Time) {
        self.state.lock().config.time_start = time;
    }

    pub fn config(&self) -> TraceConfig {
        self.state.lock().config.clone()
    }

    pub fn signal_count(&self) -> usize {
        self.state.lock().targets.len()
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }

    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.state.lock().files.iter().map(|f| f.path.clone()).collect()
    }

    /// Human-readable summary of mode and traced cells
    pub fn describe(&self, graph: &Graph) -> TraceResult<String> {
        let mode = if self.is_playing(graph)? { "play" } else { "pause" };
        let mut out = format!("Tracer {} [mode={mode}] : \n  - Dep list: \n", self.name);
        for target in &self.state.lock().targets {
            let name = graph.name(target.cell).unwrap_or("<removed>");
            out.push_str(&format!("     -> {name}\n"));
        }
        Ok(out)
    }

    /// Close files and remove the trigger cell from the graph
    pub fn detach(self, graph: &mut Graph) -> TraceResult<()> {
        self.close_files()?;
        graph.remove(self.trigger)?;
        Ok(())
    }
}
