//! Textual tracer commands
//!
//! Lines such as `add robot.position pos` or `open /tmp/run run_` are parsed
//! into a [`TraceCommand`] and executed against a [`Tracer`]. Replies are
//! written to any text sink.

use std::fmt;
use std::str::FromStr;

use pulsegraph_core::{Graph, GraphError, Time};

use crate::{TraceError, TraceResult, Tracer};

/// Reply to `help`
pub const HELP: &str = "Tracer: \n\
                        \x20 - add <cell> [<nickname>]\n\
                        \x20 - clear\n\
                        \x20 - open [<dir> [<basename> [<suffix>=.dat]]]\n\
                        \x20 - close\n\
                        \x20 - record\n\
                        \x20 - start/stop\n\
                        \x20 - timeStart [<time>]\n";

/// Parsed tracer command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceCommand {
    Help,
    /// Trace a cell looked up by name
    Add { cell: String, nickname: String },
    /// Close files and stop tracing every cell
    Clear,
    /// Open output files; a missing suffix keeps the configured one
    Open {
        directory: String,
        basename: String,
        suffix: Option<String>,
    },
    Close,
    Record,
    Start,
    Stop,
    /// Print the recording start clock, or set it
    TimeStart(Option<Time>),
}

impl TraceCommand {
    pub fn keyword(&self) -> &'static str {
        match self {
            TraceCommand::Help => "help",
            TraceCommand::Add { .. } => "add",
            TraceCommand::Clear => "clear",
            TraceCommand::Open { .. } => "open",
            TraceCommand::Close => "close",
            TraceCommand::Record => "record",
            TraceCommand::Start => "start",
            TraceCommand::Stop => "stop",
            TraceCommand::TimeStart(_) => "timeStart",
        }
    }
}

impl FromStr for TraceCommand {
    type Err = TraceError;

    fn from_str(line: &str) -> TraceResult<Self> {
        let mut words = line.split_whitespace();
        let keyword = words.next().ok_or(TraceError::MissingArgument("command"))?;

        let command = match keyword {
            "help" => TraceCommand::Help,
            "add" => TraceCommand::Add {
                cell: words
                    .next()
                    .ok_or(TraceError::MissingArgument("cell"))?
                    .to_string(),
                nickname: words.next().unwrap_or_default().to_string(),
            },
            "clear" => TraceCommand::Clear,
            "open" => TraceCommand::Open {
                directory: words.next().unwrap_or_default().to_string(),
                basename: words.next().unwrap_or_default().to_string(),
                suffix: words.next().map(str::to_string),
            },
            "close" => TraceCommand::Close,
            "record" => TraceCommand::Record,
            "start" => TraceCommand::Start,
            "stop" => TraceCommand::Stop,
            "timeStart" => match words.next() {
                None => TraceCommand::TimeStart(None),
                Some(raw) => {
                    let time = raw.parse::<Time>().map_err(|err| TraceError::InvalidArgument {
                        command: "timeStart",
                        message: format!("{raw}: {err}"),
                    })?;
                    TraceCommand::TimeStart(Some(time))
                }
            },
            other => return Err(TraceError::UnknownCommand(other.to_string())),
        };

        if let Some(extra) = words.next() {
            return Err(TraceError::InvalidArgument {
                command: command.keyword(),
                message: format!("unexpected argument {extra}"),
            });
        }
        Ok(command)
    }
}

impl Tracer {
    /// Execute a parsed command, writing any reply into `out`
    pub fn execute(
        &self,
        graph: &mut Graph,
        command: TraceCommand,
        out: &mut dyn fmt::Write,
    ) -> TraceResult<()> {
        match command {
            TraceCommand::Help => out.write_str(HELP)?,
            TraceCommand::Add { cell, nickname } => {
                let id = graph.find(&cell).ok_or(GraphError::UnknownCell(cell))?;
                self.add_signal(graph, id, &nickname)?;
            }
            TraceCommand::Clear => {
                self.close_files()?;
                self.clear_signals(graph)?;
            }
            TraceCommand::Open {
                directory,
                basename,
                suffix,
            } => {
                let suffix = suffix.unwrap_or_else(|| self.config().suffix);
                self.open_files(graph, &directory, &basename, &suffix)?;
            }
            TraceCommand::Close => self.close_files()?,
            TraceCommand::Record => self.record(graph)?,
            TraceCommand::Start => self.play(graph)?,
            TraceCommand::Stop => self.pause(graph)?,
            TraceCommand::TimeStart(None) => writeln!(out, "timeStart = {}", self.time_start())?,
            TraceCommand::TimeStart(Some(time)) => self.set_time_start(time),
        }
        Ok(())
    }

    /// Parse and execute one command line
    pub fn run_line(&self, graph: &mut Graph, line: &str, out: &mut dyn fmt::Write) -> TraceResult<()> {
        let command = line.parse::<TraceCommand>()?;
        self.execute(graph, command, out)
    }
}
