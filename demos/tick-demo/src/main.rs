//! Pulsegraph Tick Demo
//!
//! Drives a small control loop one tick at a time:
//! - A sensor filtered by a low-pass cell
//! - An operator setpoint recomputed only when changed
//! - A constant controller gain
//! - A tracer recording any cell to disk, driven by console commands

mod pipeline;

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::thread;

use pulsegraph_core::{Graph, Time};
use pulsegraph_trace::Tracer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use pipeline::{DemoConfig, Pipeline};

const HELP: &str = "Commands:\n\
                    \x20 tick [<n>]          - Advance the clock\n\
                    \x20 tree [<depth>]      - Show the dependency tree of the command\n\
                    \x20 dot                 - Export the graph in DOT format\n\
                    \x20 status              - Show current values\n\
                    \x20 setpoint <value>    - Change the operator setpoint\n\
                    \x20 tracer <command>    - Tracer command (tracer help)\n\
                    \x20 quit                - Exit\n";

/// Initialize logging; `RUST_LOG` overrides the default `info` filter
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

struct Session {
    graph: Graph,
    pipeline: Pipeline,
    tracer: Tracer,
    config: DemoConfig,
    time: Time,
}

impl Session {
    fn new(config: DemoConfig) -> Result<Self, Box<dyn Error>> {
        let mut graph = Graph::new();
        let pipeline = Pipeline::build(&mut graph, &config)?;
        let tracer = Tracer::new(&mut graph, "console");
        Ok(Session {
            graph,
            pipeline,
            tracer,
            config,
            time: 0,
        })
    }

    fn tick(&mut self, count: Time) -> Result<(), Box<dyn Error>> {
        for _ in 0..count {
            self.time += 1;
            self.graph.refresh(self.pipeline.command, self.time)?;
            self.graph.refresh_node(self.tracer.trigger(), self.time)?;
            if !self.config.tick_interval.is_zero() {
                thread::sleep(self.config.tick_interval);
            }
        }
        info!(time = self.time, "clock advanced");
        Ok(())
    }

    fn status(&self) -> Result<String, Box<dyn Error>> {
        let p = &self.pipeline;
        let g = &self.graph;
        Ok(format!(
            "t={} sensor={:.4} filtered={:.4} setpoint={:.4} gain={:.4} error={:.4} command={:.4}\n",
            self.time,
            g.value(p.sensor)?,
            g.value(p.filtered)?,
            g.value(p.setpoint)?,
            g.value(p.gain)?,
            g.value(p.error)?,
            g.value(p.command)?,
        ))
    }

    /// Handle one console line. Returns false on `quit`.
    fn handle(&mut self, line: &str, out: &mut String) -> Result<bool, Box<dyn Error>> {
        let line = line.trim();
        let (keyword, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match keyword {
            "" => {}
            "help" => out.push_str(HELP),
            "quit" | "exit" => return Ok(false),
            "tick" => {
                let count = if rest.is_empty() {
                    self.config.ticks_per_step
                } else {
                    rest.parse()?
                };
                self.tick(count)?;
                out.push_str(&self.status()?);
            }
            "tree" => {
                let depth = if rest.is_empty() {
                    self.config.tree_depth
                } else {
                    rest.parse()?
                };
                out.push_str(&self.graph.render(self.pipeline.command, depth)?);
                out.push('\n');
            }
            "dot" => {
                out.push_str(&self.graph.write_dot(self.pipeline.command)?);
                out.push('\n');
            }
            "status" => out.push_str(&self.status()?),
            "setpoint" => {
                let value: f64 = rest.parse()?;
                self.pipeline.set_setpoint(&mut self.graph, value)?;
            }
            "tracer" => {
                if rest.is_empty() {
                    out.push_str(&self.tracer.describe(&self.graph)?);
                } else {
                    self.tracer.run_line(&mut self.graph, rest, out)?;
                }
            }
            other => {
                out.push_str(&format!("Unknown command: {other} (try help)\n"));
            }
        }
        Ok(true)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let config = if std::env::args().any(|arg| arg == "--paced") {
        DemoConfig::paced()
    } else {
        DemoConfig::default()
    };
    info!(?config, "starting tick demo");

    let mut session = Session::new(config)?;
    println!("=== Pulsegraph Tick Demo ===\n");
    print!("{HELP}");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let mut out = String::new();
        match session.handle(&line, &mut out) {
            Ok(true) => print!("{out}"),
            Ok(false) => break,
            Err(err) => {
                print!("{out}");
                warn!(error = %err, "command failed");
                println!("Error: {err}");
            }
        }
    }

    session.tracer.close_files()?;
    println!("Goodbye!");
    Ok(())
}
