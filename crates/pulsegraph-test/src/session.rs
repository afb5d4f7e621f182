//! Traced scenario - the six-cell graph recorded by a tracer

use std::path::Path;

use pulsegraph_core::Time;
use pulsegraph_trace::{TraceConfig, TraceResult, Tracer};

use crate::scenario::Scenario;

/// Scenario whose `Sig1` and `Sig3` are traced into `directory`
pub struct TracedScenario {
    pub scenario: Scenario,
    pub tracer: Tracer,
}

impl TracedScenario {
    pub fn start(directory: &Path) -> TraceResult<Self> {
        let mut scenario = Scenario::build()?;
        let config = TraceConfig::recording_into(directory.display().to_string());
        let tracer = Tracer::with_config(&mut scenario.graph, "session", config);

        tracer.add_signal(&mut scenario.graph, scenario.sig1, "sig1")?;
        tracer.add_signal(&mut scenario.graph, scenario.sig3, "")?;
        tracer.open(&scenario.graph)?;

        Ok(TracedScenario { scenario, tracer })
    }

    /// Refresh the tracer's trigger for one tick
    pub fn tick(&mut self, time: Time) -> TraceResult<()> {
        self.scenario.graph.refresh_node(self.tracer.trigger(), time)?;
        Ok(())
    }

    /// Run one tracer command line, returning its reply
    pub fn command(&mut self, line: &str) -> TraceResult<String> {
        let mut reply = String::new();
        self.tracer.run_line(&mut self.scenario.graph, line, &mut reply)?;
        Ok(reply)
    }

    /// Close the files and hand the scenario back
    pub fn finish(self) -> TraceResult<Scenario> {
        let TracedScenario {
            mut scenario,
            tracer,
        } = self;
        tracer.detach(&mut scenario.graph)?;
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pulsegraph-session-{}-{}",
            test,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_trigger_is_idempotent_per_tick() {
        let dir = scratch_dir("idempotent");
        let mut session = TracedScenario::start(&dir).unwrap();

        for t in [1, 1, 2, 2, 2, 3] {
            session.tick(t).unwrap();
        }
        let scenario = session.finish().unwrap();

        let sig1 = fs::read_to_string(dir.join("sig1.dat")).unwrap();
        let sig3 = fs::read_to_string(dir.join("Sig3.dat")).unwrap();
        assert_eq!(sig1.lines().count(), 3);
        assert_eq!(sig1, "1\t20.0\n2\t20.0\n3\t20.0\n");
        assert_eq!(sig3, "1\t10.0\n2\t10.0\n3\t10.0\n");
        assert_eq!(scenario.log.count("Sig1"), 3);
    }

    #[test]
    fn test_stop_and_start_through_commands() {
        let dir = scratch_dir("commands");
        let mut session = TracedScenario::start(&dir).unwrap();

        session.tick(1).unwrap();
        session.command("stop").unwrap();
        session.tick(2).unwrap();
        session.command("start").unwrap();
        session.tick(2).unwrap();
        session.tick(3).unwrap();
        assert_eq!(session.command("timeStart").unwrap(), "timeStart = 0\n");
        session.finish().unwrap();

        let sig1 = fs::read_to_string(dir.join("sig1.dat")).unwrap();
        assert_eq!(sig1, "1\t20.0\n3\t20.0\n");
    }

    #[test]
    fn test_describe_lists_traced_cells() {
        let dir = scratch_dir("describe");
        let session = TracedScenario::start(&dir).unwrap();

        assert_eq!(
            session.tracer.describe(&session.scenario.graph).unwrap(),
            "Tracer session [mode=play] : \n  - Dep list: \n     -> Sig1\n     -> Sig3\n"
        );
    }
}
