//! Tracer configuration

use pulsegraph_core::Time;

/// Tracer configuration
#[derive(Clone, Debug)]
pub struct TraceConfig {
    /// Output directory; a trailing `/` is added when missing
    pub directory: String,
    /// Prefix of every output file name
    pub basename: String,
    /// Suffix of every output file name
    pub suffix: String,
    /// Only values computed strictly after this clock are recorded
    pub time_start: Time,
    /// Arm the trigger as soon as the tracer is created
    pub start_playing: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            directory: String::new(),
            basename: String::new(),
            suffix: ".dat".to_string(),
            time_start: 0,
            start_playing: false,
        }
    }
}

impl TraceConfig {
    /// Record into `directory` right away
    pub fn recording_into(directory: impl Into<String>) -> Self {
        TraceConfig {
            directory: directory.into(),
            start_playing: true,
            ..TraceConfig::default()
        }
    }

    /// Normalized directory prefix
    pub fn directory_prefix(&self) -> String {
        normalize_directory(&self.directory)
    }
}

/// Append `/` to a non-empty directory that lacks it
pub fn normalize_directory(directory: &str) -> String {
    if directory.is_empty() || directory.ends_with('/') {
        directory.to_string()
    } else {
        format!("{directory}/")
    }
}
