use std::fmt;
use std::str::FromStr;

use super::state::Stage;
use crate::error::{Error, Result};

/// Severity of a pipeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(Error::InvalidLogLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Receives the orchestrator's progress events.
///
/// The caller constructs the observer and hands the pipeline a borrow of it,
/// so setup and teardown of whatever sits behind it stay with the caller.
pub trait PipelineObserver {
    fn event(&mut self, level: LogLevel, message: &str);

    fn stage_changed(&mut self, from: Stage, to: Stage) {
        self.event(LogLevel::Debug, &format!("stage {from} -> {to}"));
    }
}

/// Forwards events to the `log` facade under the `pipeline` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn event(&mut self, level: LogLevel, message: &str) {
        log::log!(target: "pipeline", log::Level::from(level), "{message}");
    }
}

/// Keeps every event in memory, for embedding callers that render progress
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryObserver {
    pub events: Vec<(LogLevel, String)>,
    pub transitions: Vec<(Stage, Stage)>,
}

impl MemoryObserver {
    /// Messages at `level` or above.
    pub fn messages_at_least(&self, level: LogLevel) -> Vec<&str> {
        self.events
            .iter()
            .filter(|(l, _)| *l >= level)
            .map(|(_, m)| m.as_str())
            .collect()
    }
}

impl PipelineObserver for MemoryObserver {
    fn event(&mut self, level: LogLevel, message: &str) {
        self.events.push((level, message.to_string()));
    }

    fn stage_changed(&mut self, from: Stage, to: Stage) {
        self.transitions.push((from, to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_and_order() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!(LogLevel::Error > LogLevel::Info);
        assert!(matches!(
            "verbose".parse::<LogLevel>(),
            Err(Error::InvalidLogLevel(_))
        ));
        assert_eq!(log::Level::from(LogLevel::Warning), log::Level::Warn);
    }

    #[test]
    fn memory_observer_filters_by_level() {
        let mut obs = MemoryObserver::default();
        obs.event(LogLevel::Debug, "noise");
        obs.event(LogLevel::Error, "boom");
        obs.stage_changed(Stage::Idle, Stage::Ingesting);
        assert_eq!(obs.messages_at_least(LogLevel::Warning), vec!["boom"]);
        assert_eq!(obs.transitions, vec![(Stage::Idle, Stage::Ingesting)]);
    }
}
