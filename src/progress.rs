//! Load and resolution progress reporting.
//!
//! Reports observable progress during `atlas load` (document parsing) and
//! `atlas search` (coordinate resolution) so users see what is being
//! processed and how much is left. Progress is emitted on **stderr** so
//! stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Corpus scan in progress; total not yet known.
    Discovering,
    /// Document n of total parsed.
    Loading {
        filename: String,
        n: u64,
        total: u64,
    },
    /// Location n of total going through the resolution chain.
    Resolving {
        place: String,
        n: u64,
        total: u64,
    },
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress: "load  3 / 12  informe_03.pdf".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Discovering => "load  discovering...\n".to_string(),
            ProgressEvent::Loading { filename, n, total } => {
                format!("load  {} / {}  {}\n", n, total, filename)
            }
            ProgressEvent::Resolving { place, n, total } => {
                format!("resolve  {} / {}  {}\n", n, total, place)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Discovering => serde_json::json!({
                "event": "progress",
                "phase": "discovering"
            }),
            ProgressEvent::Loading { filename, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "loading",
                "file": filename,
                "n": n,
                "total": total
            }),
            ProgressEvent::Resolving { place, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "resolving",
                "place": place,
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(flag: Option<&str>) -> Self {
        match flag {
            Some("off") => ProgressMode::Off,
            Some("human") => ProgressMode::Human,
            Some("json") => ProgressMode::Json,
            _ => Self::default_for_tty(),
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_modes() {
        assert_eq!(ProgressMode::parse(Some("off")), ProgressMode::Off);
        assert_eq!(ProgressMode::parse(Some("human")), ProgressMode::Human);
        assert_eq!(ProgressMode::parse(Some("json")), ProgressMode::Json);
    }
}
