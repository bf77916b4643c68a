//! Host channel and notifier used outside an embedding application.
//!
//! [`JsonLinesHost`] stands in for the host bridge: each save envelope is
//! appended as one JSON line to a file or stdout, where another process can
//! pick it up.

use casemap_core::save::{HostChannel, HostError, Notice, Notifier, SaveEnvelope};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

pub struct JsonLinesHost {
    sink: Box<dyn Write>,
}

impl JsonLinesHost {
    /// Append to `path`, or write to stdout when `path` is `-`.
    pub fn open(path: &Path) -> io::Result<Self> {
        if path.as_os_str() == "-" {
            return Ok(Self::from_writer(io::stdout()));
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_writer(file))
    }

    pub fn from_writer(writer: impl Write + 'static) -> Self {
        Self {
            sink: Box::new(writer),
        }
    }
}

impl HostChannel for JsonLinesHost {
    fn post_message(&mut self, envelope: &SaveEnvelope) -> Result<(), HostError> {
        let line = serde_json::to_string(envelope).map_err(|e| HostError(e.to_string()))?;
        writeln!(self.sink, "{line}")
            .and_then(|()| self.sink.flush())
            .map_err(|e| HostError(e.to_string()))
    }
}

/// Prints notices to stderr.
#[derive(Debug, Default)]
pub struct StderrNotifier {
    pub last: Option<Notice>,
}

impl Notifier for StderrNotifier {
    fn notify(&mut self, notice: Notice) {
        match &notice {
            Notice::HostUnavailable { envelope } => {
                warn!("save not persisted: no host channel");
                eprintln!("{}", notice.text());
                eprintln!("  payload: {envelope}");
            }
            Notice::SaveFailed { .. } | Notice::SelectTester | Notice::SaveInFlight => {
                eprintln!("{}", notice.text());
            }
            Notice::SaveSent => info!("save acknowledged"),
        }
        self.last = Some(notice);
    }
}
