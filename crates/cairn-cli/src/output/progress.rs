//! Live progress line for archive runs.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use cairn_archiver::{CounterProgress, Progress, ProgressEvent, TracingProgress};
use parking_lot::Mutex;

/// Shortest interval between two redraws
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Counts pipeline events and redraws a single status line on stderr.
///
/// Every event is also logged at trace level.
pub struct TerminalProgress {
    counters: CounterProgress,
    trace: TracingProgress,
    interactive: bool,
    last_draw: Mutex<Option<Instant>>,
}

impl TerminalProgress {
    /// `interactive` enables redrawing; counters are kept either way
    pub fn new(interactive: bool) -> Self {
        Self {
            counters: CounterProgress::new(),
            trace: TracingProgress,
            interactive,
            last_draw: Mutex::new(None),
        }
    }

    pub fn get(&self, event: ProgressEvent) -> u64 {
        self.counters.get(event)
    }

    /// Status line for the current counters
    pub fn line(&self) -> String {
        format!(
            "found {}  hashed {}/{}  looked up {}/{}  uploaded {}/{}",
            self.get(ProgressEvent::Found),
            self.get(ProgressEvent::Hashed),
            self.get(ProgressEvent::ToHash),
            self.get(ProgressEvent::LookedUp),
            self.get(ProgressEvent::ToLookup),
            self.get(ProgressEvent::Uploaded),
            self.get(ProgressEvent::ToUpload),
        )
    }

    /// Draw the final state and end the line
    pub fn finish(&self) {
        if self.interactive {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "\r{}", self.line());
        }
    }

    fn redraw(&self) {
        let now = Instant::now();
        {
            let mut last_draw = self.last_draw.lock();
            if matches!(*last_draw, Some(at) if now.duration_since(at) < REDRAW_INTERVAL) {
                return;
            }
            *last_draw = Some(now);
        }
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r{}", self.line());
        let _ = stderr.flush();
    }
}

impl Progress for TerminalProgress {
    fn update(&self, event: ProgressEvent, count: u64) {
        self.counters.update(event, count);
        self.trace.update(event, count);
        if self.interactive {
            self.redraw();
        }
    }
}
