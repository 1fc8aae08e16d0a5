//! Request log for the panel.
//!
//! A fixed-capacity history of timestamped lines. When full, the oldest line
//! is evicted in the same step as the append. Lines are read back newest
//! first, the order the panel shows them in.

extern crate alloc;

use alloc::{string::String, vec::Vec};
use core::{cell::RefCell, fmt};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use heapless::HistoryBuffer;

/// Number of lines kept.
pub const LOG_CAPACITY: usize = 30;
/// Number of newest lines the panel renders emphasized.
pub const HIGHLIGHTED_ENTRIES: usize = 3;

/// Wall-clock time of day, rendered as 24-hour `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    pub const fn new(
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Source of the time stamped on each line.
pub type Clock = fn() -> TimeOfDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMarker {
    Sent,
    Ok,
    Error,
}

impl LogMarker {
    pub const fn glyph(self) -> &'static str {
        match self {
            LogMarker::Sent => "📤",
            LogMarker::Ok => "✅",
            LogMarker::Error => "❌",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: TimeOfDay,
    pub marker: LogMarker,
    pub text: String,
}

impl fmt::Display for LogEntry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "[{}] {} {}", self.at, self.marker.glyph(), self.text)
    }
}

/// Receiver of request-log lines.
pub trait LogSink: Sync {
    fn record(
        &self,
        marker: LogMarker,
        text: &str,
    );
}

/// Bounded line history, oldest evicted first.
pub struct LogBuffer {
    entries: HistoryBuffer<LogEntry, LOG_CAPACITY>,
}

impl LogBuffer {
    pub const fn new() -> Self {
        Self {
            entries: HistoryBuffer::new(),
        }
    }

    pub fn push(
        &mut self,
        entry: LogEntry,
    ) {
        self.entries.write(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy of the history, newest line first.
    pub fn newest_first(&self) -> Vec<LogEntry> {
        let mut entries: Vec<LogEntry> = self.entries.oldest_ordered().cloned().collect();
        entries.reverse();
        entries
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// [`LogBuffer`] shared between the panel and the command mapper.
pub struct SharedLog {
    buffer: Mutex<CriticalSectionRawMutex, RefCell<LogBuffer>>,
    clock: Clock,
}

impl SharedLog {
    pub const fn new(clock: Clock) -> Self {
        Self {
            buffer: Mutex::new(RefCell::new(LogBuffer::new())),
            clock,
        }
    }

    pub fn push(
        &self,
        entry: LogEntry,
    ) {
        self.buffer.lock(|b| b.borrow_mut().push(entry));
    }

    /// Snapshot of the log, newest line first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer.lock(|b| b.borrow().newest_first())
    }

    pub fn len(&self) -> usize {
        self.buffer.lock(|b| b.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.buffer.lock(|b| b.borrow_mut().clear());
    }
}

impl LogSink for SharedLog {
    fn record(
        &self,
        marker: LogMarker,
        text: &str,
    ) {
        self.push(LogEntry {
            at: (self.clock)(),
            marker,
            text: String::from(text),
        });
    }
}
