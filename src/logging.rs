//! In-memory log capture for the admin endpoints.
//!
//! A tracing layer copies every event into a bounded ring so admins can
//! inspect recent settlement runs and feed failures without shell access,
//! and follow new entries over SSE.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A single captured log line
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    /// One plain-text line, as served by `/admin/logs?format=text`
    pub fn format(&self) -> String {
        format!(
            "{} {:>5} [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.target,
            self.message
        )
    }

    /// True if this entry is at `level` or more severe
    pub fn at_least(&self, level: Level) -> bool {
        self.level
            .parse::<Level>()
            .map(|l| l <= level)
            .unwrap_or(true)
    }
}

/// Bounded ring of recent entries plus a broadcast for live followers
pub struct LogBuffer {
    tx: broadcast::Sender<LogEntry>,
    recent: parking_lot::Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            tx,
            recent: parking_lot::Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        {
            let mut recent = self.recent.lock();
            if recent.len() == self.capacity {
                recent.pop_front();
            }
            recent.push_back(entry.clone());
        }

        // No subscribers is fine
        let _ = self.tx.send(entry);
    }

    /// Most recent `count` entries at or above `min_level`, oldest first
    pub fn recent(&self, count: usize, min_level: Level) -> Vec<LogEntry> {
        let recent = self.recent.lock();
        let mut out: Vec<LogEntry> = recent
            .iter()
            .rev()
            .filter(|e| e.at_least(min_level))
            .take(count)
            .cloned()
            .collect();
        out.reverse();
        out
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }
}

pub type SharedLogBuffer = Arc<LogBuffer>;

pub fn create_log_buffer(capacity: usize) -> SharedLogBuffer {
    Arc::new(LogBuffer::new(capacity))
}

/// Tracing layer that feeds a [`LogBuffer`]
pub struct LogCaptureLayer {
    buffer: SharedLogBuffer,
}

impl LogCaptureLayer {
    pub fn new(buffer: SharedLogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(LogEntry {
            timestamp: chrono::Utc::now(),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.finish(),
        });
    }
}

/// Collects the `message` field and appends any structured fields after it
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.join(" ")
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp: chrono::Utc::now(),
            level: level.to_string(),
            target: "oad_pool::managers".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_ring_drops_oldest() {
        let buffer = create_log_buffer(2);
        for i in 1..=4 {
            buffer.push(entry("INFO", &format!("settled {}", i)));
        }

        let recent = buffer.recent(10, Level::TRACE);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "settled 3");
        assert_eq!(recent[1].message, "settled 4");
    }

    #[test]
    fn test_recent_filters_by_level() {
        let buffer = create_log_buffer(10);
        buffer.push(entry("INFO", "cache refreshed"));
        buffer.push(entry("WARN", "feed unavailable"));
        buffer.push(entry("DEBUG", "noise"));
        buffer.push(entry("ERROR", "save failed"));

        let warnings = buffer.recent(10, Level::WARN);
        let messages: Vec<_> = warnings.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["feed unavailable", "save failed"]);

        let last_one = buffer.recent(1, Level::TRACE);
        assert_eq!(last_one[0].message, "save failed");
    }

    #[tokio::test]
    async fn test_subscribers_receive_new_entries() {
        let buffer = create_log_buffer(4);
        let mut rx = buffer.subscribe();
        buffer.push(entry("INFO", "hello"));
        let got = rx.recv().await.unwrap();
        assert_eq!(got.message, "hello");
        assert!(got.format().contains("[oad_pool::managers] hello"));
    }
}
