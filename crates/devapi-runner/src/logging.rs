//! Logging setup.
//!
//! Events go to stderr through the usual fmt layer and, through
//! [`ForwardLayer`], into a channel the main loop drains into
//! [`devapi_server::Server::on_log_line`] so subscribed clients see them.

use std::fmt::Write as _;

use crossbeam_channel::{Receiver, Sender};
use devapi_proto::LogLevel;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{RunnerError, RunnerResult};

/// Lines buffered between the forwarding layer and the main loop.
pub const LOG_CHANNEL_CAPACITY: usize = 256;

/// A formatted event on its way to API clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
}

pub fn log_level(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        Level::DEBUG => LogLevel::Debug,
        Level::TRACE => LogLevel::Verbose,
    }
}

/// Copies every event into a bounded channel. Lines are dropped when the
/// channel is full so logging never blocks.
#[derive(Debug, Clone)]
pub struct ForwardLayer {
    sender: Sender<LogLine>,
}

impl ForwardLayer {
    pub fn new(sender: Sender<LogLine>) -> Self {
        ForwardLayer { sender }
    }

    /// Layer plus the receiving end for the main loop.
    pub fn channel() -> (Self, Receiver<LogLine>) {
        let (tx, rx) = crossbeam_channel::bounded(LOG_CHANNEL_CAPACITY);
        (ForwardLayer::new(tx), rx)
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for ForwardLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        visitor.message.push_str(&visitor.fields);

        let line = LogLine {
            level: log_level(metadata.level()),
            tag: metadata.target().to_string(),
            message: visitor.message,
        };
        let _ = self.sender.try_send(line);
    }
}

/// Build the filter from `RUST_LOG`, falling back to `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns the receiver for forwarded lines.
pub fn init(default_level: &str) -> RunnerResult<Receiver<LogLine>> {
    let (forward, lines) = ForwardLayer::channel();
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(forward)
        .try_init()
        .map_err(|e| RunnerError::Logging(e.to_string()))?;
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_layer_captures_events() {
        let (forward, lines) = ForwardLayer::channel();
        let subscriber = tracing_subscriber::registry().with(forward);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "devapi::demo", port = 6053, "listener {}", "ready");
            tracing::trace!("fine detail");
        });

        let first = lines.try_recv().unwrap();
        assert_eq!(first.level, LogLevel::Warn);
        assert_eq!(first.tag, "devapi::demo");
        assert_eq!(first.message, "listener ready port=6053");

        let second = lines.try_recv().unwrap();
        assert_eq!(second.level, LogLevel::Verbose);
        assert_eq!(second.message, "fine detail");
        assert!(lines.try_recv().is_err());
    }

    #[test]
    fn test_full_channel_drops_lines() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let subscriber = tracing_subscriber::registry().with(ForwardLayer::new(tx));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("one");
            tracing::info!("two");
        });
        assert_eq!(rx.try_recv().unwrap().message, "one");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(log_level(&Level::ERROR), LogLevel::Error);
        assert_eq!(log_level(&Level::DEBUG), LogLevel::Debug);
    }
}
