//! Asynchronous tracing layer
//!
//! Events are turned into [`LogRecord`]s on the emitting thread and pushed
//! onto an unbounded queue. A dedicated writer thread drains the queue into
//! every configured engine, so a slow engine never stalls the caller.

use crate::engine::{EngineRegistry, LogEngine, LogRecord};
use crate::error::{LogError, LogResult};
use crate::level::Level;

use std::fmt::{self, Write as _};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

enum Message {
    Record(LogRecord),
    Shutdown,
}

/// Builder for an [`AsyncLogLayer`] and its [`LogGuard`]
#[derive(Debug)]
pub struct AsyncLogBuilder {
    registry: EngineRegistry,
    engines: Vec<String>,
    call_site: bool,
}

impl AsyncLogBuilder {
    /// Start from a registry of available engines
    pub fn new(registry: EngineRegistry) -> Self {
        Self {
            registry,
            engines: Vec::new(),
            call_site: false,
        }
    }

    /// Add an engine by name; may be repeated
    pub fn engine(mut self, name: impl Into<String>) -> Self {
        self.engines.push(name.into());
        self
    }

    /// Prefix each message with `file:line` of its call site
    pub fn call_site(mut self, enabled: bool) -> Self {
        self.call_site = enabled;
        self
    }

    /// Create the engines and start the writer thread
    ///
    /// # Errors
    /// [`LogError::NoEngine`] when no engine was added, or whatever
    /// [`EngineRegistry::create`] reports for a bad engine.
    pub fn build(self) -> LogResult<(AsyncLogLayer, LogGuard)> {
        if self.engines.is_empty() {
            return Err(LogError::NoEngine);
        }

        let engines = self
            .engines
            .iter()
            .map(|name| self.registry.create(name))
            .collect::<LogResult<Vec<_>>>()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || drain(rx, engines))?;

        let layer = AsyncLogLayer {
            tx: tx.clone(),
            call_site: self.call_site,
        };
        let guard = LogGuard {
            tx,
            writer: Some(writer),
        };
        Ok((layer, guard))
    }
}

fn drain(mut rx: UnboundedReceiver<Message>, mut engines: Vec<Box<dyn LogEngine>>) {
    while let Some(message) = rx.blocking_recv() {
        let record = match message {
            Message::Record(record) => record,
            Message::Shutdown => break,
        };
        for engine in engines.iter_mut() {
            if let Err(e) = engine.write(&record) {
                eprintln!("log engine write failed: {e}");
            }
        }
    }

    for engine in engines.iter_mut() {
        engine.destroy();
    }
}

/// Tracing layer feeding the writer thread
pub struct AsyncLogLayer {
    tx: UnboundedSender<Message>,
    call_site: bool,
}

impl fmt::Debug for AsyncLogLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncLogLayer")
            .field("call_site", &self.call_site)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<S: Subscriber> Layer<S> for AsyncLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut record = LogRecord::new(
            Level::from(metadata.level()),
            metadata.target(),
            visitor.finish(),
        );
        if self.call_site {
            record.location = match (metadata.file(), metadata.line()) {
                (Some(file), Some(line)) => {
                    let file = file.rsplit(['/', '\\']).next().unwrap_or(file);
                    Some(format!("{file}:{line}"))
                }
                _ => None,
            };
        }

        // The writer is gone after the guard is dropped
        let _ = self.tx.send(Message::Record(record));
    }
}

/// Collects the `message` field and appends the rest as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            self.message + &self.fields
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Keeps the writer thread alive
///
/// Dropping the guard flushes every queued record and tears the engines
/// down. Hold it until the end of `main`.
#[must_use = "dropping the guard stops the log writer"]
pub struct LogGuard {
    tx: UnboundedSender<Message>,
    writer: Option<JoinHandle<()>>,
}

impl fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogGuard")
            .field("running", &self.writer.is_some())
            .finish()
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::Shutdown);
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                eprintln!("log writer thread panicked");
            }
        }
    }
}
