//! Ordered delivery of decoded events with at-most-one terminal event.

use tracing::warn;

use crate::model::{DecodedEvent, DocumentField, ErrorEvent, FinalDocuments};

/// Receives events routed by a [`Dispatcher`], one method per event tag.
pub trait EventHandler {
    fn on_partial(&mut self, field: DocumentField, text: String);

    fn on_final(&mut self, documents: FinalDocuments);

    fn on_error(&mut self, error: ErrorEvent);
}

/// What happened to a dispatched event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Forwarded as a non-terminal event
    Forwarded,
    /// Forwarded as the session's terminal event
    Terminal,
    /// Dropped because a terminal event was already delivered
    Dropped,
}

/// Routes events to an [`EventHandler`] synchronously and in arrival order.
///
/// Once a `Final` or `Error` has been forwarded, every later event is
/// dropped and logged. The first terminal event wins.
#[derive(Debug)]
pub struct Dispatcher<H> {
    handler: H,
    terminated: bool,
    dropped: usize,
}

impl<H: EventHandler> Dispatcher<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            terminated: false,
            dropped: 0,
        }
    }

    pub fn dispatch(&mut self, event: DecodedEvent) -> Dispatched {
        if self.terminated {
            self.dropped += 1;
            warn!(kind = event.kind(), "dropping event received after terminal event");
            return Dispatched::Dropped;
        }

        match event {
            DecodedEvent::Partial { field, text } => {
                self.handler.on_partial(field, text);
                Dispatched::Forwarded
            }
            DecodedEvent::Final(documents) => {
                self.terminated = true;
                self.handler.on_final(documents);
                Dispatched::Terminal
            }
            DecodedEvent::Error(error) => {
                self.terminated = true;
                self.handler.on_error(error);
                Dispatched::Terminal
            }
        }
    }

    /// Whether a terminal event has been forwarded.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Count of events dropped after termination.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}
