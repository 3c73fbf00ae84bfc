//! Single-threaded apply context.
//!
//! The stream client runs on the async runtime; everything that touches the
//! registry runs here, on one thread, in the order events arrived. After
//! every operation the grouped view is recomputed and handed to a
//! [`ViewSink`] before the next event is taken, so a reader never sees a
//! half-applied state.
//!
//! Ancestry queries may shell out to git and block, which is why
//! [`Console::run_blocking`] belongs on a dedicated thread (for example
//! `tokio::task::spawn_blocking`), never on an async worker.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::ancestry::HistorySource;
use crate::client::ClientEvent;
use crate::grouping::SessionGroup;
use crate::registry::SessionRegistry;

/// Presentation collaborator fed by the [`Console`].
pub trait ViewSink {
    /// Called after every applied operation with the full grouped view.
    fn groups_changed(&mut self, groups: &[SessionGroup]);

    /// Called when the stream connects or disconnects.
    fn connectivity_changed(&mut self, connected: bool);
}

/// Owns the registry and the latest grouped view.
#[derive(Debug)]
pub struct Console<H> {
    registry: SessionRegistry,
    history: H,
    groups: Vec<SessionGroup>,
    connected: bool,
}

impl<H: HistorySource> Console<H> {
    /// Creates a console with an empty registry, initially disconnected.
    pub fn new(history: H) -> Self {
        Self {
            registry: SessionRegistry::new(),
            history,
            groups: Vec::new(),
            connected: false,
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Mutable access, for registering change handlers.
    pub fn registry_mut(&mut self) -> &mut SessionRegistry {
        &mut self.registry
    }

    /// Grouped view as of the last applied operation.
    pub fn groups(&self) -> &[SessionGroup] {
        &self.groups
    }

    /// Whether the stream is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Processes one event.
    ///
    /// Operations are applied and the grouped view is rebuilt. Connectivity
    /// is forwarded only when it differs from the last known state; session
    /// data is kept across disconnects.
    pub fn handle(&mut self, event: ClientEvent, sink: &mut dyn ViewSink) {
        match event {
            ClientEvent::Connectivity(connected) => {
                if connected == self.connected {
                    return;
                }
                self.connected = connected;
                info!(connected, "stream connectivity changed");
                sink.connectivity_changed(connected);
            }
            ClientEvent::Operation(op) => {
                debug!(kind = op.kind(), "applying operation");
                self.registry.apply(op);
                self.groups = self.registry.groups(&self.history);
                sink.groups_changed(&self.groups);
            }
        }
    }

    /// Handles events until every sender is gone.
    ///
    /// Blocks the current thread; must not be called from an async context.
    pub fn run_blocking(&mut self, events: &mut mpsc::UnboundedReceiver<ClientEvent>, sink: &mut dyn ViewSink) {
        while let Some(event) = events.blocking_recv() {
            self.handle(event, sink);
        }
        debug!("event channel closed, apply context exiting");
    }
}
