//! Lifecycle events emitted by the executor.

/// The fixed set of lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A node is about to run.
    NodeStarted { index: usize, node: String },
    /// A node completed successfully.
    NodeFinished { index: usize, node: String },
    /// The run ended, successfully or not.
    RunFinished { errors: bool, processed: usize },
}

/// An ordered list of event subscribers.
///
/// Delivery order is subscription order, always.
#[derive(Default)]
pub struct Subscribers {
    listeners: Vec<Box<dyn FnMut(&WorkflowEvent) + Send>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscriber.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&WorkflowEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Deliver an event to every subscriber, in subscription order.
    pub fn emit(&mut self, event: &WorkflowEvent) {
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
