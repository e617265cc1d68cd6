//! Event listeners for breaker and retry observability.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// An event reported by one of the resilience components.
pub trait UpstreamEvent: Send + Sync + fmt::Debug {
    /// Short machine-readable name, e.g. `"state_transition"`.
    fn event_type(&self) -> &'static str;

    /// When the event was produced.
    fn timestamp(&self) -> Instant;

    /// The breaker target key or client name that produced the event.
    fn source(&self) -> &str;
}

/// Receives events of type `E`.
pub trait EventListener<E: UpstreamEvent>: Send + Sync {
    /// Called synchronously from the component that emitted `event`.
    fn on_event(&self, event: &E);
}

/// A listener shared between configurations.
pub type SharedListener<E> = Arc<dyn EventListener<E>>;

/// An ordered set of listeners for one event type.
pub struct EventListeners<E: UpstreamEvent> {
    listeners: Vec<SharedListener<E>>,
}

impl<E: UpstreamEvent> EventListeners<E> {
    /// Creates an empty listener set.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Appends a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Appends an already shared listener.
    pub fn add_shared(&mut self, listener: SharedListener<E>) {
        self.listeners.push(listener);
    }

    /// Delivers `event` to every listener in registration order.
    ///
    /// A panicking listener is isolated: the panic is swallowed and the
    /// remaining listeners still run.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: UpstreamEvent> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<E: UpstreamEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: UpstreamEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _event: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: UpstreamEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
