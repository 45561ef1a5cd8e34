//! Shared application state for the API server.

use lifeline_dispatch::Dispatcher;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. Everything stateful lives behind the [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct AppState {
    /// The dispatch service.
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Wrap a dispatcher.
    pub const fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}
