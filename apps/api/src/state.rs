use crate::relay::service::RelayService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Relay workflow with its ranking pipeline and HTTP collaborators.
    /// The scoring strategy is fixed at startup from `SCORING_STRATEGY`.
    pub relay: RelayService,
}
