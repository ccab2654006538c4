//! Application state shared across handlers

use std::sync::Arc;

use crate::{middleware::TokenVerifier, services::Services};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub verifier: Arc<TokenVerifier>,
}
