//! Router state shared by every handler.

use crate::convert::ConversionService;

/// Shared handler state. Cloned per request; the service inside is an
/// `Arc`-backed handle.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: ConversionService,
}

impl AppState {
    pub fn new(service: ConversionService) -> Self {
        Self { service }
    }
}
