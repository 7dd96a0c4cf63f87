use crate::session::CallSessionController;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The call this client instance drives
    pub controller: CallSessionController,
}

impl AppState {
    pub fn new(controller: CallSessionController) -> Self {
        Self { controller }
    }
}
