// Application state shared across all modules

use std::sync::Arc;

use crate::services::accounts::UserStore;
use crate::services::LineService;

/// Application state containing the LINE service and the account store handle
#[derive(Clone)]
pub struct AppState {
    pub line_service: Arc<LineService>,
    pub user_store: Arc<dyn UserStore>,
}
