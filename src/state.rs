use std::sync::Arc;

use crate::gateway::AuthClient;
use crate::services::Dashboard;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub session: SessionStore,
    pub auth: Arc<dyn AuthClient>,
    pub dashboard: Arc<Dashboard>,
}
