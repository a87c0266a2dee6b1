use std::sync::Arc;

use crate::core::server::Server;

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<Server>,
}
