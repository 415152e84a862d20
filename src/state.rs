use std::sync::Arc;

use crate::config::Config;
use crate::store::MarketStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn MarketStore>, config: Config) -> Self {
        Self { store, config: Arc::new(config) }
    }
}
