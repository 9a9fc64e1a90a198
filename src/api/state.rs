use std::sync::Arc;

use handlebars::Handlebars;

use crate::chat::SessionStore;
use crate::core::AppConfig;
use crate::llm::SharedModelClient;
use crate::ui;

/// Everything in here is either immutable after startup or guards
/// itself, so handlers share it without an outer lock.
pub struct AppState {
    pub config: AppConfig,
    pub sessions: SessionStore,
    pub templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(config: AppConfig, model: SharedModelClient) -> Self {
        Self {
            sessions: SessionStore::new(model, config.session_ttl),
            config,
            templates: ui::templates(),
        }
    }
}

pub type SharedState = Arc<AppState>;
