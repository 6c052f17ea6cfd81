use std::sync::Arc;

use loclib_dal::Storage;

use crate::{error::Result, view::Templates};

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, storage: Storage) -> Result<Self> {
        let templates = Templates::new()?;
        Ok(AppState {
            state: Arc::new(AppStateInner {
                storage,
                templates,
                app_config,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn storage(&self) -> &Storage {
        &self.state.storage
    }

    pub fn templates(&self) -> &Templates {
        &self.state.templates
    }
}

struct AppStateInner {
    storage: Storage,
    templates: Templates,
    app_config: AppConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub site_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_name: "Local Library".to_string(),
        }
    }
}
