use std::sync::Arc;

use crate::config::GenerateConfig;
use crate::services::{LanguageModelService, TokenCountService, VersionControlService};

#[derive(Clone)]
pub struct AppContext {
    pub config: GenerateConfig,
    pub version_control: Arc<dyn VersionControlService>,
    pub token_counter: Arc<dyn TokenCountService>,
    pub language_model: Arc<dyn LanguageModelService>,
}

impl AppContext {
    pub fn new(
        config: GenerateConfig,
        version_control: Arc<dyn VersionControlService>,
        token_counter: Arc<dyn TokenCountService>,
        language_model: Arc<dyn LanguageModelService>,
    ) -> Self {
        Self {
            config,
            version_control,
            token_counter,
            language_model,
        }
    }
}
